use std::io::BufWriter;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::core::errors::{BackupError, Result};
use crate::core::models::document::{DocumentSpec, RenderedDocument, TextPageLoss};
use crate::core::traits::document::DocumentRenderer;

// A4 in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 36.0;

const TITLE_SIZE: f32 = 20.0;
const TIMESTAMP_SIZE: f32 = 14.0;
const FOOTER_SIZE: f32 = 10.0;

/// Body area between header and footer.
const BODY_TOP: f32 = PAGE_HEIGHT - 110.0;
const BODY_BOTTOM: f32 = 60.0;
const BODY_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

/// Largest edge of a QR image on the page.
const MAX_IMAGE_EDGE: f32 = 420.0;

/// Body text starts at this size and shrinks until it fits one page.
const BODY_MAX_SIZE: f32 = 10.0;
const BODY_MIN_SIZE: f32 = 4.0;
const LINE_SPACING: f32 = 1.15;

/// Courier glyphs are all 600/1000 em wide.
const COURIER_ADVANCE: f32 = 0.6;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";

/// Writes backups as A4 PDFs with `lopdf`.
///
/// Page 1 carries the description and the full text; every following
/// page carries one QR image. All pages share a header (title and
/// timestamp) and a `page/total` footer. Everything is set in Courier so
/// wrapping and centring need no font metrics.
///
/// When the text cannot fit page 1 even at the smallest size, the page ends
/// with a marker naming how many lines were left out, and the loss is
/// reported back through `RenderedDocument`.
#[derive(Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Build the full document in memory.
    pub fn build(&self, spec: &DocumentSpec) -> Result<(Document, TextPageLoss)> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let fonts_id = doc.add_object(dictionary! {
            FONT_REGULAR => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Courier",
                "Encoding" => "WinAnsiEncoding",
            },
            FONT_BOLD => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Courier-Bold",
                "Encoding" => "WinAnsiEncoding",
            },
        });

        let total = spec.page_count();
        let header = header_operations(&spec.title, &spec.formatted_timestamp());
        let mut kids: Vec<Object> = Vec::with_capacity(total);

        let layout = layout_body(spec);
        let mut ops = header.clone();
        ops.extend(text_page_operations(&layout));
        ops.extend(footer_operations(1, total));
        kids.push(add_page(&mut doc, pages_id, fonts_id, ops, None)?.into());

        for (i, image_path) in spec.images.iter().enumerate() {
            let (image_id, width, height) = add_image(&mut doc, image_path)?;

            let mut ops = header.clone();
            ops.extend(image_operations(width, height));
            ops.extend(footer_operations(i + 2, total));
            kids.push(add_page(&mut doc, pages_id, fonts_id, ops, Some(image_id))?.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => total as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(encode_text(&spec.title)),
            "Creator" => Object::string_literal("qrbackup"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        Ok((doc, layout.loss))
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, spec: &DocumentSpec, output: &Path) -> Result<RenderedDocument> {
        let (mut doc, text_loss) = self.build(spec)?;

        // Write beside the target and rename into place, so a failed run
        // never leaves a finished-looking file behind.
        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".qrbackup-")
            .suffix(".pdf.part")
            .tempfile_in(parent)?;

        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            doc.save_to(&mut writer)
                .map_err(|e| BackupError::DocumentFailed {
                    reason: format!("{}: {e}", output.display()),
                })?;
            std::io::Write::flush(&mut writer)?;
        }

        tmp.persist(output).map_err(|e| BackupError::DocumentFailed {
            reason: format!("{}: {}", output.display(), e.error),
        })?;

        Ok(RenderedDocument {
            path: output.to_path_buf(),
            text_loss,
        })
    }
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    fonts_id: ObjectId,
    operations: Vec<Operation>,
    image: Option<ObjectId>,
) -> Result<ObjectId> {
    let content = Content { operations }
        .encode()
        .map_err(|e| BackupError::DocumentFailed {
            reason: format!("failed to encode content stream: {e}"),
        })?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let mut resources = dictionary! { "Font" => fonts_id };
    if let Some(image_id) = image {
        resources.set("XObject", dictionary! { "Im0" => image_id });
    }

    let media_box: Vec<Object> = vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()];
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box,
        "Resources" => resources,
        "Contents" => content_id,
    }))
}

/// Embed a QR image as an 8-bit grayscale XObject.
fn add_image(doc: &mut Document, path: &Path) -> Result<(ObjectId, u32, u32)> {
    let img = image::open(path)
        .map_err(|e| BackupError::DocumentFailed {
            reason: format!("cannot read image {}: {e}", path.display()),
        })?
        .to_luma8();
    let (width, height) = img.dimensions();

    let mut stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Interpolate" => false,
        },
        img.into_raw(),
    );
    // A stream that fails to compress stays raw, which is still valid.
    let _ = stream.compress();

    Ok((doc.add_object(stream), width, height))
}

fn header_operations(title: &str, timestamp: &str) -> Vec<Operation> {
    let title_size = fit_size(title, TITLE_SIZE, BODY_WIDTH);
    let mut ops = centered_text(title, FONT_BOLD, title_size, PAGE_HEIGHT - MARGIN - title_size);
    ops.extend(centered_text(
        timestamp,
        FONT_REGULAR,
        TIMESTAMP_SIZE,
        PAGE_HEIGHT - MARGIN - title_size - 8.0 - TIMESTAMP_SIZE,
    ));
    ops
}

fn footer_operations(page: usize, total: usize) -> Vec<Operation> {
    centered_text(&format!("{page}/{total}"), FONT_REGULAR, FOOTER_SIZE, MARGIN)
}

/// Draw the image centred in the body, scaled to fit.
fn image_operations(width: u32, height: u32) -> Vec<Operation> {
    let body_height = BODY_TOP - BODY_BOTTOM;
    let scale = (BODY_WIDTH / width as f32)
        .min(body_height / height as f32)
        .min(MAX_IMAGE_EDGE / width.max(height) as f32);
    let w = width as f32 * scale;
    let h = height as f32 * scale;
    let x = (PAGE_WIDTH - w) / 2.0;
    let y = BODY_BOTTOM + (body_height - h) / 2.0;

    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![w.into(), 0.into(), 0.into(), h.into(), x.into(), y.into()],
        ),
        Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

/// A body line: text plus whether it is a heading.
struct BodyLine {
    text: String,
    bold: bool,
}

fn blank() -> BodyLine {
    BodyLine {
        text: String::new(),
        bold: false,
    }
}

/// Bold heading, blank line, then `text` wrapped at `columns`.
fn push_block(lines: &mut Vec<BodyLine>, heading: &str, text: &str, columns: usize) {
    lines.push(BodyLine {
        text: heading.to_string(),
        bold: true,
    });
    lines.push(blank());
    lines.extend(wrap(text, columns).into_iter().map(|text| BodyLine { text, bold: false }));
}

fn body_lines(spec: &DocumentSpec, columns: usize) -> Vec<BodyLine> {
    let mut lines = Vec::new();

    if let Some(description) = &spec.description {
        push_block(&mut lines, "Description:", description, columns);
        lines.push(blank());
    }

    let heading = match &spec.encrypted_with {
        Some(backend) => format!("Data (encrypted with {backend}):"),
        None => "Data:".to_string(),
    };
    push_block(&mut lines, &heading, &spec.full_text, columns);

    if let Some(fingerprint) = &spec.fingerprint {
        lines.push(blank());
        lines.extend(
            wrap(&format!("SHA-256: {fingerprint}"), columns)
                .into_iter()
                .map(|text| BodyLine { text, bold: true }),
        );
    }

    lines
}

/// Body lines at their final size; every line fits the page.
struct TextLayout {
    size: f32,
    lines: Vec<BodyLine>,
    loss: TextPageLoss,
}

/// Lines of `size` pt text that fit between header and footer.
fn line_capacity(size: f32) -> usize {
    ((BODY_TOP - BODY_BOTTOM) / (size * LINE_SPACING)).floor() as usize
}

/// Pick the largest body font size at which everything fits the page.
///
/// At the minimum size, surplus lines are dropped and the last line that
/// fits becomes an omission marker.
fn layout_body(spec: &DocumentSpec) -> TextLayout {
    let mut size = BODY_MAX_SIZE;

    let (size, lines, omitted_lines) = loop {
        let mut lines = body_lines(spec, columns_at(size));
        let capacity = line_capacity(size);
        if lines.len() <= capacity {
            break (size, lines, 0);
        }
        if size <= BODY_MIN_SIZE {
            let keep = capacity.saturating_sub(1);
            let omitted = lines.len() - keep;
            lines.truncate(keep);
            lines.push(BodyLine {
                text: format!("[... {omitted} more lines omitted, see QR pages]"),
                bold: true,
            });
            break (size, lines, omitted);
        }
        size = (size - 0.5).max(BODY_MIN_SIZE);
    };

    let replaced_chars = lines
        .iter()
        .flat_map(|line| line.text.chars())
        .filter(|&c| !is_printable(c))
        .count();

    TextLayout {
        size,
        lines,
        loss: TextPageLoss {
            omitted_lines,
            replaced_chars,
        },
    }
}

fn text_page_operations(layout: &TextLayout) -> Vec<Operation> {
    let size = layout.size;
    let leading = size * LINE_SPACING;
    let mut y = BODY_TOP - size;
    let mut ops = Vec::new();

    for line in &layout.lines {
        if !line.text.is_empty() {
            let font = if line.bold { FONT_BOLD } else { FONT_REGULAR };
            ops.extend(text_at(&line.text, font, size, MARGIN, y));
        }
        y -= leading;
    }

    ops
}

fn columns_at(size: f32) -> usize {
    ((BODY_WIDTH / (size * COURIER_ADVANCE)).floor() as usize).max(1)
}

/// Shrink `size` until `text` fits `width`.
fn fit_size(text: &str, size: f32, width: f32) -> f32 {
    let chars = text.chars().count().max(1) as f32;
    size.min(width / (chars * COURIER_ADVANCE))
}

/// Hard-wrap `text` at `columns` characters, one entry per output line.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut out = Vec::new();
    for raw in text.lines() {
        let line = raw.replace('\t', "    ");
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            out.push(String::new());
            continue;
        }
        out.extend(chars.chunks(columns).map(|c| c.iter().collect::<String>()));
    }
    out
}

fn centered_text(text: &str, font: &str, size: f32, y: f32) -> Vec<Operation> {
    let width = text.chars().count() as f32 * size * COURIER_ADVANCE;
    text_at(text, font, size, (PAGE_WIDTH - width) / 2.0, y)
}

fn text_at(text: &str, font: &str, size: f32, x: f32, y: f32) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(encode_text(text))]),
        Operation::new("ET", vec![]),
    ]
}

/// Printable in Courier with WinAnsi encoding.
fn is_printable(c: char) -> bool {
    matches!(c as u32, 0x20..=0x7e | 0xa0..=0xff)
}

/// Map text to WinAnsi bytes; characters outside Latin-1 become '?'.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if is_printable(c) { c as u32 as u8 } else { b'?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use image::{GrayImage, Luma};

    use super::*;

    fn spec_with_images(dir: &Path, count: usize) -> DocumentSpec {
        let images = (0..count)
            .map(|i| {
                let path = dir.join(format!("qr{i}.png"));
                GrayImage::from_pixel(29, 29, Luma([0u8])).save(&path).unwrap();
                path
            })
            .collect();

        DocumentSpec {
            title: "backup of file \"testfile\"".into(),
            timestamp: chrono::Local.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap(),
            description: Some("Root CA key".into()),
            full_text: "line 1\nline 2\n".into(),
            encrypted_with: None,
            fingerprint: Some("ab".repeat(32)),
            images,
        }
    }

    fn page_text(doc: &Document, page: u32) -> String {
        let pages = doc.get_pages();
        let content = doc.get_page_content(pages[&page]).unwrap();
        String::from_utf8_lossy(&content).into_owned()
    }

    #[test]
    fn one_text_page_plus_one_page_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let doc = PdfRenderer.build(&spec_with_images(dir.path(), 4)).unwrap().0;

        assert_eq!(doc.get_pages().len(), 5);
        assert!(page_text(&doc, 1).contains("(1/5) Tj"));
        assert!(page_text(&doc, 5).contains("(5/5) Tj"));
        assert!(page_text(&doc, 3).contains("/Im0 Do"));
    }

    #[test]
    fn every_page_carries_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let doc = PdfRenderer.build(&spec_with_images(dir.path(), 2)).unwrap().0;

        for page in 1..=3 {
            let text = page_text(&doc, page);
            assert!(text.contains("backup of file"), "page {page}");
            assert!(text.contains("2026-10-17 12:00:00"), "page {page}");
        }
    }

    #[test]
    fn text_page_holds_description_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let doc = PdfRenderer.build(&spec_with_images(dir.path(), 1)).unwrap().0;
        let text = page_text(&doc, 1);

        assert!(text.contains("(Description:) Tj"));
        assert!(text.contains("(Root CA key) Tj"));
        assert!(text.contains("(Data:) Tj"));
        assert!(text.contains("(line 2) Tj"));
        assert!(text.contains("SHA-256: abab"));
    }

    #[test]
    fn data_heading_names_the_cipher() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec_with_images(dir.path(), 0);
        spec.encrypted_with = Some("age".into());
        let (doc, _) = PdfRenderer.build(&spec).unwrap();

        assert!(page_text(&doc, 1).contains("encrypted with age"));
    }

    #[test]
    fn description_block_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec_with_images(dir.path(), 0);
        spec.description = None;
        let (doc, _) = PdfRenderer.build(&spec).unwrap();

        assert_eq!(doc.get_pages().len(), 1);
        let text = page_text(&doc, 1);
        assert!(!text.contains("Description:"));
        assert!(text.contains("(1/1) Tj"));
    }

    #[test]
    fn long_text_shrinks_to_fit() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec_with_images(dir.path(), 0);
        spec.full_text = format!("{}\n", "A".repeat(64)).repeat(80);

        let layout = layout_body(&spec);
        assert!(layout.size < BODY_MAX_SIZE);
        assert!(layout.lines.len() <= line_capacity(layout.size));
        assert_eq!(layout.loss, TextPageLoss::default());
    }

    #[test]
    fn overflowing_text_ends_with_omission_marker() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec_with_images(dir.path(), 0);
        spec.description = None;
        spec.fingerprint = None;
        spec.full_text = (0..200)
            .map(|i| format!("{i:03}{}\n", "Z".repeat(61)))
            .collect();

        let (doc, loss) = PdfRenderer.build(&spec).unwrap();
        let text = page_text(&doc, 1);

        // "Data:", a blank line, then the payload lines that fit.
        let shown = line_capacity(BODY_MIN_SIZE) - 1 - 2;
        assert_eq!(loss.omitted_lines, 200 - shown);
        assert!(text.contains(&format!("(000{}) Tj", "Z".repeat(61))));
        assert!(!text.contains(&format!("(199{}) Tj", "Z".repeat(61))));
        assert!(text.contains(&format!(
            "([... {} more lines omitted, see QR pages]) Tj",
            loss.omitted_lines
        )));
        assert!(text.contains("(1/1) Tj"));
    }

    #[test]
    fn non_latin_text_is_counted_as_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec_with_images(dir.path(), 0);
        spec.full_text = "pass: 密码 ✓\ncafé\n".into();

        let (doc, loss) = PdfRenderer.build(&spec).unwrap();
        assert_eq!(loss.replaced_chars, 3);
        assert_eq!(loss.omitted_lines, 0);
        assert!(page_text(&doc, 1).contains("(pass: ?? ?) Tj"));
    }

    #[test]
    fn wrap_splits_long_lines_and_keeps_blank_ones() {
        assert_eq!(wrap("abcdef\n\nxy", 4), vec!["abcd", "ef", "", "xy"]);
        assert_eq!(wrap("a\tb", 80), vec!["a    b"]);
        assert!(wrap("", 10).is_empty());
    }

    #[test]
    fn non_latin_characters_are_replaced() {
        assert_eq!(encode_text("key é ✓"), b"key \xe9 ?".to_vec());
    }

    #[test]
    fn render_writes_output_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_with_images(dir.path(), 1);
        let out = dir.path().join("testfile.pdf");

        let written = PdfRenderer.render(&spec, &out).unwrap();
        assert_eq!(written.path, out);
        assert!(written.text_loss.is_lossless());

        let doc = Document::load(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        assert!(page_text(&doc, 2).contains("(2/2) Tj"));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn unreadable_image_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec_with_images(dir.path(), 0);
        spec.images.push(dir.path().join("missing.png"));
        let out = dir.path().join("testfile.pdf");

        let err = PdfRenderer.render(&spec, &out).unwrap_err();
        assert!(matches!(err, BackupError::DocumentFailed { .. }));
        assert!(!out.exists());
    }
}
