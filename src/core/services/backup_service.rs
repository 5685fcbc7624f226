use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

use crate::core::errors::{BackupError, Result};
use crate::core::models::backup_request::{BackupOptions, BackupRequest};
use crate::core::models::chunk::Chunk;
use crate::core::models::document::{DocumentSpec, RenderedDocument};
use crate::core::models::payload::{PayloadOrigin, TextPayload};
use crate::core::services::chunker::Chunker;
use crate::core::traits::barcode::BarcodeRenderer;
use crate::core::traits::cipher::CipherBackend;
use crate::core::traits::document::DocumentRenderer;

/// Orchestrates a paper backup by combining a `CipherBackend`,
/// a `BarcodeRenderer` and a `DocumentRenderer`.
pub struct BackupService<C: CipherBackend, B: BarcodeRenderer, D: DocumentRenderer> {
    pub cipher: C,
    pub barcode: B,
    pub document: D,
}

impl<C: CipherBackend, B: BarcodeRenderer, D: DocumentRenderer> BackupService<C, B, D> {
    /// Turn `request.input_path` into a printable PDF.
    ///
    /// Arguments are validated before anything touches the filesystem.
    /// The scratch directory holding the QR images is removed on every
    /// exit path, and no output file exists if any stage fails.
    pub fn backup(
        &self,
        request: &BackupRequest,
        options: &BackupOptions,
    ) -> Result<RenderedDocument> {
        let recipient = validate(request, options)?;
        self.barcode.check_available()?;
        if recipient.is_some() {
            self.cipher.check_available()?;
        }

        let payload = self.load_payload(request, recipient)?;
        let chunks = Chunker.chunk(payload.text(), options.chunk_size)?;

        let scratch = create_scratch_dir(options.scratch_dir.as_deref())?;
        let images = self.render_chunks(&chunks, scratch.path(), &options.prefix)?;

        let spec = DocumentSpec {
            title: format!("backup of file \"{}\"", request.input_path.display()),
            timestamp: chrono::Local::now(),
            description: request.description.clone(),
            full_text: payload.text().to_string(),
            encrypted_with: match payload.origin() {
                PayloadOrigin::Encrypted { backend } => Some(backend.clone()),
                PayloadOrigin::Plain => None,
            },
            fingerprint: Some(payload.fingerprint()),
            images,
        };

        let output = options
            .output
            .clone()
            .unwrap_or_else(|| request.default_output_path());
        let rendered = self.document.render(&spec, &output)?;

        scratch.close()?;
        Ok(rendered)
    }

    /// Produce the text to archive: ciphertext when encrypting,
    /// otherwise the file content verbatim.
    pub fn load_payload(
        &self,
        request: &BackupRequest,
        recipient: Option<&str>,
    ) -> Result<TextPayload> {
        match recipient {
            Some(recipient) => {
                let armored = self.cipher.encrypt_file(&request.input_path, recipient)?;
                Ok(TextPayload::new(
                    armored,
                    PayloadOrigin::Encrypted {
                        backend: self.cipher.name().to_string(),
                    },
                ))
            }
            None => {
                let bytes = std::fs::read(&request.input_path)?;
                let text = String::from_utf8(bytes).map_err(|_| {
                    BackupError::invalid(format!(
                        "{} is not a UTF-8 text file",
                        request.input_path.display()
                    ))
                })?;
                Ok(TextPayload::new(text, PayloadOrigin::Plain))
            }
        }
    }

    /// Render each chunk to `<dir>/<prefix><index>.png`, in chunk order.
    fn render_chunks(&self, chunks: &[Chunk], dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
        chunks
            .iter()
            .map(|chunk| {
                let path = dir.join(format!("{prefix}{}.png", chunk.index));
                self.barcode.render(&chunk.text, &path)?;
                Ok(path)
            })
            .collect()
    }
}

/// Check every argument up front. Returns the recipient when encrypting.
fn validate<'a>(request: &'a BackupRequest, options: &BackupOptions) -> Result<Option<&'a str>> {
    if !request.input_path.is_file() {
        return Err(BackupError::invalid(format!(
            "input needs to be a valid filename: {}",
            request.input_path.display()
        )));
    }

    let recipient = if request.encrypt {
        match request.recipient.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Some(id),
            _ => {
                return Err(BackupError::invalid(
                    "a recipient key id is required when encrypting",
                ));
            }
        }
    } else {
        None
    };

    if options.chunk_size == 0 {
        return Err(BackupError::invalid("chunk size must be a positive integer"));
    }

    validate_prefix(&options.prefix)?;

    if let Some(dir) = &options.scratch_dir {
        if !dir.is_dir() {
            return Err(BackupError::invalid(format!(
                "scratch directory must be an existing directory: {}",
                dir.display()
            )));
        }
    }

    Ok(recipient)
}

/// A prefix must be a bare file-name stem.
fn validate_prefix(prefix: &str) -> Result<()> {
    let mut components = Path::new(prefix).components();
    let is_plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if prefix.is_empty() || !is_plain || prefix.contains(['/', '\\']) {
        return Err(BackupError::invalid(format!(
            "image prefix must be a plain file name, got '{prefix}'"
        )));
    }
    Ok(())
}

fn create_scratch_dir(parent: Option<&Path>) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("qrbackup-");

    let dir = match parent {
        Some(parent) => builder.tempdir_in(parent)?,
        None => builder.tempdir()?,
    };
    Ok(dir)
}
