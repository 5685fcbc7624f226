use std::cell::Cell;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use indicatif::ProgressBar;

use crate::adapters::barcode::native_backend::NativeQrBackend;
use crate::adapters::barcode::qrencode_backend::QrencodeBackend;
use crate::adapters::cipher::age_backend::AgeBackend;
use crate::adapters::cipher::gpg_backend::GpgBackend;
use crate::adapters::document::pdf_renderer::PdfRenderer;
use crate::cli::{Cli, output};
use crate::config::app_config::AppConfig;
use crate::core::errors::{BackupError, Result};
use crate::core::models::backup_request::{BackupOptions, BackupRequest};
use crate::core::models::document::RenderedDocument;
use crate::core::services::backup_service::BackupService;
use crate::core::traits::barcode::BarcodeRenderer;
use crate::core::traits::cipher::CipherBackend;

/// Execute `qrbackup <FILE> [KEYID]`.
///
/// One positional argument makes a plaintext backup, two encrypt the
/// file for KEYID first. Any other count prints usage and succeeds.
pub fn execute(cli: &Cli) -> Result<()> {
    let (input, recipient) = match cli.args.as_slice() {
        [input] => (input, None),
        [input, recipient] => (input, Some(recipient.clone())),
        _ => {
            print_usage()?;
            return Ok(());
        }
    };

    let config = AppConfig::load(cli.config.as_deref())?;

    let request = match recipient {
        Some(recipient) => BackupRequest::encrypted(input, recipient),
        None => BackupRequest::plain(input),
    }
    .with_description(cli.description.clone());
    let options = BackupOptions {
        chunk_size: cli.chunk_size.unwrap_or(config.backup.chunk_size),
        scratch_dir: cli
            .scratch_dir
            .clone()
            .or_else(|| config.backup.scratch_dir.clone()),
        prefix: cli
            .prefix
            .clone()
            .unwrap_or_else(|| config.backup.prefix.clone()),
        output: cli.output.clone(),
    };

    output::header(&format!("Backing up {input}"));
    if !request.encrypt {
        output::warning("No key id given: the backup will contain the plaintext");
    }

    let cipher = cli.cipher.as_deref().unwrap_or(&config.backup.cipher);
    let barcode = cli.barcode.as_deref().unwrap_or(&config.backup.barcode);

    let rendered = match cipher {
        "gpg" => {
            let gpg_path = config
                .tools
                .gpg
                .clone()
                .unwrap_or_else(|| PathBuf::from("gpg"));
            with_cipher(GpgBackend::with_path(gpg_path), barcode, &config, &request, &options)?
        }
        "age" => with_cipher(AgeBackend::new(), barcode, &config, &request, &options)?,
        other => {
            return Err(BackupError::InvalidConfig {
                detail: format!("Unknown cipher backend: '{other}'. Use 'gpg' or 'age'."),
            });
        }
    };

    report_text_loss(&rendered);
    output::success(&format!("Generating backup {}", rendered.path.display()));
    Ok(())
}

/// Warn when page 1 does not reproduce the payload exactly.
fn report_text_loss(rendered: &RenderedDocument) {
    let loss = rendered.text_loss;
    if loss.omitted_lines > 0 {
        output::warning(&format!(
            "Page 1 leaves out {} line(s) that did not fit; the QR pages hold the full text",
            loss.omitted_lines
        ));
    }
    if loss.replaced_chars > 0 {
        output::warning(&format!(
            "{} character(s) outside Latin-1 are printed as '?' on page 1; \
             the QR pages hold the exact text",
            loss.replaced_chars
        ));
    }
}

fn print_usage() -> Result<()> {
    println!("qrbackup version {}", env!("CARGO_PKG_VERSION"));
    Cli::command().print_help()?;
    Ok(())
}

/// Pick the barcode backend for an already chosen cipher.
fn with_cipher<C: CipherBackend>(
    cipher: C,
    barcode: &str,
    config: &AppConfig,
    request: &BackupRequest,
    options: &BackupOptions,
) -> Result<RenderedDocument> {
    match barcode {
        "qrencode" => {
            let path = config
                .tools
                .qrencode
                .clone()
                .unwrap_or_else(|| PathBuf::from("qrencode"));
            run(cipher, QrencodeBackend::with_path(path), request, options)
        }
        "native" => run(cipher, NativeQrBackend::new(), request, options),
        other => Err(BackupError::InvalidConfig {
            detail: format!("Unknown barcode backend: '{other}'. Use 'qrencode' or 'native'."),
        }),
    }
}

fn run<C: CipherBackend, B: BarcodeRenderer>(
    cipher: C,
    barcode: B,
    request: &BackupRequest,
    options: &BackupOptions,
) -> Result<RenderedDocument> {
    output::detail(&format!("Input: {}", request.input_path.display()));
    if let Some(recipient) = &request.recipient {
        output::detail(&format!("Recipient: {recipient} ({})", cipher.name()));
    }
    output::detail(&format!(
        "QR generator: {}, {} line(s) per code",
        barcode.name(),
        options.chunk_size
    ));

    let sp = output::spinner(if request.encrypt {
        "Encrypting and rendering QR codes..."
    } else {
        "Rendering QR codes..."
    });

    let service = BackupService {
        cipher,
        barcode: ProgressBarcode::new(barcode, sp.clone()),
        document: PdfRenderer::new(),
    };

    let result = service.backup(request, options);
    let rendered = service.barcode.rendered.get();

    match &result {
        Ok(_) => output::finish_spinner(sp, &format!("Rendered {rendered} QR code(s)")),
        Err(_) => sp.finish_and_clear(),
    }
    result
}

/// Wraps a renderer and reports each finished code on a spinner.
struct ProgressBarcode<B: BarcodeRenderer> {
    inner: B,
    progress: ProgressBar,
    rendered: Cell<usize>,
}

impl<B: BarcodeRenderer> ProgressBarcode<B> {
    fn new(inner: B, progress: ProgressBar) -> Self {
        Self {
            inner,
            progress,
            rendered: Cell::new(0),
        }
    }
}

impl<B: BarcodeRenderer> BarcodeRenderer for ProgressBarcode<B> {
    fn check_available(&self) -> Result<()> {
        self.inner.check_available()
    }

    fn render(&self, text: &str, output: &Path) -> Result<()> {
        self.inner.render(text, output)?;
        let done = self.rendered.get() + 1;
        self.rendered.set(done);
        self.progress.set_message(format!("Rendered {done} QR code(s)..."));
        Ok(())
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
