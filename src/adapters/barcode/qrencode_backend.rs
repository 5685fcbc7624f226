use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::core::errors::{BackupError, Result};
use crate::core::traits::barcode::BarcodeRenderer;

/// QR renderer that shells out to the `qrencode` command-line tool.
///
/// The chunk text is passed on stdin, so chunk size is bounded only by
/// what qrencode accepts; oversize input surfaces as a failed exit.
pub struct QrencodeBackend {
    /// Path to the qrencode binary (defaults to "qrencode").
    qrencode_path: PathBuf,
}

impl QrencodeBackend {
    pub fn new() -> Self {
        Self {
            qrencode_path: PathBuf::from("qrencode"),
        }
    }

    /// Create a new backend with a custom qrencode binary path.
    pub fn with_path(qrencode_path: PathBuf) -> Self {
        Self { qrencode_path }
    }

    fn tool_missing(&self) -> BackupError {
        BackupError::ToolMissing {
            tool: self.qrencode_path.display().to_string(),
            flag: "barcode".into(),
            hint: "Please install 'qrencode' (e.g. 'apt install qrencode' or \
                   'brew install qrencode'), or use --barcode native."
                .into(),
        }
    }
}

impl Default for QrencodeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl BarcodeRenderer for QrencodeBackend {
    fn check_available(&self) -> Result<()> {
        let ok = Command::new(&self.qrencode_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success());

        if ok { Ok(()) } else { Err(self.tool_missing()) }
    }

    fn render(&self, text: &str, output: &Path) -> Result<()> {
        let mut child = Command::new(&self.qrencode_path)
            .args(["--type=PNG", "-o"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    self.tool_missing()
                } else {
                    BackupError::BarcodeFailed {
                        reason: format!("Failed to run qrencode: {e}"),
                    }
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| BackupError::BarcodeFailed {
                    reason: format!("Failed to write to qrencode stdin: {e}"),
                })?;
        }

        let result = child
            .wait_with_output()
            .map_err(|e| BackupError::BarcodeFailed {
                reason: format!("qrencode process failed: {e}"),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(BackupError::BarcodeFailed {
                reason: format!(
                    "qrencode exited with {} for {}: {}",
                    result.status,
                    output.display(),
                    stderr.trim()
                ),
            });
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "qrencode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_tool_missing() {
        let backend = QrencodeBackend::with_path(PathBuf::from("/nonexistent/bin/qrencode"));
        let err = backend.check_available().unwrap_err();
        assert!(matches!(err, BackupError::ToolMissing { .. }));
        assert!(err.to_string().contains("install 'qrencode'"));
    }

    #[test]
    fn render_with_missing_binary_is_tool_missing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = QrencodeBackend::with_path(PathBuf::from("/nonexistent/bin/qrencode"));
        let err = backend.render("hi", &dir.path().join("qr0.png")).unwrap_err();
        assert!(matches!(err, BackupError::ToolMissing { .. }));
    }

    #[test]
    fn nonzero_exit_is_failure() {
        // `false` exists everywhere the test suite runs and always exits 1.
        let backend = QrencodeBackend::with_path(PathBuf::from("false"));
        assert!(backend.check_available().is_err());

        let dir = tempfile::tempdir().unwrap();
        let err = backend.render("hi", &dir.path().join("qr0.png")).unwrap_err();
        assert!(matches!(err, BackupError::BarcodeFailed { .. }));
    }

    #[test]
    fn renders_png_when_installed() {
        let backend = QrencodeBackend::new();
        if backend.check_available().is_err() {
            eprintln!("qrencode not installed, skipping");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr0.png");
        backend.render("line one\nline two\n", &path).unwrap();

        let img = image::open(&path).unwrap();
        assert!(img.width() > 0);
    }
}
