use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use crate::core::errors::{BackupError, Result};
use crate::core::traits::cipher::CipherBackend;

/// GPG encryption backend that shells out to the system `gpg` binary.
///
/// Recipients are anything `gpg --recipient` accepts (key id, fingerprint,
/// email), as long as it matches exactly one public key in the keyring.
pub struct GpgBackend {
    /// Path to the gpg binary (defaults to "gpg").
    gpg_path: PathBuf,
}

impl GpgBackend {
    /// Create a new backend using the default `gpg` binary.
    pub fn new() -> Self {
        Self {
            gpg_path: PathBuf::from("gpg"),
        }
    }

    /// Create a new backend with a custom gpg binary path.
    pub fn with_path(gpg_path: PathBuf) -> Self {
        Self { gpg_path }
    }

    /// Check if GPG is available on the system.
    pub fn is_available(&self) -> bool {
        Command::new(&self.gpg_path)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    /// Run gpg, optionally feeding `stdin_data`, and collect its output.
    fn run_gpg(&self, args: &[&str], stdin_data: Option<&[u8]>) -> Result<Output> {
        let mut cmd = Command::new(&self.gpg_path);
        cmd.args(args)
            .stdin(if stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        if let (Some(data), Some(mut stdin)) = (stdin_data, child.stdin.take()) {
            stdin
                .write_all(data)
                .map_err(|e| BackupError::EncryptionFailed {
                    reason: format!("Failed to write to gpg stdin: {e}"),
                })?;
        }

        child
            .wait_with_output()
            .map_err(|e| BackupError::EncryptionFailed {
                reason: format!("gpg process failed: {e}"),
            })
    }

    fn tool_missing(&self) -> BackupError {
        BackupError::ToolMissing {
            tool: self.gpg_path.display().to_string(),
            flag: "cipher".into(),
            hint: "Install GnuPG (e.g. 'apt install gnupg'), or encrypt for an age \
                   recipient instead."
                .into(),
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> BackupError {
        if e.kind() == std::io::ErrorKind::NotFound {
            self.tool_missing()
        } else {
            BackupError::EncryptionFailed {
                reason: format!("Failed to run gpg: {e}"),
            }
        }
    }
}

impl Default for GpgBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Count primary public keys in `gpg --with-colons` output.
fn count_public_keys(listing: &str) -> usize {
    listing.lines().filter(|l| l.starts_with("pub:")).count()
}

impl CipherBackend for GpgBackend {
    fn encrypt(&self, plaintext: &[u8], recipient: &str) -> Result<Vec<u8>> {
        let args = [
            "--encrypt",
            "--armor",
            "--batch",
            "--yes",
            "--trust-model",
            "always",
            "--recipient",
            recipient,
        ];

        let output = self.run_gpg(&args, Some(plaintext))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackupError::EncryptionFailed {
                reason: format!("gpg exited with error: {stderr}"),
            });
        }

        Ok(output.stdout)
    }

    fn resolve_recipient(&self, recipient: &str) -> Result<()> {
        if recipient.trim().is_empty() {
            return Err(BackupError::invalid("gpg key id must not be empty"));
        }

        let output = self.run_gpg(
            &["--batch", "--with-colons", "--list-keys", "--", recipient],
            None,
        )?;
        if !output.status.success() {
            return Err(BackupError::invalid(format!(
                "{recipient} is not a valid gpg id"
            )));
        }

        match count_public_keys(&String::from_utf8_lossy(&output.stdout)) {
            1 => Ok(()),
            0 => Err(BackupError::invalid(format!(
                "{recipient} is not a valid gpg id"
            ))),
            n => Err(BackupError::invalid(format!(
                "{recipient} matches {n} public keys; use a full fingerprint to pick one"
            ))),
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(self.tool_missing())
        }
    }

    fn name(&self) -> &str {
        "gpg"
    }
}
