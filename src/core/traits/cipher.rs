use std::path::Path;

use crate::core::errors::{BackupError, Result};

/// Port for public-key encryption backends.
///
/// Implementations live in `adapters::cipher` (e.g. GpgBackend, AgeBackend).
/// The core layer only depends on this trait, never on a concrete backend.
pub trait CipherBackend {
    /// Encrypt plaintext for a single recipient, returning ASCII armor.
    fn encrypt(&self, plaintext: &[u8], recipient: &str) -> Result<Vec<u8>>;

    /// Ensure `recipient` selects exactly one public key.
    fn resolve_recipient(&self, recipient: &str) -> Result<()>;

    /// Fail with `ToolMissing` when the backend cannot run on this host.
    fn check_available(&self) -> Result<()> {
        Ok(())
    }

    /// Human-readable name of this backend (e.g. "gpg", "age").
    fn name(&self) -> &str;

    /// Encrypt the contents of `path` for `recipient`.
    ///
    /// The file is only read, never modified.
    fn encrypt_file(&self, path: &Path, recipient: &str) -> Result<String> {
        if !path.is_file() {
            return Err(BackupError::invalid(format!(
                "{} is not a file or does not exist",
                path.display()
            )));
        }
        self.resolve_recipient(recipient)?;

        let plaintext = std::fs::read(path)?;
        let armored = self.encrypt(&plaintext, recipient)?;

        String::from_utf8(armored).map_err(|_| BackupError::EncryptionFailed {
            reason: format!("{} produced non-armored output", self.name()),
        })
    }
}
