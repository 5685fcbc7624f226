use std::io::Write;
use std::path::Path;

use crate::core::errors::{BackupError, Result};
use crate::core::traits::cipher::CipherBackend;

/// Age encryption backend using X25519 + ChaCha20-Poly1305.
///
/// The recipient is either an `age1...` public key or the path of a file
/// that holds exactly one: a recipients file, or an identity file whose
/// public key is derived. Output is ASCII-armored so it prints cleanly.
#[derive(Default)]
pub struct AgeBackend;

impl AgeBackend {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `recipient` to exactly one X25519 recipient.
    fn parse_recipient(recipient: &str) -> Result<age::x25519::Recipient> {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(BackupError::invalid("age recipient must not be empty"));
        }

        if recipient.starts_with("age1") {
            return recipient
                .parse::<age::x25519::Recipient>()
                .map_err(|e: &str| {
                    BackupError::invalid(format!("Invalid age recipient '{recipient}': {e}"))
                });
        }

        let path = Path::new(recipient);
        if path.is_file() {
            return Self::recipient_from_file(path);
        }

        Err(BackupError::invalid(format!(
            "{recipient} is neither an age public key nor a key file"
        )))
    }

    /// Read a single recipient from a recipients or identity file.
    fn recipient_from_file(path: &Path) -> Result<age::x25519::Recipient> {
        let content = std::fs::read_to_string(path)?;

        let keys: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with("age1"))
            .collect();

        match keys.as_slice() {
            [key] => {
                return key.parse().map_err(|e: &str| {
                    BackupError::invalid(format!("Invalid age key in {}: {e}", path.display()))
                });
            }
            [] => {}
            many => {
                return Err(BackupError::invalid(format!(
                    "{} lists {} recipients, expected exactly one",
                    path.display(),
                    many.len()
                )));
            }
        }

        let secrets: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with("AGE-SECRET-KEY-"))
            .collect();

        match secrets.as_slice() {
            [secret] => {
                let identity: age::x25519::Identity = secret.parse().map_err(|e: &str| {
                    BackupError::invalid(format!("Invalid age key in {}: {e}", path.display()))
                })?;
                Ok(identity.to_public())
            }
            [] => Err(BackupError::invalid(format!(
                "No age key found in {}",
                path.display()
            ))),
            many => Err(BackupError::invalid(format!(
                "{} holds {} identities, expected exactly one",
                path.display(),
                many.len()
            ))),
        }
    }
}

impl CipherBackend for AgeBackend {
    fn encrypt(&self, plaintext: &[u8], recipient: &str) -> Result<Vec<u8>> {
        let parsed = Self::parse_recipient(recipient)?;

        let encryptor =
            age::Encryptor::with_recipients(std::iter::once(&parsed as &dyn age::Recipient))
                .map_err(|e| BackupError::EncryptionFailed {
                    reason: format!("{e}"),
                })?;

        let mut output = Vec::new();
        let armored =
            age::armor::ArmoredWriter::wrap_output(&mut output, age::armor::Format::AsciiArmor)
                .map_err(|e| BackupError::EncryptionFailed {
                    reason: format!("Armor writer failed: {e}"),
                })?;

        let mut writer =
            encryptor
                .wrap_output(armored)
                .map_err(|e| BackupError::EncryptionFailed {
                    reason: format!("Encryption stream failed: {e}"),
                })?;

        writer
            .write_all(plaintext)
            .map_err(|e| BackupError::EncryptionFailed {
                reason: format!("Write failed: {e}"),
            })?;

        let armored_writer = writer
            .finish()
            .map_err(|e| BackupError::EncryptionFailed {
                reason: format!("Encryption finish failed: {e}"),
            })?;

        armored_writer
            .finish()
            .map_err(|e| BackupError::EncryptionFailed {
                reason: format!("Armor finish failed: {e}"),
            })?;

        Ok(output)
    }

    fn resolve_recipient(&self, recipient: &str) -> Result<()> {
        Self::parse_recipient(recipient).map(|_| ())
    }

    fn name(&self) -> &str {
        "age"
    }
}
