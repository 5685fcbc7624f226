use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::errors::{BackupError, Result};
use crate::core::models::backup_request::{DEFAULT_CHUNK_SIZE, DEFAULT_PREFIX};

/// Top-level configuration read from `config.toml`.
///
/// Every field is optional; missing values fall back to built-in
/// defaults, and command-line flags override both.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub backup: BackupSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the per-user file
    /// (`<config_dir>/qrbackup/config.toml`) is used when present and
    /// defaults apply otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(BackupError::InvalidConfig {
                        detail: format!("config file not found: {}", path.display()),
                    });
                }
                Self::from_file(path)
            }
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Per-user config location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("qrbackup").join("config.toml"))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            BackupError::InvalidConfig { detail } => BackupError::InvalidConfig {
                detail: format!("{}: {detail}", path.display()),
            },
            other => other,
        })
    }

    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| BackupError::InvalidConfig {
            detail: format!("Failed to parse config: {e}"),
        })?;

        if config.backup.chunk_size == 0 {
            return Err(BackupError::InvalidConfig {
                detail: "backup.chunk_size must be a positive integer".into(),
            });
        }

        Ok(config)
    }
}

/// The `[backup]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupSection {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_cipher")]
    pub cipher: String,
    #[serde(default = "default_barcode")]
    pub barcode: String,
    /// Parent directory for scratch dirs (system temp dir if unset).
    pub scratch_dir: Option<PathBuf>,
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            prefix: default_prefix(),
            cipher: default_cipher(),
            barcode: default_barcode(),
            scratch_dir: None,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_cipher() -> String {
    "gpg".to_string()
}

fn default_barcode() -> String {
    "qrencode".to_string()
}

/// The `[tools]` section: paths of external executables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    pub qrencode: Option<PathBuf>,
    pub gpg: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.backup.chunk_size, 10);
        assert_eq!(config.backup.prefix, "qr");
        assert_eq!(config.backup.cipher, "gpg");
        assert_eq!(config.backup.barcode, "qrencode");
        assert!(config.tools.qrencode.is_none());
    }

    #[test]
    fn full_file_is_parsed() {
        let config = AppConfig::parse(
            r#"
[backup]
chunk_size = 25
prefix = "page"
cipher = "age"
barcode = "native"
scratch_dir = "/var/tmp"

[tools]
qrencode = "/opt/bin/qrencode"
gpg = "/usr/local/bin/gpg2"
"#,
        )
        .unwrap();

        assert_eq!(config.backup.chunk_size, 25);
        assert_eq!(config.backup.prefix, "page");
        assert_eq!(config.backup.cipher, "age");
        assert_eq!(config.backup.barcode, "native");
        assert_eq!(config.backup.scratch_dir, Some(PathBuf::from("/var/tmp")));
        assert_eq!(config.tools.gpg, Some(PathBuf::from("/usr/local/bin/gpg2")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AppConfig::parse("[backup]\nchunksize = 3\n").unwrap_err();
        assert!(matches!(err, BackupError::InvalidConfig { .. }));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = AppConfig::parse("[backup]\nchunk_size = 0\n").unwrap_err();
        assert!(matches!(err, BackupError::InvalidConfig { .. }));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, BackupError::InvalidConfig { .. }));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backup]\nchunk_size = 4\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.backup.chunk_size, 4);
    }
}
