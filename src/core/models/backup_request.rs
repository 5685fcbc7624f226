use std::path::PathBuf;

/// Default number of lines packed into one QR code.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Default file-name prefix for generated QR images.
pub const DEFAULT_PREFIX: &str = "qr";

/// What to back up, and for whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    pub input_path: PathBuf,
    pub description: Option<String>,
    pub encrypt: bool,
    pub recipient: Option<String>,
}

impl BackupRequest {
    /// A plaintext backup of `input_path`.
    pub fn plain(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            description: None,
            encrypt: false,
            recipient: None,
        }
    }

    /// An encrypted backup of `input_path` for a single recipient.
    pub fn encrypted(input_path: impl Into<PathBuf>, recipient: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            description: None,
            encrypt: true,
            recipient: Some(recipient.into()),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Where the document lands when no explicit output is configured.
    pub fn default_output_path(&self) -> PathBuf {
        let mut name = self.input_path.clone().into_os_string();
        name.push(".pdf");
        PathBuf::from(name)
    }
}

/// Tunables for a single backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    /// Lines per QR code.
    pub chunk_size: usize,
    /// Parent directory for the scratch dir; the system temp dir if `None`.
    pub scratch_dir: Option<PathBuf>,
    /// File-name prefix of the intermediate images.
    pub prefix: String,
    /// Output path; `<input>.pdf` if `None`.
    pub output: Option<PathBuf>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            scratch_dir: None,
            prefix: DEFAULT_PREFIX.to_string(),
            output: None,
        }
    }
}
