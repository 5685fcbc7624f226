/// All domain errors for qrbackup.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Invalid argument: {detail}")]
    InvalidArgument { detail: String },

    #[error(
        "Required tool '{tool}' was not found\n\n  \
         {hint}\n  \
         Pick another backend with --{flag}, or set the executable's path \
         in the [tools] section of the config file."
    )]
    ToolMissing {
        tool: String,
        flag: String,
        hint: String,
    },

    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("QR code generation failed: {reason}")]
    BarcodeFailed { reason: String },

    #[error(
        "Writing the backup document failed: {reason}\n\n  \
         No output file was written."
    )]
    DocumentFailed { reason: String },

    #[error(
        "Invalid configuration: {detail}\n\n  \
         Check the config file passed with --config (or $QRBACKUP_CONFIG)."
    )]
    InvalidConfig { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BackupError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidArgument {
            detail: detail.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_missing_names_the_tool_and_flag() {
        let err = BackupError::ToolMissing {
            tool: "qrencode".into(),
            flag: "barcode".into(),
            hint: "Install it with your package manager.".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'qrencode'"));
        assert!(msg.contains("--barcode"));
        assert!(msg.contains("[tools]"));
        assert!(!msg.contains("point qrbackup at"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: BackupError = io.into();
        assert!(matches!(err, BackupError::Io(_)));
    }
}
