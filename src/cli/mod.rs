pub mod commands;
pub mod context;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

/// Turn a text file into a printable paper backup of QR codes.
#[derive(Parser, Debug)]
#[command(
    name = "qrbackup",
    version,
    about,
    long_about = None,
    override_usage = "qrbackup [OPTIONS] <FILE> [KEYID]",
    after_help = "If KEYID is present, the text will be encrypted for that key. \
                  Otherwise the PDF is created from the unencrypted input."
)]
pub struct Cli {
    /// File to back up, optionally followed by the recipient key id
    #[arg(value_name = "FILE [KEYID]")]
    pub args: Vec<String>,

    /// Description printed above the data on the first page
    #[arg(short, long, env = "QRBACKUP_DESCRIPTION")]
    pub description: Option<String>,

    /// Output file (default: <FILE>.pdf)
    #[arg(short, long, env = "QRBACKUP_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Encryption backend: gpg or age
    #[arg(long, env = "QRBACKUP_CIPHER")]
    pub cipher: Option<String>,

    /// QR code generator: qrencode or native
    #[arg(long, env = "QRBACKUP_BARCODE")]
    pub barcode: Option<String>,

    /// Lines of text per QR code
    #[arg(long, env = "QRBACKUP_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// File name prefix of the intermediate QR images
    #[arg(long, env = "QRBACKUP_PREFIX")]
    pub prefix: Option<String>,

    /// Directory in which the temporary image directory is created
    #[arg(long, env = "QRBACKUP_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Path to alternative config file
    #[arg(long, env = "QRBACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn positional_arguments_are_collected() {
        let cli = Cli::try_parse_from(["qrbackup", "key.asc", "7593CB6D", "-d", "root key"]).unwrap();
        assert_eq!(cli.args, vec!["key.asc", "7593CB6D"]);
        assert_eq!(cli.description.as_deref(), Some("root key"));
    }

    #[test]
    fn no_positionals_still_parses() {
        let cli = Cli::try_parse_from(["qrbackup"]).unwrap();
        assert!(cli.args.is_empty());
    }
}
