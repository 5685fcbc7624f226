use std::path::Path;

use crate::core::errors::Result;

/// Port for QR code generators.
pub trait BarcodeRenderer {
    /// Fail with `ToolMissing` if this renderer cannot run on this host.
    fn check_available(&self) -> Result<()>;

    /// Encode `text` as a QR code and write it as an image to `output`.
    fn render(&self, text: &str, output: &Path) -> Result<()>;

    fn name(&self) -> &str;
}
