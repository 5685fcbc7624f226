use std::path::Path;

use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};

use crate::core::errors::{BackupError, Result};
use crate::core::traits::barcode::BarcodeRenderer;

/// Pixels per QR module.
const MODULE_PX: u32 = 8;

/// Quiet zone in modules (QR requires at least 4).
const QUIET_MODULES: u32 = 4;

/// In-process QR renderer built on the `qrcode` and `image` crates.
///
/// Needs no host tools. Error correction defaults to M, which leaves
/// roughly 2.3 KB of byte-mode capacity per symbol.
pub struct NativeQrBackend {
    ec_level: EcLevel,
}

impl NativeQrBackend {
    pub fn new() -> Self {
        Self {
            ec_level: EcLevel::M,
        }
    }

    /// Rasterize the QR matrix for `text`, quiet zone included.
    fn rasterize(&self, text: &str) -> Result<GrayImage> {
        let qr = QrCode::with_error_correction_level(text.as_bytes(), self.ec_level).map_err(
            |e| BackupError::BarcodeFailed {
                reason: format!("cannot encode {} bytes as a QR code: {e}", text.len()),
            },
        )?;

        let modules = qr.width() as u32;
        let side = (modules + 2 * QUIET_MODULES) * MODULE_PX;
        let mut img = GrayImage::from_pixel(side, side, Luma([255u8]));

        let colors = qr.to_colors();
        for qy in 0..modules {
            for qx in 0..modules {
                if colors[(qy * modules + qx) as usize] != qrcode::Color::Dark {
                    continue;
                }
                let x0 = (qx + QUIET_MODULES) * MODULE_PX;
                let y0 = (qy + QUIET_MODULES) * MODULE_PX;
                for py in 0..MODULE_PX {
                    for px in 0..MODULE_PX {
                        img.put_pixel(x0 + px, y0 + py, Luma([0u8]));
                    }
                }
            }
        }

        Ok(img)
    }
}

impl Default for NativeQrBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl BarcodeRenderer for NativeQrBackend {
    fn check_available(&self) -> Result<()> {
        Ok(())
    }

    fn render(&self, text: &str, output: &Path) -> Result<()> {
        let img = self.rasterize(text)?;
        img.save_with_format(output, image::ImageFormat::Png)
            .map_err(|e| BackupError::BarcodeFailed {
                reason: format!("failed to write {}: {e}", output.display()),
            })
    }

    fn name(&self) -> &str {
        "native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_has_quiet_zone_and_dark_modules() {
        let img = NativeQrBackend::new().rasterize("hello").unwrap();

        assert_eq!(img.width(), img.height());
        assert_eq!(img.width() % MODULE_PX, 0);
        // Top-left corner is quiet zone, first finder module is dark.
        assert_eq!(img.get_pixel(0, 0), &Luma([255u8]));
        let finder = QUIET_MODULES * MODULE_PX;
        assert_eq!(img.get_pixel(finder, finder), &Luma([0u8]));
    }

    #[test]
    fn writes_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr0.png");
        NativeQrBackend::new()
            .render("-----BEGIN PGP MESSAGE-----\nhQEMA\n", &path)
            .unwrap();

        let decoded = image::open(&path).unwrap();
        assert!(decoded.width() >= 21 * MODULE_PX);
    }

    #[test]
    fn oversize_payload_fails() {
        let dir = tempfile::tempdir().unwrap();
        let text = "x".repeat(5000);
        let err = NativeQrBackend::new()
            .render(&text, &dir.path().join("qr0.png"))
            .unwrap_err();
        assert!(matches!(err, BackupError::BarcodeFailed { .. }));
    }

    #[test]
    fn always_available() {
        assert!(NativeQrBackend::new().check_available().is_ok());
    }
}
