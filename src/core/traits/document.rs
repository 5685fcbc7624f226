use std::path::Path;

use crate::core::errors::Result;
use crate::core::models::document::{DocumentSpec, RenderedDocument};

/// Port for paginated document writers.
pub trait DocumentRenderer {
    /// Lay out `spec` and write it to `output`.
    ///
    /// The result reports anything of `spec.full_text` the text page could
    /// not reproduce. Implementations must not leave a file at `output`
    /// when they fail.
    fn render(&self, spec: &DocumentSpec, output: &Path) -> Result<RenderedDocument>;
}
