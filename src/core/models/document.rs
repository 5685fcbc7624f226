use std::path::PathBuf;

use chrono::{DateTime, Local};

/// Everything the document renderer needs to lay out a backup.
#[derive(Debug, Clone)]
pub struct DocumentSpec {
    /// Running header shown on every page.
    pub title: String,
    /// Generation time, shown under the title.
    pub timestamp: DateTime<Local>,
    pub description: Option<String>,
    /// Full payload text for the leading page.
    pub full_text: String,
    /// Backend that produced `full_text`, if it is ciphertext.
    pub encrypted_with: Option<String>,
    /// SHA-256 of `full_text`, printed below the data block.
    pub fingerprint: Option<String>,
    /// One page per image, in this order.
    pub images: Vec<PathBuf>,
}

impl DocumentSpec {
    /// Leading text page plus one page per image.
    pub fn page_count(&self) -> usize {
        self.images.len() + 1
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S %z").to_string()
    }
}

/// Where the printed text page falls short of the payload it shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextPageLoss {
    /// Laid-out lines cut from the text page because they did not fit.
    pub omitted_lines: usize,
    /// Characters printed as '?' because the page font cannot show them.
    pub replaced_chars: usize,
}

impl TextPageLoss {
    pub fn is_lossless(&self) -> bool {
        self.omitted_lines == 0 && self.replaced_chars == 0
    }
}

/// A written backup document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub path: PathBuf,
    pub text_loss: TextPageLoss,
}
