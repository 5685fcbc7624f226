use sha2::{Digest, Sha256};

/// Where the archived text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadOrigin {
    /// The file content, verbatim.
    Plain,
    /// Armored ciphertext produced by the named backend.
    Encrypted { backend: String },
}

/// The text that ends up on paper. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPayload {
    text: String,
    origin: PayloadOrigin,
}

impl TextPayload {
    pub fn new(text: String, origin: PayloadOrigin) -> Self {
        Self { text, origin }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> &PayloadOrigin {
        &self.origin
    }

    /// SHA-256 of the payload bytes, lowercase hex. Printed on the cover
    /// page so a restore from scans can be verified.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_sha256_hex() {
        let payload = TextPayload::new("hello".into(), PayloadOrigin::Plain);
        assert_eq!(
            payload.fingerprint(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
