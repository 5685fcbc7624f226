/// A contiguous run of payload lines destined for one QR code.
///
/// `index` is zero-based and equals the image's page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub line_count: usize,
}
