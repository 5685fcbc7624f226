use crate::core::errors::{BackupError, Result};
use crate::core::models::chunk::Chunk;

/// Splits payload text into fixed-size groups of lines.
pub struct Chunker;

impl Chunker {
    /// Partition `text` into consecutive groups of `size` lines.
    ///
    /// A line keeps its `\n` terminator; the last line may lack one.
    /// Every chunk but the last holds exactly `size` lines, and joining
    /// all chunk texts in order reproduces `text` byte for byte.
    /// Empty text yields no chunks.
    pub fn chunk(&self, text: &str, size: usize) -> Result<Vec<Chunk>> {
        if size == 0 {
            return Err(BackupError::invalid("chunk size must be a positive integer"));
        }

        let lines: Vec<&str> = text.split_inclusive('\n').collect();

        Ok(lines
            .chunks(size)
            .enumerate()
            .map(|(index, group)| Chunk {
                index,
                text: group.concat(),
                line_count: group.len(),
            })
            .collect())
    }
}
