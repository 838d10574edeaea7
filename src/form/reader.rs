//! FORM chunk-stream parsing
//!
//! Decomposes a whole in-memory buffer into an ordered chunk sequence.
//! Parsing is deliberately forgiving: a chunk whose declared size runs
//! past the end of the buffer stops enumeration but keeps everything
//! parsed so far, so damaged files can still be inspected and repaired.

use super::{tag_to_string, Chunk, Container, FormKind, FORM_MAGIC};
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, warn};

/// Default upper bound on a declared chunk size. A length field above
/// this is assumed to be corrupt rather than a real multi-hundred-MB
/// sample.
pub const MAX_CHUNK_SIZE: u32 = 100_000_000;

/// Non-fatal problem found while enumerating chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// Declared size runs past the end of the buffer
    Truncated { id: [u8; 4], offset: usize },
    /// Declared size exceeds the reader's plausibility bound
    Oversized { id: [u8; 4], offset: usize, size: u32 },
}

impl ParseWarning {
    /// Human-readable description for diagnostics
    pub fn message(&self) -> String {
        match self {
            ParseWarning::Truncated { id, offset } => format!(
                "truncated chunk '{}' at offset {}",
                tag_to_string(id),
                offset
            ),
            ParseWarning::Oversized { id, offset, size } => format!(
                "implausible size {} for chunk '{}' at offset {}",
                size,
                tag_to_string(id),
                offset
            ),
        }
    }
}

/// Result of parsing one buffer: the container plus any non-fatal
/// problems hit along the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedForm {
    pub container: Container,
    pub warnings: Vec<ParseWarning>,
}

/// Chunk-stream reader for AIFF/AIFC buffers
pub struct ChunkReader {
    max_chunk_size: u32,
}

impl ChunkReader {
    /// Create a reader with the default size guard
    pub fn new() -> Self {
        ChunkReader {
            max_chunk_size: MAX_CHUNK_SIZE,
        }
    }

    /// Create a reader with a custom size guard
    pub fn with_max_chunk_size(max_chunk_size: u32) -> Self {
        ChunkReader { max_chunk_size }
    }

    /// Parse a whole file buffer into a container
    ///
    /// Fails only when the buffer does not start with a FORM header.
    /// Truncated or implausibly-sized chunks stop enumeration and are
    /// reported as warnings; chunks parsed before that point are kept.
    pub fn parse(&self, data: &[u8]) -> Result<ParsedForm> {
        if data.len() < 12 || &data[0..4] != FORM_MAGIC {
            return Err(Error::NotAContainer);
        }

        let declared_size = BigEndian::read_u32(&data[4..8]);
        let mut form_tag = [0u8; 4];
        form_tag.copy_from_slice(&data[8..12]);
        let form_kind = FormKind::from_tag(form_tag);

        debug!(
            "parsing {} container, declared size {}, buffer {} bytes",
            form_kind,
            declared_size,
            data.len()
        );

        let mut chunks = Vec::new();
        let mut warnings = Vec::new();
        let mut pos = 12usize;

        // Fewer than 8 bytes left is trailing slack, not an error
        while pos + 8 <= data.len() {
            let mut id = [0u8; 4];
            id.copy_from_slice(&data[pos..pos + 4]);
            let size = BigEndian::read_u32(&data[pos + 4..pos + 8]);

            if size > self.max_chunk_size {
                warn!(
                    "chunk '{}' at offset {} declares implausible size {}",
                    tag_to_string(&id),
                    pos,
                    size
                );
                warnings.push(ParseWarning::Oversized {
                    id,
                    offset: pos,
                    size,
                });
                break;
            }

            let end = pos + 8 + size as usize;
            if end > data.len() {
                warn!(
                    "chunk '{}' at offset {} runs past end of buffer",
                    tag_to_string(&id),
                    pos
                );
                warnings.push(ParseWarning::Truncated { id, offset: pos });
                break;
            }

            chunks.push(Chunk {
                id,
                size,
                offset: pos,
                payload: data[pos + 8..end].to_vec(),
            });

            // Odd-sized chunks are followed by one pad byte
            pos = end + (size as usize & 1);
        }

        Ok(ParsedForm {
            container: Container { form_kind, chunks },
            warnings,
        })
    }
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new()
    }
}
