//! AIFF/AIFC FORM container structures
//!
//! An AIFF file is a big-endian IFF-style container: a 12-byte FORM header
//! followed by a sequence of tagged, length-prefixed chunks. Odd-sized
//! chunks are followed by a single zero pad byte that is not counted in
//! the declared chunk size.

pub mod reader;

pub use reader::{ChunkReader, ParseWarning, ParsedForm};

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use std::fmt;

/// FORM container magic numbers
pub const FORM_MAGIC: &[u8; 4] = b"FORM";
pub const AIFF_MAGIC: &[u8; 4] = b"AIFF";
pub const AIFC_MAGIC: &[u8; 4] = b"AIFC";

/// Chunk tags the device cares about
pub const FVER_CHUNK: &[u8; 4] = b"FVER";
pub const COMM_CHUNK: &[u8; 4] = b"COMM";
pub const SSND_CHUNK: &[u8; 4] = b"SSND";
pub const APPL_CHUNK: &[u8; 4] = b"APPL";
/// Legacy metadata chunk written by older exporters, payload-compatible
/// with the APPL chunk
pub const OP1_CHUNK: &[u8; 4] = b"op-1";

/// AIFC format version timestamp used by OP-1/OP-Z files
pub const FVER_VERSION: u32 = 0xA280_5140;
/// Compression code the device requires in AIFC COMM chunks
pub const SOWT_COMPRESSION: &[u8; 4] = b"sowt";

/// Render a chunk tag for messages
pub fn tag_to_string(tag: &[u8; 4]) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

/// The top-level container subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Aiff,
    Aifc,
    Unknown([u8; 4]),
}

impl FormKind {
    /// Map a form-type tag to its kind
    pub fn from_tag(tag: [u8; 4]) -> Self {
        match &tag {
            t if t == AIFF_MAGIC => FormKind::Aiff,
            t if t == AIFC_MAGIC => FormKind::Aifc,
            _ => FormKind::Unknown(tag),
        }
    }

    pub fn is_aifc(&self) -> bool {
        matches!(self, FormKind::Aifc)
    }

    pub fn is_aiff(&self) -> bool {
        matches!(self, FormKind::Aiff)
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormKind::Aiff => write!(f, "AIFF"),
            FormKind::Aifc => write!(f, "AIFC"),
            FormKind::Unknown(tag) => write!(f, "Unknown({})", tag_to_string(tag)),
        }
    }
}

/// One tagged, length-prefixed region of the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 4-character chunk tag
    pub id: [u8; 4],
    /// Declared payload size in bytes
    pub size: u32,
    /// Absolute byte offset of this chunk's header in the source buffer
    pub offset: usize,
    /// Payload bytes, exactly `size` long (pad byte excluded)
    pub payload: Vec<u8>,
}

impl Chunk {
    /// Chunk tag rendered for messages
    pub fn tag(&self) -> String {
        tag_to_string(&self.id)
    }

    /// Bytes this chunk occupies in the stream, header and pad included
    pub fn padded_len(&self) -> usize {
        8 + self.size as usize + (self.size as usize & 1)
    }
}

/// A parsed FORM container: form kind plus the ordered chunk sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub form_kind: FormKind,
    pub chunks: Vec<Chunk>,
}

impl Container {
    /// First chunk with the given tag, if any
    pub fn find(&self, id: &[u8; 4]) -> Option<&Chunk> {
        self.chunks.iter().find(|c| &c.id == id)
    }

    /// Position of the first chunk with the given tag
    pub fn index_of(&self, id: &[u8; 4]) -> Option<usize> {
        self.chunks.iter().position(|c| &c.id == id)
    }
}

/// Fields of the COMM (common) chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommInfo {
    /// Number of audio channels
    pub num_channels: u16,
    /// Number of sample frames
    pub num_frames: u32,
    /// Bits per sample
    pub sample_size: u16,
    /// AIFC compression code, present when the payload carries one
    pub compression: Option<[u8; 4]>,
}

impl CommInfo {
    /// Parse COMM chunk fields from its payload
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::format("COMM chunk too small"));
        }

        let num_channels = BigEndian::read_u16(&data[0..2]);
        let num_frames = BigEndian::read_u32(&data[2..6]);
        let sample_size = BigEndian::read_u16(&data[6..8]);

        // AIFC appends an 80-bit sample rate and a compression code; the
        // code sits at bytes 18..22 when the payload is long enough
        let compression = if data.len() >= 22 {
            let mut tag = [0u8; 4];
            tag.copy_from_slice(&data[18..22]);
            Some(tag)
        } else {
            None
        };

        Ok(CommInfo {
            num_channels,
            num_frames,
            sample_size,
            compression,
        })
    }
}

/// Read the FVER format-version timestamp, if the payload is long enough
pub fn fver_version(payload: &[u8]) -> Option<u32> {
    if payload.len() < 4 {
        return None;
    }
    Some(BigEndian::read_u32(&payload[0..4]))
}
