//! Error types for opdrum

use thiserror::Error;

/// Result type alias for opdrum operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for opdrum
#[derive(Error, Debug)]
pub enum Error {
    /// Input does not start with a FORM header
    #[error("not an AIFF/AIFC container")]
    NotAContainer,

    /// Embedded drum metadata could not be decoded
    #[error("metadata decode error: {0}")]
    MetadataDecode(String),

    /// A chunk the rebuild cannot synthesize is absent
    #[error("missing required chunk '{id}'")]
    MissingRequiredChunk { id: String },

    /// Format error
    #[error("format error: {0}")]
    Format(String),

    /// Initialization error
    #[error("initialization error: {0}")]
    Init(String),
}

impl Error {
    /// Create a format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Create a metadata decode error
    pub fn metadata_decode<S: Into<String>>(msg: S) -> Self {
        Error::MetadataDecode(msg.into())
    }

    /// Create a missing-required-chunk error from a raw chunk tag
    pub fn missing_chunk(id: &[u8; 4]) -> Self {
        Error::MissingRequiredChunk {
            id: String::from_utf8_lossy(id).into_owned(),
        }
    }
}
