//! opdrum - OP-1/OP-Z drum AIFF container toolkit
//!
//! opdrum parses, validates, and repairs the AIFF/AIFC drum sample
//! containers produced and consumed by the OP-1 and OP-Z. The devices are
//! strict about chunk layout, so files assembled by other tools often load
//! silently wrong or not at all; this crate decomposes a file into its
//! chunk structure, checks it against the device's compatibility rules,
//! and can rebuild it in the canonical layout the hardware expects.
//!
//! # Architecture
//!
//! - `form`: FORM container structures and the chunk-stream reader
//! - `metadata`: embedded `op-1` JSON drum metadata codec and slice geometry
//! - `validate`: device-compatibility rule evaluation
//! - `rebuild`: canonicalizing rebuild of a parsed container
//! - `diff`: structural comparison of two parsed containers
//!
//! All operations are pure transforms over in-memory byte buffers; file
//! I/O and report presentation are the caller's responsibility.

pub mod diff;
pub mod error;
pub mod form;
pub mod metadata;
pub mod rebuild;
pub mod validate;

pub use error::{Error, Result};

/// opdrum version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the opdrum library
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            debug: false,
        }
    }
}

/// Initialize the opdrum library with the given configuration
pub fn init(config: Config) -> Result<()> {
    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        tracing_subscriber::fmt()
            .with_env_filter(level)
            .try_init()
            .map_err(|e| Error::Init(format!("Failed to initialize logging: {}", e)))?;
    }

    Ok(())
}
