//! Embedded OP-1 drum metadata
//!
//! Drum containers carry a JSON payload inside their APPL chunk: the
//! 4-byte application tag `op-1` followed by UTF-8 JSON describing the
//! sample slices and playback modes. This module decodes that payload,
//! derives slice geometry from it, and encodes the minimal payload used
//! when a rebuild has no metadata to carry over.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Application tag that opens the metadata payload
pub const APP_TAG: &[u8; 4] = b"op-1";

/// drum_version written into synthesized metadata
pub const DEFAULT_DRUM_VERSION: u32 = 2;

/// Slice positions are stored in ticks, 4096 ticks per sample frame
const TICKS_PER_FRAME: f64 = 4096.0;
/// Device sample rate, fixed at 44.1 kHz
const SAMPLE_RATE: f64 = 44100.0;

/// Drum metadata body as stored in the JSON payload
///
/// Every field is optional in the wild; absent fields decode to empty
/// defaults. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrumMetadata {
    /// Payload type marker, "drum" on device-written files
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub drum_version: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    /// Per-slice playback mode values
    #[serde(default)]
    pub playmode: Vec<i64>,
    /// Slice start positions in ticks, parallel to `end`
    #[serde(default)]
    pub start: Vec<f64>,
    /// Slice end positions in ticks, parallel to `start`
    #[serde(default)]
    pub end: Vec<f64>,
}

/// A decoded metadata payload: the application tag plus the drum body
#[derive(Debug, Clone)]
pub struct DecodedMetadata {
    pub app_tag: [u8; 4],
    pub drum: DrumMetadata,
}

impl DecodedMetadata {
    /// Whether the payload opened with the expected `op-1` tag
    pub fn has_expected_tag(&self) -> bool {
        &self.app_tag == APP_TAG
    }
}

/// Decode a metadata chunk payload
///
/// An unexpected application tag is not fatal; the JSON body is still
/// decoded and the caller decides how to report the tag.
pub fn decode(payload: &[u8]) -> Result<DecodedMetadata> {
    if payload.len() < 4 {
        return Err(Error::metadata_decode("payload too short for app tag"));
    }

    let mut app_tag = [0u8; 4];
    app_tag.copy_from_slice(&payload[0..4]);

    let drum = serde_json::from_slice(&payload[4..])
        .map_err(|e| Error::metadata_decode(format!("invalid JSON body: {}", e)))?;

    Ok(DecodedMetadata { app_tag, drum })
}

/// A derived start/end frame region within the audio payload
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    /// Slot index in the metadata arrays
    pub index: usize,
    pub start_frame: i64,
    pub end_frame: i64,
    pub duration_seconds: f64,
}

impl Slice {
    /// A slice that collapses to zero frames holds no audio
    pub fn is_empty(&self) -> bool {
        self.start_frame == self.end_frame
    }
}

impl DrumMetadata {
    /// Derive slice geometry from the parallel start/end arrays
    ///
    /// Zero-zero pairs are unused slots and skipped outright. Slices
    /// that collapse to zero frames stay in the list, keeping their slot
    /// index, so overlap checks can still see them; presentation filters
    /// them with [`Slice::is_empty`].
    pub fn slices(&self) -> Vec<Slice> {
        let mut out = Vec::new();
        for (index, (&start, &end)) in self.start.iter().zip(self.end.iter()).enumerate() {
            if start == 0.0 && end == 0.0 {
                continue;
            }
            let start_frame = (start / TICKS_PER_FRAME).round() as i64;
            let end_frame = (end / TICKS_PER_FRAME).round() as i64;
            out.push(Slice {
                index,
                start_frame,
                end_frame,
                duration_seconds: (end_frame - start_frame) as f64 / SAMPLE_RATE,
            });
        }
        out
    }
}

/// Find overlapping slices by comparing adjacent pairs of the derived
/// list in slot order. Returns the slot index pairs that overlap.
pub fn overlaps(slices: &[Slice]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for pair in slices.windows(2) {
        if pair[0].end_frame >= pair[1].start_frame {
            out.push((pair[0].index, pair[1].index));
        }
    }
    out
}

#[derive(Debug, Serialize)]
struct MinimalDrum {
    #[serde(rename = "type")]
    kind: &'static str,
    drum_version: u32,
}

/// Encode the minimal metadata payload used when a rebuild has to
/// synthesize an APPL chunk from nothing: the `op-1` tag followed by
/// `{"type":"drum","drum_version":2}`.
pub fn synthesize_minimal() -> Result<Vec<u8>> {
    let body = MinimalDrum {
        kind: "drum",
        drum_version: DEFAULT_DRUM_VERSION,
    };
    let json = serde_json::to_vec(&body)
        .map_err(|e| Error::format(format!("failed to encode metadata: {}", e)))?;

    let mut out = APP_TAG.to_vec();
    out.extend_from_slice(&json);
    Ok(out)
}
