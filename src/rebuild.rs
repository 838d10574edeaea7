//! Canonicalizing rebuild of drum containers
//!
//! The device expects its chunks in one fixed order: FVER (AIFC only),
//! then COMM, APPL, and SSND. The rebuild takes whatever a parse found,
//! reorders it, synthesizes the structures that can be synthesized, and
//! re-serializes. COMM and SSND carry the audio format and the samples
//! themselves; nothing can stand in for them, so their absence is fatal.

use crate::error::{Error, Result};
use crate::form::{
    Container, APPL_CHUNK, AIFC_MAGIC, AIFF_MAGIC, COMM_CHUNK, FORM_MAGIC, FVER_CHUNK,
    FVER_VERSION, OP1_CHUNK, SSND_CHUNK,
};
use crate::metadata;
use std::borrow::Cow;
use tracing::debug;

/// Rebuild a parsed container into the canonical byte layout
///
/// Pure transform: the input container is never modified and failures
/// produce no partial output. Chunk lookup takes the first match when a
/// tag appears more than once, and an `APPL` chunk wins over the legacy
/// `op-1` chunk when both carry metadata.
pub fn rebuild(container: &Container) -> Result<Vec<u8>> {
    let comm = container
        .find(COMM_CHUNK)
        .ok_or_else(|| Error::missing_chunk(COMM_CHUNK))?;
    let ssnd = container
        .find(SSND_CHUNK)
        .ok_or_else(|| Error::missing_chunk(SSND_CHUNK))?;
    let is_aifc = container.form_kind.is_aifc();

    // (tag, payload) pairs in canonical emit order
    let mut emitted: Vec<(&[u8; 4], Cow<'_, [u8]>)> = Vec::with_capacity(4);

    if is_aifc {
        let payload = match container.find(FVER_CHUNK) {
            Some(fver) => Cow::from(&fver.payload[..]),
            None => {
                debug!("synthesizing FVER chunk");
                Cow::from(FVER_VERSION.to_be_bytes().to_vec())
            }
        };
        emitted.push((FVER_CHUNK, payload));
    }

    emitted.push((COMM_CHUNK, Cow::from(&comm.payload[..])));

    // The legacy op-1 chunk is payload-compatible with APPL; re-emitting
    // it under the APPL tag is all the conversion it needs
    let metadata_payload = match container.find(APPL_CHUNK).or_else(|| container.find(OP1_CHUNK)) {
        Some(source) => {
            debug!("carrying metadata from '{}' chunk", source.tag());
            Cow::from(&source.payload[..])
        }
        None => {
            debug!("no metadata chunk found, synthesizing minimal APPL");
            Cow::from(metadata::synthesize_minimal()?)
        }
    };
    emitted.push((APPL_CHUNK, metadata_payload));

    emitted.push((SSND_CHUNK, Cow::from(&ssnd.payload[..])));

    // FORM size counts the form-type tag plus every chunk with header
    // and pad, not the original file's declared size
    let total_size: u32 = 4 + emitted
        .iter()
        .map(|(_, payload)| 8 + payload.len() as u32 + (payload.len() as u32 & 1))
        .sum::<u32>();

    let mut out = Vec::with_capacity(total_size as usize + 8);
    out.extend_from_slice(FORM_MAGIC);
    out.extend_from_slice(&total_size.to_be_bytes());
    out.extend_from_slice(if is_aifc { AIFC_MAGIC } else { AIFF_MAGIC });

    for (id, payload) in &emitted {
        out.extend_from_slice(*id);
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Chunk, ChunkReader, FormKind, SOWT_COMPRESSION};

    fn chunk(id: &[u8; 4], payload: Vec<u8>) -> Chunk {
        Chunk {
            id: *id,
            size: payload.len() as u32,
            offset: 0,
            payload,
        }
    }

    fn aifc_comm_payload() -> Vec<u8> {
        let mut payload = vec![0u8; 22];
        payload[18..22].copy_from_slice(SOWT_COMPRESSION);
        payload
    }

    fn chunk_ids(container: &Container) -> Vec<[u8; 4]> {
        container.chunks.iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_missing_comm_is_fatal() {
        let container = Container {
            form_kind: FormKind::Aiff,
            chunks: vec![chunk(SSND_CHUNK, vec![0; 8])],
        };
        assert!(matches!(
            rebuild(&container),
            Err(Error::MissingRequiredChunk { id }) if id == "COMM"
        ));
    }

    #[test]
    fn test_missing_ssnd_is_fatal() {
        let container = Container {
            form_kind: FormKind::Aiff,
            chunks: vec![chunk(COMM_CHUNK, vec![0; 18])],
        };
        assert!(matches!(
            rebuild(&container),
            Err(Error::MissingRequiredChunk { id }) if id == "SSND"
        ));
    }

    #[test]
    fn test_canonical_order_and_fver_synthesis() {
        // Chunks out of order, no FVER at all
        let container = Container {
            form_kind: FormKind::Aifc,
            chunks: vec![
                chunk(SSND_CHUNK, vec![7; 32]),
                chunk(COMM_CHUNK, aifc_comm_payload()),
            ],
        };

        let bytes = rebuild(&container).unwrap();
        let rebuilt = ChunkReader::new().parse(&bytes).unwrap();
        assert!(rebuilt.warnings.is_empty());
        assert_eq!(rebuilt.container.form_kind, FormKind::Aifc);
        assert_eq!(
            chunk_ids(&rebuilt.container),
            vec![*FVER_CHUNK, *COMM_CHUNK, *APPL_CHUNK, *SSND_CHUNK]
        );

        // Synthesized FVER leads and carries the device version
        let fver = &rebuilt.container.chunks[0];
        assert_eq!(fver.payload, FVER_VERSION.to_be_bytes());
    }

    #[test]
    fn test_aiff_omits_fver() {
        let container = Container {
            form_kind: FormKind::Aiff,
            chunks: vec![
                chunk(COMM_CHUNK, vec![0; 18]),
                chunk(SSND_CHUNK, vec![1; 16]),
            ],
        };

        let bytes = rebuild(&container).unwrap();
        let rebuilt = ChunkReader::new().parse(&bytes).unwrap();
        assert_eq!(
            chunk_ids(&rebuilt.container),
            vec![*COMM_CHUNK, *APPL_CHUNK, *SSND_CHUNK]
        );
    }

    #[test]
    fn test_existing_fver_payload_kept() {
        let container = Container {
            form_kind: FormKind::Aifc,
            chunks: vec![
                chunk(COMM_CHUNK, aifc_comm_payload()),
                chunk(FVER_CHUNK, 0x12345678u32.to_be_bytes().to_vec()),
                chunk(SSND_CHUNK, vec![0; 8]),
            ],
        };

        let bytes = rebuild(&container).unwrap();
        let rebuilt = ChunkReader::new().parse(&bytes).unwrap();
        assert_eq!(rebuilt.container.chunks[0].payload, 0x12345678u32.to_be_bytes());
    }

    #[test]
    fn test_appl_synthesis_when_no_metadata() {
        let container = Container {
            form_kind: FormKind::Aiff,
            chunks: vec![
                chunk(COMM_CHUNK, vec![0; 18]),
                chunk(SSND_CHUNK, vec![0; 8]),
            ],
        };

        let bytes = rebuild(&container).unwrap();
        let rebuilt = ChunkReader::new().parse(&bytes).unwrap();
        let appl = rebuilt.container.find(APPL_CHUNK).unwrap();
        assert_eq!(appl.payload, b"op-1{\"type\":\"drum\",\"drum_version\":2}");
    }

    #[test]
    fn test_legacy_chunk_retagged_as_appl() {
        let legacy_payload = b"op-1{\"drum_version\":2}".to_vec();
        let container = Container {
            form_kind: FormKind::Aiff,
            chunks: vec![
                chunk(COMM_CHUNK, vec![0; 18]),
                chunk(OP1_CHUNK, legacy_payload.clone()),
                chunk(SSND_CHUNK, vec![0; 8]),
            ],
        };

        let bytes = rebuild(&container).unwrap();
        let rebuilt = ChunkReader::new().parse(&bytes).unwrap();
        assert!(rebuilt.container.find(OP1_CHUNK).is_none());
        assert_eq!(
            rebuilt.container.find(APPL_CHUNK).unwrap().payload,
            legacy_payload
        );
    }

    #[test]
    fn test_appl_wins_over_legacy_chunk() {
        let container = Container {
            form_kind: FormKind::Aiff,
            chunks: vec![
                chunk(COMM_CHUNK, vec![0; 18]),
                chunk(OP1_CHUNK, b"op-1{\"name\":\"old\"}".to_vec()),
                chunk(APPL_CHUNK, b"op-1{\"name\":\"new\"}".to_vec()),
                chunk(SSND_CHUNK, vec![0; 8]),
            ],
        };

        let bytes = rebuild(&container).unwrap();
        let rebuilt = ChunkReader::new().parse(&bytes).unwrap();
        assert_eq!(
            rebuilt.container.find(APPL_CHUNK).unwrap().payload,
            b"op-1{\"name\":\"new\"}".to_vec()
        );
    }

    #[test]
    fn test_duplicate_chunks_first_match_wins() {
        let container = Container {
            form_kind: FormKind::Aiff,
            chunks: vec![
                chunk(COMM_CHUNK, vec![1; 18]),
                chunk(COMM_CHUNK, vec![2; 18]),
                chunk(SSND_CHUNK, vec![0; 8]),
            ],
        };

        let bytes = rebuild(&container).unwrap();
        let rebuilt = ChunkReader::new().parse(&bytes).unwrap();
        assert_eq!(rebuilt.container.find(COMM_CHUNK).unwrap().payload, vec![1; 18]);
    }

    #[test]
    fn test_declared_size_matches_buffer() {
        let container = Container {
            form_kind: FormKind::Aifc,
            chunks: vec![
                chunk(COMM_CHUNK, aifc_comm_payload()),
                // Odd payload exercises pad accounting in the size field
                chunk(SSND_CHUNK, vec![0; 33]),
            ],
        };

        let bytes = rebuild(&container).unwrap();
        let declared = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(declared as usize, bytes.len() - 8);
    }

    #[test]
    fn test_odd_payloads_are_padded() {
        let container = Container {
            form_kind: FormKind::Aiff,
            chunks: vec![
                chunk(COMM_CHUNK, vec![0; 18]),
                chunk(SSND_CHUNK, vec![9; 7]),
            ],
        };

        let bytes = rebuild(&container).unwrap();
        // Buffer stays word-aligned and ends with the pad byte
        assert_eq!(bytes.len() % 2, 0);
        assert_eq!(*bytes.last().unwrap(), 0);

        let rebuilt = ChunkReader::new().parse(&bytes).unwrap();
        assert_eq!(rebuilt.container.find(SSND_CHUNK).unwrap().payload, vec![9; 7]);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let container = Container {
            form_kind: FormKind::Aifc,
            chunks: vec![
                chunk(SSND_CHUNK, vec![5; 41]),
                chunk(OP1_CHUNK, b"op-1{\"drum_version\":2}".to_vec()),
                chunk(COMM_CHUNK, aifc_comm_payload()),
            ],
        };

        let first = rebuild(&container).unwrap();
        let reparsed = ChunkReader::new().parse(&first).unwrap();
        let second = rebuild(&reparsed.container).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_input_container_unchanged() {
        let container = Container {
            form_kind: FormKind::Aifc,
            chunks: vec![
                chunk(SSND_CHUNK, vec![0; 8]),
                chunk(COMM_CHUNK, aifc_comm_payload()),
            ],
        };
        let before = container.clone();

        rebuild(&container).unwrap();
        assert_eq!(container, before);
    }
}
