//! Device-compatibility rule evaluation
//!
//! The OP-1/OP-Z loader is picky about details the AIFF spec leaves
//! loose: FVER must exist (and lead) in AIFC files, the COMM chunk must
//! carry the `sowt` compression code, and the embedded drum metadata
//! must match the form type. Each rule here is evaluated independently
//! and produces a diagnostic; nothing short-circuits and nothing is
//! mutated, so a caller gets the complete picture in one pass.

use crate::form::{
    fver_version, CommInfo, Container, ParsedForm, APPL_CHUNK, COMM_CHUNK, FVER_CHUNK,
    FVER_VERSION, SOWT_COMPRESSION,
};
use crate::metadata::{self, DrumMetadata, Slice};
use std::fmt;
use tracing::debug;

/// Expected drum_version per form kind
const DRUM_VERSION_AIFC: u32 = 2;
const DRUM_VERSION_AIFF: u32 = 3;

/// Expected nonzero playmode value per form kind
const PLAYMODE_AIFC: i64 = 4096;
const PLAYMODE_AIFF: i64 = 8192;

/// Outcome class of one rule evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Pass,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Pass => write!(f, "pass"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One rule evaluation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Stable rule identifier
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    fn pass(code: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            severity: Severity::Pass,
            message: message.into(),
        }
    }

    fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    fn error(code: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Evaluate the full compatibility ruleset against a parsed container
///
/// `drum` is the decoded APPL metadata when one decoded; rules that need
/// it are skipped when it is absent, except the rules whose job is to
/// flag that absence. Never fails and never mutates its input.
pub fn validate(container: &Container, drum: Option<&DrumMetadata>) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let is_aifc = container.form_kind.is_aifc();

    // FVER rules
    let fver_index = container.index_of(FVER_CHUNK);
    if is_aifc {
        match fver_index {
            None => diags.push(Diagnostic::error(
                "fver-presence",
                "AIFC file missing required FVER chunk",
            )),
            Some(_) => diags.push(Diagnostic::pass("fver-presence", "FVER chunk present")),
        }
    }
    if let Some(index) = fver_index {
        if index != 0 {
            diags.push(Diagnostic::warning(
                "fver-position",
                format!(
                    "FVER chunk should be the first chunk after FORM, found at position {}",
                    index + 1
                ),
            ));
        } else {
            diags.push(Diagnostic::pass(
                "fver-position",
                "FVER chunk is first after FORM",
            ));
        }

        let fver = &container.chunks[index];
        match fver_version(&fver.payload) {
            Some(version) if version == FVER_VERSION => diags.push(Diagnostic::pass(
                "fver-version",
                "FVER version matches device standard",
            )),
            Some(version) => diags.push(Diagnostic::warning(
                "fver-version",
                format!(
                    "FVER version 0x{:x} doesn't match device standard 0x{:x}",
                    version, FVER_VERSION
                ),
            )),
            None => diags.push(Diagnostic::warning(
                "fver-version",
                "FVER chunk too short to hold a version",
            )),
        }
    }

    // COMM rules
    let comm = container.find(COMM_CHUNK);
    match comm {
        None => diags.push(Diagnostic::error(
            "comm-presence",
            "missing required COMM chunk",
        )),
        Some(_) => diags.push(Diagnostic::pass("comm-presence", "COMM chunk present")),
    }
    if is_aifc {
        if let Some(comm) = comm {
            if comm.payload.len() < 22 {
                diags.push(Diagnostic::error(
                    "comm-compression",
                    "AIFC COMM chunk too short, missing compression type",
                ));
            } else if &comm.payload[18..22] != SOWT_COMPRESSION {
                diags.push(Diagnostic::warning(
                    "comm-compression",
                    format!(
                        "COMM compression '{}' doesn't match device standard 'sowt'",
                        String::from_utf8_lossy(&comm.payload[18..22])
                    ),
                ));
            } else {
                diags.push(Diagnostic::pass(
                    "comm-compression",
                    "COMM chunk has correct compression type 'sowt'",
                ));
            }
        }
    }

    // APPL rules
    match container.find(APPL_CHUNK) {
        None => diags.push(Diagnostic::warning(
            "appl-presence",
            "missing APPL chunk with drum metadata",
        )),
        Some(appl) => {
            diags.push(Diagnostic::pass("appl-presence", "APPL chunk present"));
            if appl.payload.len() < 4 || &appl.payload[0..4] != metadata::APP_TAG {
                diags.push(Diagnostic::warning(
                    "appl-tag",
                    "APPL chunk doesn't open with the 'op-1' identifier",
                ));
            } else {
                diags.push(Diagnostic::pass(
                    "appl-tag",
                    "APPL chunk carries the 'op-1' identifier",
                ));
            }
        }
    }

    // Metadata rules
    if let Some(drum) = drum {
        match drum.drum_version {
            None => diags.push(Diagnostic::error(
                "drum-version",
                "missing drum_version in metadata",
            )),
            Some(version) => {
                let mismatch = (is_aifc && version != DRUM_VERSION_AIFC)
                    || (container.form_kind.is_aiff() && version != DRUM_VERSION_AIFF);
                if mismatch {
                    diags.push(Diagnostic::warning(
                        "drum-version",
                        format!(
                            "drum_version {} doesn't match expected value for {}",
                            version, container.form_kind
                        ),
                    ));
                } else {
                    diags.push(Diagnostic::pass(
                        "drum-version",
                        format!(
                            "drum_version {} matches expected value for {}",
                            version, container.form_kind
                        ),
                    ));
                }
            }
        }

        if drum.playmode.is_empty() {
            diags.push(Diagnostic::error(
                "playmode",
                "missing playmode values in metadata",
            ));
        } else {
            let mismatch = if is_aifc {
                drum.playmode.iter().any(|&v| v != 0 && v != PLAYMODE_AIFC)
            } else if container.form_kind.is_aiff() {
                drum.playmode.iter().any(|&v| v != 0 && v != PLAYMODE_AIFF)
            } else {
                false
            };
            if mismatch {
                let expected = if is_aifc { PLAYMODE_AIFC } else { PLAYMODE_AIFF };
                diags.push(Diagnostic::warning(
                    "playmode",
                    format!(
                        "playmode values should be {} for {}",
                        expected, container.form_kind
                    ),
                ));
            } else {
                diags.push(Diagnostic::pass(
                    "playmode",
                    format!("playmode values match expected values for {}", container.form_kind),
                ));
            }
        }
    }

    diags
}

/// Complete analysis of one parsed file: diagnostics plus the derived
/// slice geometry the caller's report renders
#[derive(Debug, Clone)]
pub struct Analysis {
    pub diagnostics: Vec<Diagnostic>,
    /// Derived slices, empty slots skipped; includes zero-length slices
    pub slices: Vec<Slice>,
    /// Slot index pairs of overlapping slices
    pub overlaps: Vec<(usize, usize)>,
    /// Decoded COMM fields, when the chunk parses
    pub comm: Option<CommInfo>,
}

impl Analysis {
    /// Whether any rule failed at error severity
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Whether any rule failed at warning severity or worse
    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity >= Severity::Warning)
    }
}

/// Run the full analysis over a parse result
///
/// Decodes the APPL metadata best-effort (a decode failure becomes a
/// warning, not a failure), evaluates the ruleset, and derives slice
/// geometry and overlaps.
pub fn analyze(parsed: &ParsedForm) -> Analysis {
    let container = &parsed.container;
    let mut diagnostics = Vec::new();

    for warning in &parsed.warnings {
        diagnostics.push(Diagnostic::warning("chunk-stream", warning.message()));
    }

    let mut drum = None;
    if let Some(appl) = container.find(APPL_CHUNK) {
        match metadata::decode(&appl.payload) {
            Ok(decoded) => drum = Some(decoded.drum),
            Err(e) => diagnostics.push(Diagnostic::warning(
                "metadata-decode",
                format!("failed to decode APPL metadata: {}", e),
            )),
        }
    }
    debug!(
        "analyzing {} container, {} chunks, metadata {}",
        container.form_kind,
        container.chunks.len(),
        if drum.is_some() { "decoded" } else { "absent" }
    );

    diagnostics.extend(validate(container, drum.as_ref()));

    let slices = drum.as_ref().map(|d| d.slices()).unwrap_or_default();
    let overlaps = metadata::overlaps(&slices);
    for &(a, b) in &overlaps {
        diagnostics.push(Diagnostic::warning(
            "slice-overlap",
            format!("overlap between slices {} and {}", a, b),
        ));
    }

    let comm = container
        .find(COMM_CHUNK)
        .and_then(|c| CommInfo::from_bytes(&c.payload).ok());

    Analysis {
        diagnostics,
        slices,
        overlaps,
        comm,
    }
}
