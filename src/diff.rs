//! Structural comparison of two parsed containers
//!
//! Compares form kinds and chunk-tag membership. The point is spotting
//! "the file that loads has an FVER chunk and yours doesn't", so a full
//! order-sensitive sequence diff is not attempted.

use crate::form::{tag_to_string, Container, FormKind};
use std::collections::BTreeSet;

/// Structural differences between two containers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDiff {
    /// Set when the form kinds differ: (first, second)
    pub form_kinds: Option<(FormKind, FormKind)>,
    /// Chunk tags present in the second container but not the first
    pub missing_in_first: Vec<[u8; 4]>,
    /// Chunk tags present in the first container but not the second
    pub missing_in_second: Vec<[u8; 4]>,
}

impl FormDiff {
    /// Whether the two containers are structurally equivalent
    pub fn is_empty(&self) -> bool {
        self.form_kinds.is_none()
            && self.missing_in_first.is_empty()
            && self.missing_in_second.is_empty()
    }

    /// Missing tags rendered for messages
    pub fn missing_in_first_tags(&self) -> Vec<String> {
        self.missing_in_first.iter().map(tag_to_string).collect()
    }

    pub fn missing_in_second_tags(&self) -> Vec<String> {
        self.missing_in_second.iter().map(tag_to_string).collect()
    }
}

/// Compare two parsed containers structurally
///
/// Tag lists come out sorted, so results are deterministic regardless of
/// chunk order in either file.
pub fn diff(first: &Container, second: &Container) -> FormDiff {
    let first_ids: BTreeSet<[u8; 4]> = first.chunks.iter().map(|c| c.id).collect();
    let second_ids: BTreeSet<[u8; 4]> = second.chunks.iter().map(|c| c.id).collect();

    let form_kinds = if first.form_kind != second.form_kind {
        Some((first.form_kind, second.form_kind))
    } else {
        None
    };

    FormDiff {
        form_kinds,
        missing_in_first: second_ids.difference(&first_ids).copied().collect(),
        missing_in_second: first_ids.difference(&second_ids).copied().collect(),
    }
}
