//! Live transcript fragments.

use crate::Role;
use serde::{Deserialize, Serialize};

/// One utterance fragment from either party.
///
/// Identity is `(role, id)`: a later update for the same fragment replaces
/// `text` and `is_final` in place but keeps the original `timestamp_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Which party spoke.
    pub role: Role,
    /// Stable fragment id, unique only within `role`'s stream.
    pub id: String,
    /// Latest recognized text.
    pub text: String,
    /// Whether the recognizer will revise this fragment further.
    pub is_final: bool,
    /// Monotonic arrival time (milliseconds) of the first partial.
    pub timestamp_ms: u64,
}

impl TranscriptSegment {
    /// Segments whose trimmed text is empty are never displayed.
    pub fn is_displayable(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
