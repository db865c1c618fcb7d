//! Per-role transcript maps and the canonical display merge.

use serde::Serialize;
use std::collections::HashMap;
use vesper_types::{Role, TranscriptSegment};

/// One recognizer result for a fragment, as delivered by the media session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptUpdate {
    pub role: Role,
    pub id: String,
    pub text: String,
    pub is_final: bool,
}

impl TranscriptUpdate {
    pub fn new(role: Role, id: impl Into<String>, text: impl Into<String>, is_final: bool) -> Self {
        Self {
            role,
            id: id.into(),
            text: text.into(),
            is_final,
        }
    }
}

/// Segments of one role in first-arrival order, indexed by fragment id.
#[derive(Debug, Clone, Default)]
struct RoleStream {
    segments: Vec<TranscriptSegment>,
    index: HashMap<String, usize>,
}

impl RoleStream {
    /// Returns whether the stored segment changed.
    fn upsert(&mut self, update: TranscriptUpdate, arrival_ms: u64) -> bool {
        if let Some(&pos) = self.index.get(&update.id) {
            let segment = &mut self.segments[pos];
            if segment.text == update.text && segment.is_final == update.is_final {
                return false;
            }
            segment.text = update.text;
            segment.is_final = update.is_final;
            return true;
        }

        self.index.insert(update.id.clone(), self.segments.len());
        self.segments.push(TranscriptSegment {
            role: update.role,
            id: update.id,
            text: update.text,
            is_final: update.is_final,
            timestamp_ms: arrival_ms,
        });
        true
    }

    fn clear(&mut self) {
        self.segments.clear();
        self.index.clear();
    }
}

/// Immutable view of both transcript streams handed to the presentation
/// layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscriptSnapshot {
    pub agent: Vec<TranscriptSegment>,
    pub user: Vec<TranscriptSegment>,
}

impl TranscriptSnapshot {
    /// The merged display order. See [`merge_transcripts`].
    pub fn merged(&self) -> Vec<TranscriptSegment> {
        merge_transcripts(&self.agent, &self.user)
    }
}

/// Merges the two per-role sequences into display order.
///
/// Segments with blank text are dropped. The rest are sorted by
/// `timestamp_ms` ascending; equal timestamps keep agent before user, and
/// each role keeps its own stream order. The result depends only on the
/// inputs, so recomputing it after every update or once at the end gives
/// the same answer.
pub fn merge_transcripts(
    agent: &[TranscriptSegment],
    user: &[TranscriptSegment],
) -> Vec<TranscriptSegment> {
    let mut merged: Vec<TranscriptSegment> = agent
        .iter()
        .chain(user.iter())
        .filter(|segment| segment.is_displayable())
        .cloned()
        .collect();
    // Stable sort: ties keep concatenation order.
    merged.sort_by_key(|segment| segment.timestamp_ms);
    merged
}

/// Owner of the transcript maps.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    agent: RoleStream,
    user: RoleStream,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts `update` into its role's map.
    ///
    /// `arrival_ms` becomes the segment's timestamp only when the fragment is
    /// new; later updates keep the first timestamp so finalized history never
    /// moves. Returns whether anything changed.
    pub fn apply(&mut self, update: TranscriptUpdate, arrival_ms: u64) -> bool {
        let stream = match update.role {
            Role::Agent => &mut self.agent,
            Role::User => &mut self.user,
        };
        stream.upsert(update, arrival_ms)
    }

    /// Raw per-role sequences in arrival order.
    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            agent: self.agent.segments.clone(),
            user: self.user.segments.clone(),
        }
    }

    pub fn merged(&self) -> Vec<TranscriptSegment> {
        merge_transcripts(&self.agent.segments, &self.user.segments)
    }

    pub fn segment(&self, role: Role, id: &str) -> Option<&TranscriptSegment> {
        let stream = match role {
            Role::Agent => &self.agent,
            Role::User => &self.user,
        };
        stream.index.get(id).map(|&pos| &stream.segments[pos])
    }

    pub fn is_empty(&self) -> bool {
        self.agent.segments.is_empty() && self.user.segments.is_empty()
    }

    /// Drops both maps. Called when a session ends.
    pub fn clear(&mut self) {
        self.agent.clear();
        self.user.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(segments: &[TranscriptSegment]) -> Vec<(Role, &str)> {
        segments.iter().map(|s| (s.role, s.id.as_str())).collect()
    }

    #[test]
    fn interim_then_final_replaces_in_place() {
        let mut reconciler = Reconciler::new();
        assert!(reconciler.apply(TranscriptUpdate::new(Role::User, "u1", "hel", false), 100));
        assert!(reconciler.apply(TranscriptUpdate::new(Role::Agent, "a1", "Hi there", true), 50));
        assert!(reconciler.apply(TranscriptUpdate::new(Role::User, "u1", "hello", true), 100));

        let merged = reconciler.merged();
        assert_eq!(ids(&merged), vec![(Role::Agent, "a1"), (Role::User, "u1")]);
        assert!(merged[1].is_final);
        assert_eq!(merged[1].text, "hello");
    }

    #[test]
    fn later_update_keeps_first_timestamp() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(TranscriptUpdate::new(Role::Agent, "a1", "one", false), 10);
        reconciler.apply(TranscriptUpdate::new(Role::User, "u1", "two", true), 20);
        reconciler.apply(TranscriptUpdate::new(Role::Agent, "a1", "one more", true), 30);

        let segment = reconciler.segment(Role::Agent, "a1").unwrap();
        assert_eq!(segment.timestamp_ms, 10);
        assert_eq!(ids(&reconciler.merged()), vec![(Role::Agent, "a1"), (Role::User, "u1")]);
    }

    #[test]
    fn identical_update_is_a_no_op() {
        let mut reconciler = Reconciler::new();
        let update = TranscriptUpdate::new(Role::User, "u1", "same", true);
        assert!(reconciler.apply(update.clone(), 5));
        let before = reconciler.merged();
        assert!(!reconciler.apply(update, 9));
        assert_eq!(reconciler.merged(), before);
    }

    #[test]
    fn ids_are_scoped_per_role() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(TranscriptUpdate::new(Role::Agent, "seg-1", "agent says", true), 1);
        reconciler.apply(TranscriptUpdate::new(Role::User, "seg-1", "user says", true), 2);

        let merged = reconciler.merged();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "agent says");
        assert_eq!(merged[1].text, "user says");
    }

    #[test]
    fn blank_segments_are_hidden_but_kept() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(TranscriptUpdate::new(Role::User, "u1", "   ", false), 1);
        assert!(reconciler.merged().is_empty());
        assert_eq!(reconciler.snapshot().user.len(), 1);

        reconciler.apply(TranscriptUpdate::new(Role::User, "u1", "now words", false), 7);
        let merged = reconciler.merged();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].timestamp_ms, 1);
    }

    #[test]
    fn equal_timestamps_put_agent_first() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(TranscriptUpdate::new(Role::User, "u1", "user", true), 40);
        reconciler.apply(TranscriptUpdate::new(Role::Agent, "a1", "agent", true), 40);
        reconciler.apply(TranscriptUpdate::new(Role::Agent, "a2", "agent again", true), 40);

        assert_eq!(
            ids(&reconciler.merged()),
            vec![(Role::Agent, "a1"), (Role::Agent, "a2"), (Role::User, "u1")]
        );
    }

    #[test]
    fn unfinished_interim_stays_until_cleared() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(TranscriptUpdate::new(Role::Agent, "a1", "trailing", false), 3);
        reconciler.apply(TranscriptUpdate::new(Role::User, "u1", "next", true), 8);

        let merged = reconciler.merged();
        assert!(!merged[0].is_final);

        reconciler.clear();
        assert!(reconciler.is_empty());
        assert!(reconciler.segment(Role::Agent, "a1").is_none());
    }

    #[test]
    fn snapshot_merge_matches_reconciler_merge() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(TranscriptUpdate::new(Role::Agent, "a1", "x", true), 4);
        reconciler.apply(TranscriptUpdate::new(Role::User, "u1", "y", false), 2);
        assert_eq!(reconciler.snapshot().merged(), reconciler.merged());
    }
}
