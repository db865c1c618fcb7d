//! Ordering properties of the merged transcript view over many
//! deterministic pseudo-random interleavings of agent and user updates.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vesper_transcript::{CitationSet, Reconciler, TranscriptUpdate, RAG_SOURCES_TOPIC};
use vesper_types::{Role, TranscriptSegment};

/// Generates `steps` updates with their arrival times. The clock sometimes
/// stands still so equal timestamps across roles are common.
fn interleaving(seed: u64, steps: usize) -> Vec<(TranscriptUpdate, u64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut clock = 0u64;
    let mut next_id = [0u32; 2];
    let texts = ["", "  ", "hello", "hello there", "ok", "what about page two"];
    let mut out = Vec::with_capacity(steps);

    for _ in 0..steps {
        if rng.gen_bool(2.0 / 3.0) {
            clock += rng.gen_range(0..40u64);
        }
        let role = if rng.gen_bool(0.5) { Role::Agent } else { Role::User };
        let slot = role as usize;
        let id = if next_id[slot] == 0 || rng.gen_bool(1.0 / 3.0) {
            next_id[slot] += 1;
            next_id[slot]
        } else {
            rng.gen_range(1..=next_id[slot])
        };
        let text = texts[rng.gen_range(0..texts.len())];
        let update = TranscriptUpdate::new(role, format!("{}-{}", role, id), text, rng.gen_bool(0.5));
        out.push((update, clock));
    }
    out
}

fn assert_display_order(merged: &[TranscriptSegment]) {
    for pair in merged.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.timestamp_ms < b.timestamp_ms
                || (a.timestamp_ms == b.timestamp_ms && a.role <= b.role),
            "out of order: {:?} before {:?}",
            a,
            b
        );
    }
}

// ── ordering ─────────────────────────────────────────────────────────

#[test]
fn merged_view_is_always_ordered() {
    for seed in 0..200 {
        let mut reconciler = Reconciler::new();
        for (update, arrival) in interleaving(seed, 60) {
            reconciler.apply(update, arrival);
            let merged = reconciler.merged();
            assert_display_order(&merged);
            assert!(merged.iter().all(TranscriptSegment::is_displayable));
        }
    }
}

#[test]
fn each_fragment_appears_once() {
    for seed in 0..100 {
        let mut reconciler = Reconciler::new();
        for (update, arrival) in interleaving(seed, 80) {
            reconciler.apply(update, arrival);
        }
        let merged = reconciler.merged();
        let mut keys: Vec<(Role, &str)> = merged.iter().map(|s| (s.role, s.id.as_str())).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total, "seed {seed} produced a duplicate segment");
    }
}

#[test]
fn recompute_frequency_does_not_matter() {
    for seed in 0..100 {
        let updates = interleaving(seed, 50);

        let mut eager = Reconciler::new();
        let mut last_view = Vec::new();
        for (update, arrival) in updates.clone() {
            eager.apply(update, arrival);
            last_view = eager.merged();
        }

        let mut lazy = Reconciler::new();
        for (update, arrival) in updates {
            lazy.apply(update, arrival);
        }

        assert_eq!(last_view, lazy.merged());
        assert_eq!(lazy.snapshot().merged(), lazy.merged());
    }
}

#[test]
fn reapplying_an_update_is_idempotent() {
    for seed in 0..100 {
        let mut reconciler = Reconciler::new();
        for (update, arrival) in interleaving(seed, 40) {
            reconciler.apply(update.clone(), arrival);
            let before = reconciler.merged();
            assert!(!reconciler.apply(update, arrival + 1000));
            assert_eq!(reconciler.merged(), before);
        }
    }
}

// ── scenarios ────────────────────────────────────────────────────────

#[test]
fn user_interim_then_agent_final_then_user_final() {
    let mut reconciler = Reconciler::new();
    reconciler.apply(TranscriptUpdate::new(Role::User, "u1", "what is", false), 100);
    reconciler.apply(TranscriptUpdate::new(Role::Agent, "a1", "Welcome!", true), 50);
    reconciler.apply(TranscriptUpdate::new(Role::User, "u1", "what is this", true), 100);

    let merged = reconciler.merged();
    let ids: Vec<&str> = merged.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "u1"]);
    assert!(merged[1].is_final);
}

#[test]
fn citation_message_replaces_set_in_order() {
    let mut set = CitationSet::new();
    assert!(set.handle_data(
        Some(RAG_SOURCES_TOPIC),
        br#"{"type":"rag_sources","sources":[{"content":"A"},{"content":"B"}]}"#,
    ));
    let texts: Vec<&str> = set.citations().iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["A", "B"]);

    assert!(!set.handle_data(Some(RAG_SOURCES_TOPIC), br#"{"type":"other"}"#));
    assert_eq!(set.len(), 2);

    assert!(set.handle_data(
        Some(RAG_SOURCES_TOPIC),
        br#"{"type":"rag_sources","sources":[{"content":"C"}]}"#,
    ));
    let texts: Vec<&str> = set.citations().iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["C"]);
}
