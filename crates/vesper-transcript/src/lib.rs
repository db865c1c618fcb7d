//! Realtime stream reconciliation for the Vesper voice client.
//!
//! Two live transcription streams (agent speech and user speech) arrive
//! independently, each ordered within itself. The [`Reconciler`] keeps one
//! map per role and derives a single time-ordered view with the pure
//! [`merge_transcripts`] function. Retrieval citations arrive on a separate
//! side channel and replace the [`CitationSet`] wholesale.

pub mod citations;
pub mod error;
pub mod transcript;

pub use citations::{
    parse_citation_message, CitationSet, RAG_SOURCES_MESSAGE_TYPE, RAG_SOURCES_TOPIC,
};
pub use error::SideChannelError;
pub use transcript::{merge_transcripts, Reconciler, TranscriptSnapshot, TranscriptUpdate};
