//! Retrieval citations delivered on the `rag-sources` side channel.
//!
//! Payload shape:
//!
//! ```json
//! { "type": "rag_sources",
//!   "sources": [ { "content": "...", "source": "a.pdf", "file_type": "pdf",
//!                  "page": 2, "total_pages": 9 } ] }
//! ```

use crate::error::SideChannelError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vesper_types::Citation;

/// Data topic the agent publishes citations on.
pub const RAG_SOURCES_TOPIC: &str = "rag-sources";

/// Value of the `type` field of a citation message.
pub const RAG_SOURCES_MESSAGE_TYPE: &str = "rag_sources";

#[derive(Debug, Deserialize)]
struct SideChannelMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    sources: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    content: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    file_type: Option<String>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<RawSource> for Citation {
    fn from(raw: RawSource) -> Self {
        Citation {
            text: raw.content,
            source_name: non_blank(raw.source),
            file_type: non_blank(raw.file_type),
            page: raw.page,
            total_pages: raw.total_pages,
        }
    }
}

/// Parses a citation payload into its citations, in message order.
///
/// Nothing is returned unless the whole payload is valid.
pub fn parse_citation_message(payload: &[u8]) -> Result<Vec<Citation>, SideChannelError> {
    let text = std::str::from_utf8(payload)?;
    let message: SideChannelMessage = serde_json::from_str(text)?;
    if message.kind != RAG_SOURCES_MESSAGE_TYPE {
        return Err(SideChannelError::UnexpectedType(message.kind));
    }
    if message.sources.is_empty() {
        return Err(SideChannelError::EmptySources);
    }
    Ok(message.sources.into_iter().map(Citation::from).collect())
}

/// The most recent batch of citations for the agent's current answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CitationSet {
    citations: Vec<Citation>,
}

impl CitationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    /// Citations paired with their display headers.
    pub fn labeled(&self) -> impl Iterator<Item = (String, &Citation)> {
        self.citations
            .iter()
            .enumerate()
            .map(|(i, citation)| (citation.label(i + 1), citation))
    }

    /// Replaces the set with the citations in `payload`.
    ///
    /// On error the current set is left untouched.
    pub fn apply_message(&mut self, payload: &[u8]) -> Result<usize, SideChannelError> {
        let citations = parse_citation_message(payload)?;
        self.citations = citations;
        Ok(self.citations.len())
    }

    /// Handles one side-channel data packet.
    ///
    /// Packets on other topics are ignored. Bad citation messages are logged
    /// and dropped. Returns whether the set was replaced.
    pub fn handle_data(&mut self, topic: Option<&str>, payload: &[u8]) -> bool {
        if topic != Some(RAG_SOURCES_TOPIC) {
            return false;
        }
        match self.apply_message(payload) {
            Ok(count) => {
                debug!(count, "replaced citation set");
                true
            }
            Err(SideChannelError::UnexpectedType(kind)) => {
                debug!(%kind, "ignoring side-channel message of unexpected type");
                false
            }
            Err(e) => {
                warn!(bytes = payload.len(), "dropping side-channel message: {}", e);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.citations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_source_metadata() {
        let payload = br#"{"type":"rag_sources","sources":[
            {"content":"Refunds take 5 days.","source":"policy.pdf","file_type":"pdf",
             "page":2,"total_pages":9,"doc_id":"d1","chunk_index":4}]}"#;
        let citations = parse_citation_message(payload).expect("should parse");
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].text, "Refunds take 5 days.");
        assert_eq!(citations[0].source_name.as_deref(), Some("policy.pdf"));
        assert_eq!(citations[0].page, Some(2));
        assert_eq!(citations[0].total_pages, Some(9));
    }

    #[test]
    fn blank_metadata_becomes_none() {
        let payload = br#"{"type":"rag_sources","sources":[{"content":"x","file_type":""}]}"#;
        let citations = parse_citation_message(payload).unwrap();
        assert_eq!(citations[0].file_type, None);
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(matches!(
            parse_citation_message(&[0xff, 0xfe]),
            Err(SideChannelError::NotUtf8(_))
        ));
        assert!(matches!(
            parse_citation_message(b"not json"),
            Err(SideChannelError::Malformed(_))
        ));
        assert!(matches!(
            parse_citation_message(br#"{"type":"rag_sources","sources":[]}"#),
            Err(SideChannelError::EmptySources)
        ));
        assert!(matches!(
            parse_citation_message(br#"{"type":"rag_sources"}"#),
            Err(SideChannelError::EmptySources)
        ));
        assert!(matches!(
            parse_citation_message(br#"{"type":"other"}"#),
            Err(SideChannelError::UnexpectedType(kind)) if kind == "other"
        ));
    }

    #[test]
    fn one_bad_source_rejects_the_whole_message() {
        let mut set = CitationSet::new();
        set.apply_message(br#"{"type":"rag_sources","sources":[{"content":"keep"}]}"#)
            .unwrap();

        let err = set
            .apply_message(br#"{"type":"rag_sources","sources":[{"content":"A"},{"page":1}]}"#)
            .unwrap_err();
        assert!(matches!(err, SideChannelError::Malformed(_)));
        assert_eq!(set.citations()[0].text, "keep");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn handle_data_filters_topic() {
        let mut set = CitationSet::new();
        let payload = br#"{"type":"rag_sources","sources":[{"content":"A"}]}"#;
        assert!(!set.handle_data(Some("chat"), payload));
        assert!(!set.handle_data(None, payload));
        assert!(set.is_empty());
        assert!(set.handle_data(Some(RAG_SOURCES_TOPIC), payload));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn labeled_numbers_from_one() {
        let mut set = CitationSet::new();
        set.apply_message(
            br#"{"type":"rag_sources","sources":[{"content":"A","source":"a.md"},{"content":"B"}]}"#,
        )
        .unwrap();
        let labels: Vec<String> = set.labeled().map(|(label, _)| label).collect();
        assert_eq!(labels, vec!["[Source 1: a.md]", "[Source 2: unknown]"]);
    }
}
