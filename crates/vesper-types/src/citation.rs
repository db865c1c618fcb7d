//! Retrieval citations attached to the agent's current answer.

use serde::{Deserialize, Serialize};

/// A single retrieved passage the agent used to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// The retrieved passage text.
    pub text: String,
    /// Name of the source document.
    pub source_name: Option<String>,
    /// File type of the source document (e.g. `pdf`).
    pub file_type: Option<String>,
    /// 1-based page the passage came from.
    pub page: Option<u32>,
    /// Total page count of the source document.
    pub total_pages: Option<u32>,
}

impl Citation {
    /// Creates a citation with only passage text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_name: None,
            file_type: None,
            page: None,
            total_pages: None,
        }
    }

    /// Renders the header the agent uses when quoting this passage, where
    /// `index` is the 1-based position in the citation set.
    ///
    /// Page information is only included for multi-page documents.
    pub fn label(&self, index: usize) -> String {
        let source = self.source_name.as_deref().unwrap_or("unknown");
        match self.total_pages {
            Some(total) if total > 1 => {
                let page = self.page.unwrap_or(1);
                format!("[Source {index}: {source}, page {page}/{total}]")
            }
            _ => format!("[Source {index}: {source}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_includes_page_for_multi_page_documents() {
        let citation = Citation {
            source_name: Some("handbook.pdf".into()),
            file_type: Some("pdf".into()),
            page: Some(3),
            total_pages: Some(12),
            ..Citation::new("text")
        };
        assert_eq!(citation.label(1), "[Source 1: handbook.pdf, page 3/12]");
    }

    #[test]
    fn label_omits_page_for_single_page_documents() {
        let citation = Citation {
            source_name: Some("notes.txt".into()),
            total_pages: Some(1),
            ..Citation::new("text")
        };
        assert_eq!(citation.label(2), "[Source 2: notes.txt]");
        assert_eq!(Citation::new("x").label(3), "[Source 3: unknown]");
    }
}
