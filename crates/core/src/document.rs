//! Documents, retrieval, and context combining.
//!
//! A [`Retriever`] maps a query string to an ordered sequence of documents,
//! most relevant first. A [`DocumentCombiner`] turns that sequence into the
//! single context string the answer prompt interpolates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// A retrievable piece of reference text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The text handed to the model.
    pub page_content: String,

    /// Where the text came from (source path, chunk index, score, ...).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata value.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `source` metadata entry, if any.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

/// Maps a query to relevant documents, most relevant first.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &str;

    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError>;
}

/// Joins an ordered document sequence into one context string.
pub trait DocumentCombiner: Send + Sync {
    fn combine(&self, documents: &[Document]) -> String;
}

/// Concatenates `page_content` with a fixed separator.
#[derive(Debug, Clone)]
pub struct JoinCombiner {
    separator: String,
}

impl JoinCombiner {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for JoinCombiner {
    fn default() -> Self {
        Self::new("\n\n")
    }
}

impl DocumentCombiner for JoinCombiner {
    fn combine(&self, documents: &[Document]) -> String {
        documents
            .iter()
            .map(|d| d.page_content.as_str())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_combiner_preserves_order() {
        let docs = vec![Document::new("first"), Document::new("second"), Document::new("third")];
        assert_eq!(JoinCombiner::default().combine(&docs), "first\n\nsecond\n\nthird");
    }

    #[test]
    fn join_combiner_custom_separator() {
        let docs = vec![Document::new("a"), Document::new("b")];
        assert_eq!(JoinCombiner::new(" | ").combine(&docs), "a | b");
    }

    #[test]
    fn combining_nothing_is_empty() {
        assert_eq!(JoinCombiner::default().combine(&[]), "");
    }

    #[test]
    fn metadata_source_lookup() {
        let doc = Document::new("x")
            .with_metadata("source", "faq.txt")
            .with_metadata("chunk_index", 3);
        assert_eq!(doc.source(), Some("faq.txt"));
        assert_eq!(doc.metadata["chunk_index"], 3);
        assert_eq!(Document::new("y").source(), None);
    }
}
