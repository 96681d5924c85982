//! Knowledge base loading.
//!
//! A knowledge base is a plain-text file split into chunk documents.
//! Each document records its `source` and `chunk_index`.

use std::path::Path;

use ragchat_core::document::Document;
use ragchat_core::error::RetrievalError;
use tracing::info;

use crate::splitter::TextSplitter;

/// The chunked documents a retriever searches.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    documents: Vec<Document>,
}

impl KnowledgeBase {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Split `text` into documents tagged with `source`.
    pub fn from_text(source: &str, text: &str, splitter: &TextSplitter) -> Self {
        let documents = splitter
            .split_text(text)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                Document::new(chunk)
                    .with_metadata("source", source)
                    .with_metadata("chunk_index", i)
            })
            .collect();
        Self { documents }
    }

    /// Read and split a text file. A file that yields no chunks is an error.
    pub async fn load(path: &Path, splitter: &TextSplitter) -> Result<Self, RetrievalError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RetrievalError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let kb = Self::from_text(&path.display().to_string(), &text, splitter);
        if kb.is_empty() {
            return Err(RetrievalError::EmptyKnowledgeBase);
        }

        info!(
            path = %path.display(),
            chunks = kb.len(),
            chunk_size = splitter.chunk_size(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
