//! Embedding retriever: cosine similarity over provider embeddings.
//!
//! Documents are embedded once at index time; each query costs one
//! embedding call.

use std::sync::Arc;

use async_trait::async_trait;
use ragchat_core::document::{Document, Retriever};
use ragchat_core::error::RetrievalError;
use ragchat_core::provider::{EmbeddingRequest, Provider};
use tracing::{debug, info};

use crate::vector::rank_by_similarity;

/// Inputs per embedding request when indexing.
const EMBED_BATCH: usize = 64;

pub struct EmbeddingRetriever {
    provider: Arc<dyn Provider>,
    model: String,
    top_k: usize,
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingRetriever {
    /// Embed every document and build the index.
    pub async fn index(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        documents: Vec<Document>,
        top_k: usize,
    ) -> Result<Self, RetrievalError> {
        let model = model.into();
        let mut vectors = Vec::with_capacity(documents.len());

        for batch in documents.chunks(EMBED_BATCH) {
            let inputs = batch.iter().map(|d| d.page_content.clone()).collect();
            let mut embedded = embed(provider.as_ref(), &model, inputs).await?;
            if embedded.len() != batch.len() {
                return Err(RetrievalError::EmbeddingFailed(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            vectors.append(&mut embedded);
        }

        info!(documents = documents.len(), model = %model, "Embedding index built");

        Ok(Self {
            provider,
            model,
            top_k: top_k.max(1),
            documents,
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl Retriever for EmbeddingRetriever {
    fn name(&self) -> &str {
        "embedding"
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        if self.documents.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = embed(self.provider.as_ref(), &self.model, vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::EmbeddingFailed("no embedding for query".into()))?;

        let ranked = rank_by_similarity(&self.vectors, &query_vec, self.top_k);
        debug!(hits = ranked.len(), "Embedding retrieval");

        Ok(ranked
            .into_iter()
            .map(|(i, score)| self.documents[i].clone().with_metadata("score", score as f64))
            .collect())
    }
}

async fn embed(
    provider: &dyn Provider,
    model: &str,
    inputs: Vec<String>,
) -> Result<Vec<Vec<f32>>, RetrievalError> {
    provider
        .embed(EmbeddingRequest {
            model: model.to_string(),
            inputs,
        })
        .await
        .map(|r| r.embeddings)
        .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))
}
