//! Knowledge base and retrievers for ragchat.
//!
//! - [`splitter`]: recursive character text splitter
//! - [`knowledge`]: loads a text file into chunk documents
//! - [`keyword`]: in-memory term-overlap retriever
//! - [`embedding`]: cosine-similarity retriever over provider embeddings
//! - [`vector`]: similarity math

pub mod embedding;
pub mod keyword;
pub mod knowledge;
pub mod splitter;
pub mod vector;

use std::path::Path;
use std::sync::Arc;

use ragchat_config::{RetrievalConfig, RetrievalMode};
use ragchat_core::document::Retriever;
use ragchat_core::error::RetrievalError;
use ragchat_core::provider::Provider;
use tracing::warn;

pub use embedding::EmbeddingRetriever;
pub use keyword::KeywordRetriever;
pub use knowledge::KnowledgeBase;
pub use splitter::TextSplitter;

/// Build the configured retriever.
///
/// Without a `knowledge_path` the retriever is empty and every turn is
/// answered from an empty context.
pub async fn build_from_config(
    config: &RetrievalConfig,
    provider: Arc<dyn Provider>,
) -> Result<(Arc<dyn Retriever>, usize), RetrievalError> {
    let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap);

    let kb = match &config.knowledge_path {
        Some(path) => KnowledgeBase::load(Path::new(path), &splitter).await?,
        None => {
            warn!("No knowledge_path configured; answers will have no context");
            KnowledgeBase::default()
        }
    };
    let count = kb.len();

    let retriever: Arc<dyn Retriever> = match config.mode {
        RetrievalMode::Keyword => Arc::new(KeywordRetriever::new(kb.into_documents(), config.top_k)),
        RetrievalMode::Embedding => Arc::new(
            EmbeddingRetriever::index(
                provider,
                &config.embedding_model,
                kb.into_documents(),
                config.top_k,
            )
            .await?,
        ),
    };

    Ok((retriever, count))
}
