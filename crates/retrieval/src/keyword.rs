//! Keyword retriever: in-memory term-overlap ranking.
//!
//! Scores each document with a saturated term frequency weighted by inverse
//! document frequency, summed over the distinct query terms. No network
//! calls, so it works without an embedding model.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ragchat_core::document::{Document, Retriever};
use ragchat_core::error::RetrievalError;
use tracing::debug;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "i", "in", "is", "it", "me", "my", "of", "on", "or", "the", "to", "was", "what", "when",
    "where", "which", "who", "why", "with", "you", "your",
];

/// Ranks documents by query-term overlap.
pub struct KeywordRetriever {
    documents: Vec<Document>,
    /// Per-document term counts, aligned with `documents`.
    term_counts: Vec<HashMap<String, usize>>,
    /// Number of documents containing each term.
    doc_freq: HashMap<String, usize>,
    top_k: usize,
}

impl KeywordRetriever {
    pub fn new(documents: Vec<Document>, top_k: usize) -> Self {
        let term_counts: Vec<HashMap<String, usize>> = documents
            .iter()
            .map(|d| {
                let mut counts = HashMap::new();
                for term in tokenize(&d.page_content) {
                    *counts.entry(term).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut doc_freq = HashMap::new();
        for counts in &term_counts {
            for term in counts.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }

        Self {
            documents,
            term_counts,
            doc_freq,
            top_k: top_k.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn score(&self, index: usize, query_terms: &HashSet<String>) -> f32 {
        let n = self.documents.len() as f32;
        let counts = &self.term_counts[index];
        query_terms
            .iter()
            .filter_map(|term| {
                let tf = *counts.get(term)? as f32;
                let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
                let idf = (1.0 + n / df.max(1.0)).ln();
                Some(tf / (tf + 1.2) * idf)
            })
            .sum()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        let query_terms: HashSet<String> = tokenize(query).collect();

        let mut scored: Vec<(usize, f32)> = (0..self.documents.len())
            .map(|i| (i, self.score(i, &query_terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_k);

        debug!(query_terms = query_terms.len(), hits = scored.len(), "Keyword retrieval");

        Ok(scored
            .into_iter()
            .map(|(i, score)| self.documents[i].clone().with_metadata("score", score as f64))
            .collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}
