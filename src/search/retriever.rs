use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::llm::embeddings::{embed_single, Embedder};
use crate::models::RetrievedCandidate;
use crate::search::vector::{VectorHit, VectorSearch};

/// Embeds a query and returns the standards close enough to matter.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorSearch>,
    top_k: usize,
    score_threshold: f32,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorSearch>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k: config.top_k,
            score_threshold: config.score_threshold,
        }
    }

    /// Retrieve with the configured `top_k` and threshold.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedCandidate>> {
        self.retrieve_with(query, self.top_k, self.score_threshold)
            .await
    }

    /// Nearest `top_k` chunks with `distance <= score_threshold`, nearest
    /// first. An empty result means nothing relevant was found.
    pub async fn retrieve_with(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedCandidate>> {
        let query_vector = embed_single(self.embedder.as_ref(), query)
            .await
            .context("Failed to embed retrieval query")?;

        let index = self.index.clone();
        let hits = tokio::task::spawn_blocking(move || index.search(&query_vector, top_k))
            .await
            .context("Vector search task failed")??;

        let candidates = apply_threshold(hits, score_threshold);
        tracing::debug!(
            "Retrieved {} candidates (top_k={top_k}, threshold={score_threshold})",
            candidates.len()
        );
        Ok(candidates)
    }
}

/// Drop hits farther than `score_threshold`, preserving order.
pub fn apply_threshold(hits: Vec<VectorHit>, score_threshold: f32) -> Vec<RetrievedCandidate> {
    hits.into_iter()
        .filter(|h| h.distance <= score_threshold)
        .map(|h| RetrievedCandidate {
            chunk_text: h.entry.chunk.text,
            distance: h.distance,
            source_metadata: h.entry.chunk.source_metadata,
        })
        .collect()
}
