#[cfg(test)]
mod tests;

pub mod rerank;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embeddings::{Embedder, Passage, VectorIndex};
use crate::{DiligenceError, Result};

pub use rerank::{CrossEncoderReranker, NoOpReranker, PairScorer, Reranker, TermOverlapScorer};

pub const DEFAULT_TOP_K: usize = 5;

/// A retrieved passage with its similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    /// 1-based position in the result list
    pub rank: usize,
    /// Inner product with the query, three decimals; may be negative
    pub score: f64,
    /// `score * 100`, one decimal
    pub confidence_pct: f64,
    #[serde(flatten)]
    pub passage: Passage,
    /// Set by a reranker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

/// Embed `query` and return the `top_k` nearest passages, best first.
///
/// `passages` must be sorted by `chunk_id`, as the workspace keeps them.
/// Index hits without a matching passage are skipped, never padded.
pub async fn search(
    embedder: &dyn Embedder,
    query: &str,
    index: &VectorIndex,
    passages: &[Passage],
    top_k: usize,
) -> Result<Vec<ScoredPassage>> {
    if top_k == 0 {
        return Err(DiligenceError::Config("top_k must be positive".to_string()));
    }

    let query_vector = embedder
        .embed(&[query.to_string()])
        .await
        .map_err(|e| DiligenceError::Embedding(format!("{e:#}")))?
        .into_iter()
        .next()
        .ok_or_else(|| DiligenceError::Embedding("No embedding returned for query".to_string()))?;

    let neighbors = index.search(&query_vector, top_k)?;

    let mut results = Vec::with_capacity(neighbors.len());
    for neighbor in neighbors {
        let Ok(found) = passages.binary_search_by_key(&neighbor.chunk_id, |p| p.chunk_id) else {
            warn!(
                "Index position {} refers to missing chunk {}",
                neighbor.position, neighbor.chunk_id
            );
            continue;
        };

        let score = round_to(f64::from(neighbor.score), 3);
        results.push(ScoredPassage {
            rank: results.len() + 1,
            score,
            confidence_pct: round_to(score * 100.0, 1),
            passage: passages[found].clone(),
            rerank_score: None,
        });
    }

    debug!(
        "Search for '{}' returned {} of {} requested results",
        query,
        results.len(),
        top_k
    );
    Ok(results)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
