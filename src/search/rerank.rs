use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

use super::ScoredPassage;

/// Re-scores and reorders search results for a query
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, results: Vec<ScoredPassage>) -> Result<Vec<ScoredPassage>>;
}

/// Returns results unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(&self, _query: &str, results: Vec<ScoredPassage>) -> Result<Vec<ScoredPassage>> {
        Ok(results)
    }
}

/// Scores `(query, passage)` pairs jointly
pub trait PairScorer: Send + Sync {
    /// One score per passage, higher is more relevant
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>>;
}

/// Reranks with a [`PairScorer`], keeping the best `top_k`.
///
/// Ties keep their retrieval order. Ranks are renumbered, similarity scores
/// are left as retrieved.
#[derive(Debug, Clone)]
pub struct CrossEncoderReranker<S> {
    scorer: S,
    top_k: usize,
}

impl<S: PairScorer> CrossEncoderReranker<S> {
    #[inline]
    pub fn new(scorer: S, top_k: usize) -> Self {
        Self { scorer, top_k }
    }
}

#[async_trait]
impl<S: PairScorer> Reranker for CrossEncoderReranker<S> {
    async fn rerank(
        &self,
        query: &str,
        mut results: Vec<ScoredPassage>,
    ) -> Result<Vec<ScoredPassage>> {
        let texts: Vec<&str> = results.iter().map(|r| r.passage.text.as_str()).collect();
        let scores = self.scorer.score(query, &texts)?;

        if scores.len() != results.len() {
            bail!(
                "Scorer returned {} scores for {} passages",
                scores.len(),
                results.len()
            );
        }

        for (result, score) in results.iter_mut().zip(scores) {
            result.rerank_score = Some(score);
        }

        results.sort_by(|a, b| {
            let a = a.rerank_score.unwrap_or(f32::NEG_INFINITY);
            let b = b.rerank_score.unwrap_or(f32::NEG_INFINITY);
            b.total_cmp(&a)
        });
        results.truncate(self.top_k);

        for (i, result) in results.iter_mut().enumerate() {
            result.rank = i + 1;
        }

        debug!("Reranked to {} results", results.len());
        Ok(results)
    }
}

/// Fraction of distinct query terms that occur in the passage
#[derive(Debug, Clone, Copy, Default)]
pub struct TermOverlapScorer;

fn terms(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl PairScorer for TermOverlapScorer {
    #[inline]
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }

        Ok(passages
            .iter()
            .map(|passage| {
                let passage_terms = terms(passage);
                let shared = query_terms.intersection(&passage_terms).count();
                shared as f32 / query_terms.len() as f32
            })
            .collect())
    }
}
