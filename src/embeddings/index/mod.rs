
use tracing::{debug, info, warn};

use super::{Embedder, Passage, normalize};
use crate::{DiligenceError, Result};

/// Flat inner-product index over L2-normalised passage vectors.
///
/// Position `i` holds the vector for `chunk_ids[i]`. Passages that were
/// filtered out during the build have no position, so positions are not
/// chunk ids.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<f32>,
    chunk_ids: Vec<u64>,
}

/// One search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub chunk_id: u64,
    /// Inner product with the query, in `[-1, 1]`
    pub score: f32,
}

impl VectorIndex {
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunk_ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunk_ids.is_empty()
    }

    /// Chunk id of the passage stored at `position`
    #[inline]
    pub fn chunk_id_at(&self, position: usize) -> Option<u64> {
        self.chunk_ids.get(position).copied()
    }

    /// Chunk ids in index order
    #[inline]
    pub fn chunk_ids(&self) -> &[u64] {
        &self.chunk_ids
    }

    /// The `k` nearest vectors to `query` by inner product, best first.
    ///
    /// The query is normalised here. Fewer than `k` hits are returned when the
    /// index holds fewer vectors.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(DiligenceError::Index(format!(
                "Query has {} dimensions, index has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut query = query.to_vec();
        if !normalize(&mut query) {
            return Err(DiligenceError::Embedding(
                "Query embedding cannot be normalised".to_string(),
            ));
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .chunks_exact(self.dimension)
            .zip(&self.chunk_ids)
            .enumerate()
            .map(|(position, (vector, &chunk_id))| Neighbor {
                position,
                chunk_id,
                score: vector.iter().zip(&query).map(|(a, b)| a * b).sum(),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.position.cmp(&b.position))
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }
}

/// Embed every passage and build a fresh index over the survivors.
///
/// Blank passages and vectors that cannot be normalised are skipped. Fails
/// when the embedder fails, returns vectors of the wrong width, or when no
/// passage survives.
pub async fn build_index(embedder: &dyn Embedder, passages: &[Passage]) -> Result<VectorIndex> {
    let candidates: Vec<&Passage> = passages
        .iter()
        .filter(|p| !p.text.trim().is_empty())
        .collect();

    if candidates.is_empty() {
        return Err(DiligenceError::Index(
            "No passages with text to index".to_string(),
        ));
    }

    let texts: Vec<String> = candidates.iter().map(|p| p.text.clone()).collect();
    let embeddings = embedder
        .embed(&texts)
        .await
        .map_err(|e| DiligenceError::Embedding(format!("{e:#}")))?;

    if embeddings.len() != candidates.len() {
        return Err(DiligenceError::Embedding(format!(
            "Expected {} embeddings, got {}",
            candidates.len(),
            embeddings.len()
        )));
    }

    let dimension = embedder.dimensions();
    let mut vectors = Vec::with_capacity(candidates.len() * dimension);
    let mut chunk_ids = Vec::with_capacity(candidates.len());

    for (passage, mut embedding) in candidates.into_iter().zip(embeddings) {
        if embedding.len() != dimension {
            return Err(DiligenceError::Embedding(format!(
                "Embedding for chunk {} has {} dimensions, expected {}",
                passage.chunk_id,
                embedding.len(),
                dimension
            )));
        }
        if !normalize(&mut embedding) {
            debug!("Skipping chunk {}: degenerate embedding", passage.chunk_id);
            continue;
        }
        vectors.extend_from_slice(&embedding);
        chunk_ids.push(passage.chunk_id);
    }

    let skipped = passages.len() - chunk_ids.len();
    if skipped > 0 {
        warn!("{} of {} passages were not indexed", skipped, passages.len());
    }

    if chunk_ids.is_empty() {
        return Err(DiligenceError::Index(
            "No passage produced a usable embedding".to_string(),
        ));
    }

    info!(
        "Built vector index with {} vectors of dimension {}",
        chunk_ids.len(),
        dimension
    );

    Ok(VectorIndex {
        dimension,
        vectors,
        chunk_ids,
    })
}
