// Embeddings module
// Passage chunking, embedding providers and the in-memory vector index

pub mod chunking;
pub mod hashing;
pub mod index;
pub mod ollama;

use anyhow::Result;
use async_trait::async_trait;

pub use chunking::{Chunker, ChunkingConfig, Passage, chunk_pages};
pub use hashing::HashingEmbedder;
pub use index::{VectorIndex, build_index};
pub use ollama::{EmbeddingResult, OllamaClient};

/// A provider that turns texts into fixed-width vectors.
///
/// Implementations return one vector per input, in input order. Vectors are
/// not required to be normalised; the index normalises them.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Width of the vectors this provider produces
    fn dimensions(&self) -> usize;
}

/// L2-normalise in place. Returns `false` when the vector has a non-finite
/// component or zero length and cannot be normalised.
#[inline]
pub fn normalize(vector: &mut [f32]) -> bool {
    if vector.iter().any(|x| !x.is_finite()) {
        return false;
    }

    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }

    vector.iter_mut().for_each(|x| *x /= norm);
    true
}
