use async_trait::async_trait;

use crate::error::Result;
use crate::types::ScoredChunk;

/// Text to fixed-length vector. Implementations return L2-normalized vectors
/// of `dim()` floats for every input.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model and its input convention.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Pairwise `(query, passage)` relevance; higher is more relevant.
pub trait CrossEncoder: Send + Sync {
    fn id(&self) -> &str;
    /// One score per passage, in input order.
    fn score_batch(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<f32>>;
}

/// Text in, text out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Keyword search over a built lexical index.
pub trait TextSearcher: Send + Sync {
    /// At most `k` hits, descending by score, ties in corpus order.
    fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;
}

/// Nearest-neighbour search over a built vector store.
#[async_trait]
pub trait VectorSearcher: Send + Sync {
    /// At most `k` hits, descending by similarity, ties in corpus order.
    async fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;
}
