//! One query string in, one fused candidate list out.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use siteqa_core::config::Settings;
use siteqa_core::traits::{Embedder, TextSearcher, VectorSearcher};
use siteqa_core::{Error, Result, ScoredChunk, Stage};

use crate::fusion::{weighted_rrf, FusionWeights};
use crate::stage::run_model_call;

#[derive(Debug, Clone, Copy)]
pub struct HybridParams {
    pub weights: FusionWeights,
    /// Hits requested from each index.
    pub k: usize,
    pub rrf_c: f32,
    pub embed_timeout: Duration,
}

impl Default for HybridParams {
    fn default() -> Self { Self { weights: FusionWeights::default(), k: 5, rrf_c: 60.0, embed_timeout: Duration::from_secs(30) } }
}

impl HybridParams {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let r = &settings.retrieval;
        Ok(Self {
            weights: FusionWeights::new(r.lexical_weight, r.vector_weight)?,
            k: r.search_k,
            rrf_c: r.rrf_c,
            embed_timeout: settings.timeouts.embed(),
        })
    }
}

pub struct HybridRetriever {
    text: Arc<dyn TextSearcher>,
    vector: Arc<dyn VectorSearcher>,
    query_encoder: Arc<dyn Embedder>,
    params: HybridParams,
}

impl HybridRetriever {
    /// `query_encoder` must already carry the query-side prefix convention.
    pub fn new(text: Arc<dyn TextSearcher>, vector: Arc<dyn VectorSearcher>, query_encoder: Arc<dyn Embedder>, params: HybridParams) -> Self {
        Self { text, vector, query_encoder, params }
    }

    /// Lexical and vector search run concurrently; a failure of either
    /// fails the whole call. An index with zero weight is not queried.
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let (lexical, vector) = tokio::try_join!(self.lexical(query), self.semantic(query))?;
        let fused = weighted_rrf(&lexical, &vector, self.params.weights, self.params.rrf_c);
        debug!(query, lexical = lexical.len(), vector = vector.len(), fused = fused.len(), "hybrid search");
        Ok(fused)
    }

    async fn lexical(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        if self.params.weights.lexical <= 0.0 { return Ok(vec![]); }
        let text = Arc::clone(&self.text);
        let (q, k) = (query.to_string(), self.params.k);
        tokio::task::spawn_blocking(move || text.search(&q, k))
            .await
            .map_err(|e| Error::Operation(format!("{} task failed: {e}", Stage::LexicalSearch)))?
    }

    async fn semantic(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        if self.params.weights.vector <= 0.0 { return Ok(vec![]); }
        let query_vec = self.embed_query(query).await?;
        self.vector.search_vec(&query_vec, self.params.k).await
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let encoder = Arc::clone(&self.query_encoder);
        let input = vec![query.to_string()];
        let mut vectors = run_model_call(Stage::Embedding, self.params.embed_timeout, move || encoder.embed_batch(&input)).await?;
        if vectors.len() != 1 {
            return Err(Error::model(Stage::Embedding, format!("expected 1 query vector, got {}", vectors.len())));
        }
        Ok(vectors.remove(0))
    }
}
