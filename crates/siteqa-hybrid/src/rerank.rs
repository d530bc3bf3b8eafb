use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use siteqa_core::traits::CrossEncoder;
use siteqa_core::{Error, Result, ScoredChunk, SourceKind, Stage};

use crate::stage::run_model_call;

/// Cross-encoder re-ranking of a candidate set against one query.
pub struct Reranker {
    encoder: Arc<dyn CrossEncoder>,
    timeout: Duration,
}

impl Reranker {
    pub fn new(encoder: Arc<dyn CrossEncoder>, timeout: Duration) -> Self { Self { encoder, timeout } }

    /// Scores every candidate against `query` and keeps the best `top_n`.
    pub async fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>, top_n: usize) -> Result<Vec<ScoredChunk>> {
        if candidates.is_empty() || top_n == 0 { return Ok(vec![]); }
        let encoder = Arc::clone(&self.encoder);
        let q = query.to_string();
        let passages: Vec<String> = candidates.iter().map(|c| c.chunk.text.clone()).collect();
        let scores = run_model_call(Stage::Rerank, self.timeout, move || encoder.score_batch(&q, &passages)).await?;
        if scores.len() != candidates.len() {
            return Err(Error::model(Stage::Rerank, format!("expected {} scores, got {}", candidates.len(), scores.len())));
        }
        let ranked = order_by_scores(candidates, scores, top_n);
        debug!(query, kept = ranked.len(), "reranked");
        Ok(ranked)
    }
}

/// Sorts candidates by `scores` descending, keeping input order among equal
/// scores, and truncates to `top_n`. NaN sorts last.
pub fn order_by_scores(candidates: Vec<ScoredChunk>, scores: Vec<f32>, top_n: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = candidates
        .into_iter()
        .zip(scores)
        .map(|(c, s)| ScoredChunk::new(c.chunk, if s.is_nan() { f32::NEG_INFINITY } else { s }, SourceKind::Reranked))
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_n);
    scored
}
