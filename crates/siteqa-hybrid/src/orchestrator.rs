//! The retrieval entry point: expand, fan out, deduplicate, re-rank.

use std::collections::HashSet;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use siteqa_core::{Result, RetrievedPassage, ScoredChunk};

use crate::expand::{fan_out_queries, QueryExpander};
use crate::rerank::Reranker;
use crate::retriever::HybridRetriever;

pub struct Retriever {
    hybrid: HybridRetriever,
    reranker: Reranker,
    expander: Option<QueryExpander>,
    top_n: usize,
    concurrency: usize,
}

impl Retriever {
    pub fn new(hybrid: HybridRetriever, reranker: Reranker, top_n: usize) -> Self {
        Self { hybrid, reranker, expander: None, top_n, concurrency: 4 }
    }

    pub fn with_expander(mut self, expander: QueryExpander) -> Self {
        self.expander = Some(expander);
        self
    }

    /// Fan-out queries in flight at once.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Ranked passages for `query`, best first, at most `top_n`.
    ///
    /// `Ok(vec![])` means nothing matched. Index and re-rank failures are
    /// errors; expansion failures are not.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedPassage>> {
        let query = query.trim();
        if query.is_empty() { return Ok(vec![]); }

        let expansions = match &self.expander {
            Some(expander) => expander.expand(query).await,
            None => vec![],
        };
        let queries = fan_out_queries(query, &expansions);
        let candidates = self.gather(&queries).await?;
        let ranked = self.reranker.rerank(query, candidates, self.top_n).await?;
        info!(query, fan_out = queries.len(), returned = ranked.len(), "retrieve");
        Ok(ranked.into_iter().map(RetrievedPassage::from).collect())
    }

    /// Runs the hybrid retriever for every query and merges the results.
    /// Results are consumed in query order whatever order the searches
    /// finish in, so the original query's hits always come first.
    pub async fn gather(&self, queries: &[String]) -> Result<Vec<ScoredChunk>> {
        let per_query: Vec<Vec<ScoredChunk>> = stream::iter(queries)
            .map(|q| self.hybrid.search(q))
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        let total: usize = per_query.iter().map(Vec::len).sum();
        let unique = dedupe_first_seen(per_query.into_iter().flatten());
        debug!(queries = queries.len(), total, unique = unique.len(), "fan-out gathered");
        Ok(unique)
    }
}

/// Keeps the first occurrence of each chunk id.
pub fn dedupe_first_seen(candidates: impl IntoIterator<Item = ScoredChunk>) -> Vec<ScoredChunk> {
    let mut seen = HashSet::new();
    candidates.into_iter().filter(|c| seen.insert(c.chunk.id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteqa_core::{Chunk, SourceKind};

    #[test]
    fn first_occurrence_wins() {
        let a = Chunk::new("s", "a", "", "");
        let b = Chunk::new("s", "b", "", "");
        let out = dedupe_first_seen(vec![
            ScoredChunk::new(a.clone(), 0.9, SourceKind::Fused),
            ScoredChunk::new(b, 0.5, SourceKind::Fused),
            ScoredChunk::new(a, 0.1, SourceKind::Fused),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chunk.text, "a");
        assert_eq!(out[0].score, 0.9);
    }
}
