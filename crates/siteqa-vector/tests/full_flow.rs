use std::sync::Arc;

use tempfile::TempDir;

use siteqa_core::traits::{Embedder, VectorSearcher};
use siteqa_core::{Chunk, ChunkStore, Error};
use siteqa_vector::{LanceDbIndexer, LanceSearchEngine};

/// Maps a few known words onto fixed axes so similarity is predictable.
struct AxisEmbedder;

impl Embedder for AxisEmbedder {
    fn id(&self) -> &str { "axis" }
    fn dim(&self) -> usize { 4 }
    fn max_len(&self) -> usize { 512 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                let mut v = vec![0.05f32; 4];
                if t.contains("dean") { v[0] = 1.0; }
                if t.contains("found") { v[1] = 1.0; }
                if t.contains("admission") { v[2] = 1.0; }
                v
            })
            .collect())
    }
}

fn store() -> ChunkStore {
    ChunkStore::from_chunks(vec![
        Chunk::new("deans", "Dean is Ivanov", "Faculty > Deans", ""),
        Chunk::new("history", "Founded 1970", "Faculty > History", ""),
        Chunk::new("admissions", "Admissions open", "Admissions", ""),
    ])
}

async fn build(store: &ChunkStore) -> (TempDir, LanceSearchEngine) {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("vectors");
    let indexer = LanceDbIndexer::create(&path).await.expect("indexer");
    let n = indexer.index_store(store, Arc::new(AxisEmbedder), 2).await.expect("index");
    assert_eq!(n, store.len());
    let engine = LanceSearchEngine::open(&path).await.expect("engine");
    (tmp, engine)
}

#[tokio::test]
async fn nearest_chunk_ranks_first() {
    let store = store();
    let (_tmp, engine) = build(&store).await;
    assert_eq!(engine.count().await.unwrap(), 3);
    assert_eq!(engine.dim(), 4);

    let q = AxisEmbedder.embed_batch(&["who founded the faculty".to_string()]).unwrap().remove(0);
    let hits = engine.search_vec(&q, 2).await.expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.text, "Founded 1970");
    assert_eq!(hits[0].chunk.section_path, "Faculty > History");
    assert_eq!(hits[0].chunk.id, store.chunks()[1].id);
    assert!(hits[0].score >= hits[1].score);
}

#[tokio::test]
async fn stored_ids_match_the_chunk_store() {
    let store = store();
    let (_tmp, engine) = build(&store).await;
    let mut ids = engine.chunk_ids().await.expect("ids");
    ids.sort();
    let mut expected = store.ids();
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn equal_similarity_keeps_corpus_order() {
    let store = ChunkStore::from_chunks(vec![
        Chunk::new("c", "library hours", "", ""),
        Chunk::new("a", "canteen menu", "", ""),
        Chunk::new("b", "sports hall", "", ""),
    ]);
    let (_tmp, engine) = build(&store).await;
    let q = vec![0.05f32; 4];
    let hits = engine.search_vec(&q, 3).await.unwrap();
    let ords: Vec<usize> = hits.iter().map(|h| h.chunk.ordinal).collect();
    assert_eq!(ords, vec![0, 1, 2]);
}

#[tokio::test]
async fn wrong_query_dim_is_rejected() {
    let (_tmp, engine) = build(&store()).await;
    assert!(engine.search_vec(&[1.0, 0.0], 3).await.is_err());
}

#[tokio::test]
async fn empty_corpus_opens_and_returns_nothing() {
    let (_tmp, engine) = build(&ChunkStore::default()).await;
    assert_eq!(engine.count().await.unwrap(), 0);
    assert!(engine.search_vec(&[0.1, 0.2, 0.3, 0.4], 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_store_is_unavailable() {
    let tmp = TempDir::new().unwrap();
    let err = LanceSearchEngine::open(&tmp.path().join("vectors")).await.err().expect("must fail");
    assert!(matches!(err, Error::IndexUnavailable { .. }));

    std::fs::create_dir_all(tmp.path().join("empty")).unwrap();
    let err = LanceSearchEngine::open(&tmp.path().join("empty")).await.err().expect("must fail");
    assert!(matches!(err, Error::IndexUnavailable { .. }));
}
