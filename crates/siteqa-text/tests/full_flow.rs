use tempfile::TempDir;

use siteqa_core::traits::TextSearcher;
use siteqa_core::{Chunk, ChunkStore, Error};
use siteqa_text::{TantivyIndexer, TantivySearchEngine};

fn faculty_store() -> ChunkStore {
    ChunkStore::from_chunks(vec![
        Chunk::new("https://fpmi.example/deans", "Dean is Ivanov", "Faculty > Deans", "FAMCS"),
        Chunk::new("https://fpmi.example/history", "Founded 1970", "Faculty > History", "FAMCS"),
        Chunk::new("https://fpmi.example/admissions", "Admissions open", "Admissions", "FAMCS"),
    ])
}

fn build(store: &ChunkStore) -> (TempDir, TantivySearchEngine) {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("lexical");
    let indexer = TantivyIndexer::create(&dir).expect("indexer");
    assert_eq!(indexer.index(store).expect("index"), store.len());
    let engine = TantivySearchEngine::open(&dir).expect("engine");
    (tmp, engine)
}

#[test]
fn term_overlap_ranks_founded_first() {
    let store = faculty_store();
    let (_tmp, engine) = build(&store);
    assert_eq!(engine.num_docs(), 3);

    let hits = engine.search("who founded the faculty", 5).expect("search");
    assert!(!hits.is_empty());
    assert_eq!(hits[0].chunk.text, "Founded 1970");
    assert_eq!(hits[0].chunk.section_path, "Faculty > History");
    assert_eq!(hits[0].chunk.id, store.chunks()[1].id);
    assert_eq!(hits[0].chunk.ordinal, 1);
}

#[test]
fn stored_ids_match_the_chunk_store() {
    let store = faculty_store();
    let (_tmp, engine) = build(&store);
    let mut ids = engine.chunk_ids().expect("ids");
    ids.sort();
    let mut expected = store.ids();
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn scores_descend_and_respect_k() {
    let store = ChunkStore::from_chunks(vec![
        Chunk::new("a", "admissions admissions admissions open", "", ""),
        Chunk::new("b", "admissions office hours", "", ""),
        Chunk::new("c", "admissions", "", ""),
    ]);
    let (_tmp, engine) = build(&store);
    let hits = engine.search("admissions", 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn equal_scores_keep_corpus_order() {
    let store = ChunkStore::from_chunks(vec![
        Chunk::new("z-last-alphabetically", "library hours", "", ""),
        Chunk::new("a-first-alphabetically", "library hours", "", ""),
        Chunk::new("m", "library hours", "", ""),
    ]);
    let (_tmp, engine) = build(&store);
    let hits = engine.search("library", 3).unwrap();
    let ords: Vec<usize> = hits.iter().map(|h| h.chunk.ordinal).collect();
    assert_eq!(ords, vec![0, 1, 2]);

    let top = engine.search("library", 1).unwrap();
    assert_eq!(top[0].chunk.source, "z-last-alphabetically");
}

#[test]
fn stopwords_and_syntax_do_not_fail() {
    let (_tmp, engine) = build(&faculty_store());
    assert!(engine.search("who is the", 5).unwrap().is_empty());
    assert!(engine.search("   ", 5).unwrap().is_empty());
    assert!(engine.search("\"founded: (1970", 5).is_ok());
    let hits = engine.search("founded, in 1970?", 5).unwrap();
    assert_eq!(hits[0].chunk.text, "Founded 1970");
}

#[test]
fn missing_index_is_unavailable_not_empty() {
    let tmp = TempDir::new().unwrap();
    let err = TantivySearchEngine::open(&tmp.path().join("lexical")).err().expect("must fail");
    assert!(matches!(err, Error::IndexUnavailable { .. }), "got {err:?}");
}

#[test]
fn empty_store_builds_empty_index() {
    let (_tmp, engine) = build(&ChunkStore::default());
    assert_eq!(engine.num_docs(), 0);
    assert!(engine.chunk_ids().unwrap().is_empty());
    assert!(engine.search("anything", 5).unwrap().is_empty());
}
