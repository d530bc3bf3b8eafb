//! In-memory chunk corpus for one snapshot.
//!
//! The store is the single source of truth for identity: both indexes are
//! built from the same `ChunkStore`, and each chunk's `ordinal` is its
//! position here.

use std::collections::HashMap;

use tracing::warn;

use crate::types::{Chunk, ChunkId};

#[derive(Debug, Clone, Default)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
    by_id: HashMap<ChunkId, usize>,
}

impl ChunkStore {
    /// Collects chunks in order, assigning ordinals.
    ///
    /// Exact duplicates (same source and text, hence same id) collapse into
    /// the first occurrence. A different chunk that collides on the id is
    /// dropped and logged.
    pub fn from_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        let mut store = Self::default();
        for mut chunk in chunks {
            if let Some(&existing) = store.by_id.get(&chunk.id) {
                let first = &store.chunks[existing];
                if first.text == chunk.text && first.source == chunk.source {
                    warn!(id = %chunk.id, source = %chunk.source, "duplicate chunk collapsed");
                } else {
                    warn!(id = %chunk.id, first = %first.source, dropped = %chunk.source, "chunk id collision between distinct content; later chunk dropped");
                }
                continue;
            }
            chunk.ordinal = store.chunks.len();
            store.by_id.insert(chunk.id.clone(), chunk.ordinal);
            store.chunks.push(chunk);
        }
        store
    }

    pub fn get(&self, id: &str) -> Option<&Chunk> { self.by_id.get(id).map(|&i| &self.chunks[i]) }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn chunks(&self) -> &[Chunk] { &self.chunks }

    pub fn ids(&self) -> Vec<ChunkId> { self.chunks.iter().map(|c| c.id.clone()).collect() }
}
