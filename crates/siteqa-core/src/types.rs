//! Domain types shared by the lexical index, the vector store and the
//! retrieval pipeline.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// An immutable, addressable passage of crawled text.
///
/// - `id`: content-derived identity, see [`compute_id`]
/// - `text`: the passage handed to scoring and generation
/// - `source`: origin locator (URL or document path)
/// - `section_path`: heading hierarchy, e.g. "Faculty > History"
/// - `title`: page title of the source document
/// - `ordinal`: position in the corpus snapshot; stable tie-break for every index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
    pub section_path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ordinal: usize,
}

impl Chunk {
    /// Builds a chunk and assigns its identity. The ordinal is set when the
    /// chunk enters a [`crate::ChunkStore`].
    pub fn new(
        source: impl Into<String>,
        text: impl Into<String>,
        section_path: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let text = text.into();
        let id = compute_id(&source, &text);
        Self { id, text, source, section_path: section_path.into(), title: title.into(), ordinal: 0 }
    }
}

/// Deterministic chunk identity: BLAKE3 over `source`, a unit separator, and `text`.
///
/// Two distinct chunks colliding here would shadow each other during
/// deduplication. At 256 bits this is not a practical concern.
pub fn compute_id(source: &str, text: &str) -> ChunkId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source.as_bytes());
    hasher.update(&[0x1f]);
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Indicates which stage produced a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Vector,
    Fused,
    Reranked,
}

/// A transient `(chunk, score)` pair. Scores are only comparable within
/// the stage named by `kind`; higher is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub kind: SourceKind,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, score: f32, kind: SourceKind) -> Self { Self { chunk, score, kind } }
}

/// What `retrieve` hands to callers and to the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
    pub section_path: String,
    pub score: f32,
}

impl From<ScoredChunk> for RetrievedPassage {
    fn from(s: ScoredChunk) -> Self {
        Self { id: s.chunk.id, text: s.chunk.text, source: s.chunk.source, section_path: s.chunk.section_path, score: s.score }
    }
}
