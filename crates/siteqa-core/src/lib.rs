//! siteqa-core
//!
//! Shared data model for the retrieval pipeline: chunks and their identity,
//! the error taxonomy, typed configuration, collaborator traits, and the
//! chunking strategies that turn crawled pages into chunks.

pub mod chunking;
pub mod config;
pub mod document_source;
pub mod error;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{Error, Result, Stage};
pub use store::ChunkStore;
pub use types::{compute_id, Chunk, ChunkId, RetrievedPassage, ScoredChunk, SourceKind};
