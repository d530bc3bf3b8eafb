//! Chunking strategies: turn one crawled document into addressable chunks.
//!
//! The strategy is picked once from [`ChunkingSettings::strategy`] and used
//! for the whole indexing run.

mod html;
mod markdown;
mod plain;

pub use html::HtmlChunker;
pub use markdown::MarkdownChunker;
pub use plain::PlainTextChunker;

use crate::config::{ChunkingSettings, ChunkingStrategy};
use crate::types::Chunk;

/// A raw document as read from the data directory.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// URL when the crawler recorded one, else the path relative to the data dir.
    pub source: String,
    pub content: String,
}

pub trait Chunker: Send + Sync {
    fn name(&self) -> &'static str;
    /// File extensions (lowercase, no dot) this strategy reads.
    fn extensions(&self) -> &'static [&'static str];
    fn chunk(&self, doc: &SourceDocument) -> Vec<Chunk>;
}

pub fn chunker_for(settings: &ChunkingSettings) -> anyhow::Result<Box<dyn Chunker>> {
    Ok(match settings.strategy {
        ChunkingStrategy::Markdown => Box::new(MarkdownChunker::new()),
        ChunkingStrategy::Html => Box::new(HtmlChunker::new(settings.min_chunk_chars)?),
        ChunkingStrategy::PlainText => Box::new(PlainTextChunker::new(settings.max_words, settings.overlap_percent)),
    })
}

/// Collapses runs of whitespace into single spaces and trims.
pub(crate) fn normalize_ws(s: &str) -> String { s.split_whitespace().collect::<Vec<_>>().join(" ") }

pub(crate) fn join_section_path<S: AsRef<str>>(headings: &[S]) -> String {
    headings.iter().map(|h| h.as_ref()).filter(|h| !h.is_empty()).collect::<Vec<_>>().join(" > ")
}
