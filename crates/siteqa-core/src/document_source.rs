use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::chunking::{Chunker, SourceDocument};
use crate::error::{Error, Result};
use crate::types::Chunk;

const SOURCE_MARKER: &str = "<!-- source:";

/// Reads crawled pages from a directory and hands them to a chunker.
pub struct DocumentSource<'a> {
    chunker: &'a dyn Chunker,
}

impl<'a> DocumentSource<'a> {
    pub fn new(chunker: &'a dyn Chunker) -> Self { Self { chunker } }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Chunk>> { self.process_directory_limited(data_dir, usize::MAX) }

    /// Chunks at most `limit` files, taken in path order.
    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Chunk>> {
        if !data_dir.is_dir() {
            return Err(Error::NotFound(format!("data directory {}", data_dir.display())));
        }
        let mut files = self.list_files(data_dir);
        if files.is_empty() {
            info!(dir = %data_dir.display(), chunker = self.chunker.name(), "no matching documents found");
            return Ok(vec![]);
        }
        if files.len() > limit {
            files.truncate(limit);
            info!(limit, "limited to first files");
        }
        let mut all_chunks = Vec::new();
        for (i, path) in files.iter().enumerate() {
            let doc = self.read_document(path, data_dir)?;
            let chunks = self.chunker.chunk(&doc);
            debug!(file = %path.display(), n = i + 1, total = files.len(), chunks = chunks.len(), "chunked");
            all_chunks.extend(chunks);
        }
        info!(files = files.len(), chunks = all_chunks.len(), "processed documents");
        Ok(all_chunks)
    }

    fn read_document(&self, path: &Path, data_dir: &Path) -> Result<SourceDocument> {
        let bytes = fs::read(path).map_err(|e| Error::Operation(format!("read {}: {e}", path.display())))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let relative = path.strip_prefix(data_dir).unwrap_or(path).to_string_lossy().replace('\\', "/");
        match split_source_marker(&content) {
            Some((url, rest)) => Ok(SourceDocument { source: url.to_string(), content: rest.to_string() }),
            None => Ok(SourceDocument { source: relative, content }),
        }
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let exts = self.chunker.extensions();
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()).map(|s| exts.contains(&s.to_ascii_lowercase().as_str())).unwrap_or(false))
            .collect();
        files.sort();
        files
    }
}

/// Splits a leading `<!-- source: URL -->` line written by the crawler.
pub fn split_source_marker(content: &str) -> Option<(&str, &str)> {
    let trimmed = content.trim_start_matches('\u{feff}');
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    let url = first.trim().strip_prefix(SOURCE_MARKER)?.strip_suffix("-->")?.trim();
    if url.is_empty() { None } else { Some((url, rest)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_parsed_from_first_line() {
        let (url, rest) = split_source_marker("<!-- source: https://fpmi.example/about -->\n# About\n").unwrap();
        assert_eq!(url, "https://fpmi.example/about");
        assert_eq!(rest, "# About\n");
    }

    #[test]
    fn no_marker_or_empty_url() {
        assert!(split_source_marker("# About\n").is_none());
        assert!(split_source_marker("<!-- source: -->\nx").is_none());
    }
}
