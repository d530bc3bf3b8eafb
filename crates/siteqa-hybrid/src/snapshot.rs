//! Versioned on-disk snapshots of both indexes.
//!
//! ```text
//! index_root/
//!   CURRENT                      name of the live snapshot
//!   snapshots/<version>/
//!     lexical/                   tantivy index
//!     vectors/                   LanceDB store
//!     chunks.jsonl               one chunk per line
//!     manifest.json
//! ```
//!
//! A snapshot is complete before `CURRENT` names it, and `CURRENT` is
//! replaced by rename, so readers see either the old pair of indexes or
//! the new one.

use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use siteqa_core::{Chunk, ChunkId, ChunkStore, Error, Result};
use siteqa_text::TantivySearchEngine;
use siteqa_vector::LanceSearchEngine;

pub const CURRENT_FILE: &str = "CURRENT";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const CHUNKS_FILE: &str = "chunks.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub chunk_count: usize,
    /// Document-side embedder id the vectors were built with.
    pub embedder: String,
    pub chunk_ids: Vec<ChunkId>,
}

/// Paths inside one snapshot directory.
#[derive(Debug, Clone)]
pub struct SnapshotDir(PathBuf);

impl SnapshotDir {
    pub fn path(&self) -> &Path { &self.0 }
    pub fn lexical(&self) -> PathBuf { self.0.join("lexical") }
    pub fn vectors(&self) -> PathBuf { self.0.join("vectors") }
    pub fn manifest(&self) -> PathBuf { self.0.join(MANIFEST_FILE) }
    pub fn chunks(&self) -> PathBuf { self.0.join(CHUNKS_FILE) }
}

pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn dir(&self, version: &str) -> SnapshotDir { SnapshotDir(self.root.join("snapshots").join(version)) }

    /// Allocates an unused version name and creates its directory.
    pub fn allocate(&self) -> Result<(String, SnapshotDir)> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let mut version = stamp.clone();
        let mut n = 1;
        while self.dir(&version).path().exists() {
            version = format!("{stamp}-{n}");
            n += 1;
        }
        let dir = self.dir(&version);
        fs::create_dir_all(dir.path()).map_err(anyhow::Error::from)?;
        Ok((version, dir))
    }

    pub fn current_version(&self) -> Result<String> {
        let pointer = self.root.join(CURRENT_FILE);
        let raw = fs::read_to_string(&pointer).map_err(|e| Error::index_unavailable(&pointer, format!("no published snapshot ({e}); run `siteqa index`")))?;
        let version = raw.trim();
        if version.is_empty() {
            return Err(Error::index_unavailable(&pointer, "snapshot pointer is empty"));
        }
        Ok(version.to_string())
    }

    /// Points `CURRENT` at `version`. The snapshot must already be complete.
    pub fn publish(&self, version: &str) -> Result<()> {
        let dir = self.dir(version);
        if !dir.manifest().is_file() {
            return Err(Error::index_unavailable(dir.path(), "refusing to publish a snapshot without a manifest"));
        }
        let mut tmp = NamedTempFile::new_in(&self.root).map_err(anyhow::Error::from)?;
        writeln!(tmp, "{version}").map_err(anyhow::Error::from)?;
        tmp.as_file().sync_all().map_err(anyhow::Error::from)?;
        tmp.persist(self.root.join(CURRENT_FILE)).map_err(|e| anyhow::Error::from(e.error))?;
        info!(version, root = %self.root.display(), "snapshot published");
        Ok(())
    }

    /// Opens the snapshot `CURRENT` names, checking both indexes against
    /// its manifest.
    pub async fn open_current(&self) -> Result<Snapshot> {
        let version = self.current_version()?;
        Snapshot::open(self.dir(&version)).await
    }
}

pub fn write_manifest(dir: &SnapshotDir, manifest: &Manifest) -> Result<()> {
    let json = serde_json::to_vec_pretty(manifest).map_err(anyhow::Error::from)?;
    fs::write(dir.manifest(), json).map_err(anyhow::Error::from)?;
    Ok(())
}

pub fn read_manifest(dir: &SnapshotDir) -> Result<Manifest> {
    let path = dir.manifest();
    let raw = fs::read(&path).map_err(|e| Error::index_unavailable(&path, e))?;
    serde_json::from_slice(&raw).map_err(|e| Error::index_unavailable(&path, format!("corrupt manifest: {e}")))
}

pub fn write_chunks(dir: &SnapshotDir, store: &ChunkStore) -> Result<()> {
    let file = fs::File::create(dir.chunks()).map_err(anyhow::Error::from)?;
    let mut out = std::io::BufWriter::new(file);
    for chunk in store.chunks() {
        serde_json::to_writer(&mut out, chunk).map_err(anyhow::Error::from)?;
        out.write_all(b"\n").map_err(anyhow::Error::from)?;
    }
    out.flush().map_err(anyhow::Error::from)?;
    Ok(())
}

pub fn read_chunks(dir: &SnapshotDir) -> Result<ChunkStore> {
    let path = dir.chunks();
    let file = fs::File::open(&path).map_err(|e| Error::index_unavailable(&path, e))?;
    let mut chunks = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::index_unavailable(&path, e))?;
        if line.trim().is_empty() { continue; }
        let chunk: Chunk = serde_json::from_str(&line).map_err(|e| Error::index_unavailable(&path, format!("line {}: {e}", i + 1)))?;
        chunks.push(chunk);
    }
    Ok(ChunkStore::from_chunks(chunks))
}

/// Both indexes of one published snapshot, opened read-only.
pub struct Snapshot {
    pub manifest: Manifest,
    pub dir: SnapshotDir,
    pub text: TantivySearchEngine,
    pub vector: LanceSearchEngine,
}

impl Snapshot {
    pub async fn open(dir: SnapshotDir) -> Result<Self> {
        let manifest = read_manifest(&dir)?;
        if manifest.chunk_ids.len() != manifest.chunk_count {
            return Err(Error::index_unavailable(dir.manifest(), format!("manifest lists {} ids for {} chunks", manifest.chunk_ids.len(), manifest.chunk_count)));
        }
        let text = TantivySearchEngine::open(&dir.lexical())?;
        let docs = usize::try_from(text.num_docs()).unwrap_or(usize::MAX);
        if docs != manifest.chunk_count {
            return Err(Error::index_unavailable(dir.lexical(), format!("lexical index has {docs} docs, manifest says {}", manifest.chunk_count)));
        }
        let vector = LanceSearchEngine::open(&dir.vectors()).await?;
        let rows = vector.count().await?;
        if rows != manifest.chunk_count {
            return Err(Error::index_unavailable(dir.vectors(), format!("vector store has {rows} rows, manifest says {}", manifest.chunk_count)));
        }
        let expected: HashSet<&str> = manifest.chunk_ids.iter().map(String::as_str).collect();
        check_ids(&dir.lexical(), &expected, &text.chunk_ids()?)?;
        check_ids(&dir.vectors(), &expected, &vector.chunk_ids().await?)?;
        info!(version = %manifest.version, chunks = manifest.chunk_count, embedder = %manifest.embedder, "snapshot opened");
        Ok(Self { manifest, dir, text, vector })
    }
}

/// Both indexes must hold exactly the manifest's chunk ids, or fused hits
/// would not refer to the same chunks.
fn check_ids(index: &Path, expected: &HashSet<&str>, stored: &[String]) -> Result<()> {
    let stored: HashSet<&str> = stored.iter().map(String::as_str).collect();
    if let Some(stray) = stored.iter().find(|id| !expected.contains(*id)) {
        return Err(Error::index_unavailable(index, format!("chunk {stray} is not in the manifest; index belongs to another snapshot")));
    }
    if let Some(missing) = expected.iter().find(|id| !stored.contains(*id)) {
        return Err(Error::index_unavailable(index, format!("manifest chunk {missing} is missing from the index")));
    }
    Ok(())
}
