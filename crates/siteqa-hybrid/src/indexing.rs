//! Build phase: one chunk snapshot, both indexes, then publish.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use siteqa_core::chunking::chunker_for;
use siteqa_core::config::Settings;
use siteqa_core::document_source::DocumentSource;
use siteqa_core::traits::Embedder;
use siteqa_core::{ChunkStore, Result};
use siteqa_embed::{get_default_embedder, EncoderPair};
use siteqa_text::TantivyIndexer;
use siteqa_vector::LanceDbIndexer;

use crate::snapshot::{write_chunks, write_manifest, Manifest, SnapshotDir, SnapshotStore};

#[derive(Debug, Clone)]
pub struct IndexReport {
    pub version: String,
    pub chunk_count: usize,
    pub dir: PathBuf,
}

/// Writes a complete snapshot of `store` and points `CURRENT` at it.
///
/// `document_encoder` must carry the passage-side prefix convention. On
/// error the previous snapshot stays live and the partial directory is
/// removed.
pub async fn build_snapshot(snapshots: &SnapshotStore, store: &ChunkStore, document_encoder: Arc<dyn Embedder>, batch_size: usize) -> Result<IndexReport> {
    let (version, dir) = snapshots.allocate()?;
    info!(version, chunks = store.len(), "building snapshot");

    match write_snapshot(snapshots, &version, &dir, store, document_encoder, batch_size).await {
        Ok(()) => Ok(IndexReport { version, chunk_count: store.len(), dir: dir.path().to_path_buf() }),
        Err(e) => {
            warn!(version, error = %e, "snapshot build failed; removing partial directory");
            if let Err(rm) = fs::remove_dir_all(dir.path()) {
                warn!(dir = %dir.path().display(), error = %rm, "could not remove partial snapshot");
            }
            Err(e)
        }
    }
}

async fn write_snapshot(snapshots: &SnapshotStore, version: &str, dir: &SnapshotDir, store: &ChunkStore, document_encoder: Arc<dyn Embedder>, batch_size: usize) -> Result<()> {
    let embedder = document_encoder.id().to_string();
    let lexical_docs = TantivyIndexer::create(&dir.lexical())?.index(store)?;
    let vector_rows = LanceDbIndexer::create(&dir.vectors()).await?.index_store(store, document_encoder, batch_size).await?;
    write_chunks(dir, store)?;

    let manifest = Manifest {
        version: version.to_string(),
        created_at: Utc::now(),
        chunk_count: store.len(),
        embedder,
        chunk_ids: store.ids(),
    };
    write_manifest(dir, &manifest)?;
    snapshots.publish(version)?;

    info!(version, lexical_docs, vector_rows, dir = %dir.path().display(), "snapshot built");
    Ok(())
}

/// Chunks every document under `data_dir` with the configured strategy and
/// builds a snapshot under `paths.index_root`.
pub async fn index_directory(settings: &Settings, data_dir: &Path, limit: Option<usize>) -> Result<IndexReport> {
    let chunker = chunker_for(&settings.chunking)?;
    let source = DocumentSource::new(chunker.as_ref());
    let chunks = source.process_directory_limited(data_dir, limit.unwrap_or(usize::MAX))?;
    let store = ChunkStore::from_chunks(chunks);
    info!(chunker = chunker.name(), chunks = store.len(), "corpus chunked");

    let encoders = EncoderPair::from_settings(get_default_embedder(&settings.embedding)?, &settings.embedding);
    let snapshots = SnapshotStore::new(&settings.paths.index_root);
    build_snapshot(&snapshots, &store, Arc::clone(&encoders.document), settings.embedding.batch_size).await
}
