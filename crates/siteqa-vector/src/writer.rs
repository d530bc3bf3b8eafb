//! Vector store writer.
//!
//! Embeds every chunk of a snapshot with the document-side encoder and
//! writes `(chunk, vector)` rows into a fresh LanceDB table.
use anyhow::anyhow;
use arrow_array::{types::Float32Type, Array, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt64Array};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use siteqa_core::traits::Embedder;
use siteqa_core::{Chunk, ChunkStore, Error, Result, Stage};

use crate::schema::{build_arrow_schema, TABLE_NAME};
use crate::table::{has_table, open_db};

const INSERT_BATCH: usize = 1000;

pub struct LanceDbIndexer {
	db: Connection,
	db_path: PathBuf,
}

impl LanceDbIndexer {
	/// Opens a fresh store at `db_path`, removing whatever was there.
	pub async fn create(db_path: &Path) -> Result<Self> {
		if db_path.exists() { std::fs::remove_dir_all(db_path).map_err(anyhow::Error::from)?; }
		std::fs::create_dir_all(db_path).map_err(anyhow::Error::from)?;
		let db = open_db(db_path).await?;
		Ok(Self { db, db_path: db_path.to_path_buf() })
	}

	/// Embeds and writes the whole store. `embedder` must already carry
	/// the passage-side convention. Inference runs on the blocking pool.
	pub async fn index_store(&self, store: &ChunkStore, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<usize> {
		let dim = embedder.dim();
		if has_table(&self.db, TABLE_NAME).await? {
			return Err(Error::Operation(format!("table '{TABLE_NAME}' already exists in {}", self.db_path.display())));
		}
		let schema = build_arrow_schema(dim);
		let empty = RecordBatch::new_empty(schema.clone());
		self.db
			.create_table(TABLE_NAME, RecordBatchIterator::new(vec![Ok(empty)], schema))
			.execute()
			.await
			.map_err(anyhow::Error::from)?;
		if store.is_empty() { info!(dir = %self.db_path.display(), "vector store written (empty corpus)"); return Ok(0); }

		let table = self.db.open_table(TABLE_NAME).execute().await.map_err(anyhow::Error::from)?;
		let pb = ProgressBar::new(store.len() as u64);
		pb.set_style(
			ProgressStyle::default_bar()
				.template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
				.map_err(anyhow::Error::from)?
				.progress_chars("#>-"),
		);
		let mut written = 0usize;
		for group in store.chunks().chunks(INSERT_BATCH) {
			let mut vectors = Vec::with_capacity(group.len());
			for part in group.chunks(batch_size.max(1)) {
				let texts: Vec<String> = part.iter().map(|c| c.text.clone()).collect();
				let encoder = Arc::clone(&embedder);
				let embedded = tokio::task::spawn_blocking(move || encoder.embed_batch(&texts))
					.await
					.map_err(|e| Error::Operation(format!("embedding task failed: {e}")))?
					.map_err(|e| Error::model(Stage::Embedding, e))?;
				if embedded.len() != part.len() {
					return Err(Error::Operation(format!("embedder returned {} vectors for {} texts", embedded.len(), part.len())));
				}
				vectors.extend(embedded);
				pb.inc(part.len() as u64);
			}
			let batch = to_record_batch(group, vectors, dim)?;
			let schema = batch.schema();
			table.add(RecordBatchIterator::new(vec![Ok(batch)], schema)).execute().await.map_err(anyhow::Error::from)?;
			written += group.len();
			pb.set_message(format!("{written} written"));
		}
		pb.finish_with_message("vector store written");
		info!(chunks = written, dim, embedder = embedder.id(), dir = %self.db_path.display(), "vector store written");
		Ok(written)
	}
}

fn to_record_batch(chunks: &[Chunk], vectors: Vec<Vec<f32>>, dim: usize) -> Result<RecordBatch> {
	if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
		return Err(Error::Operation(format!("embedding has {} dims, expected {dim}", bad.len())));
	}
	let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
		vectors.into_iter().map(|v| Some(v.into_iter().map(Some).collect::<Vec<_>>())),
		dim as i32,
	);
	let batch = RecordBatch::try_new(
		build_arrow_schema(dim),
		vec![
			Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.id.as_str()))),
			Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.source.as_str()))),
			Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.section_path.as_str()))),
			Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.title.as_str()))),
			Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
			Arc::new(UInt64Array::from_iter_values(chunks.iter().map(|c| c.ordinal as u64))),
			Arc::new(vector_array) as Arc<dyn Array>,
		],
	)
	.map_err(|e| anyhow!("Failed to create record batch: {e}"))?;
	Ok(batch)
}
