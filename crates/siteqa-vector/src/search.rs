use arrow_array::{Array, Float32Array, RecordBatch, StringArray, UInt64Array};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use std::path::{Path, PathBuf};
use tracing::debug;

use siteqa_core::traits::VectorSearcher;
use siteqa_core::{Chunk, Error, Result, ScoredChunk, SourceKind, Stage};

use crate::schema::{vector_dim, TABLE_NAME};
use crate::table::{has_table, open_db};

pub struct LanceSearchEngine {
	table: Table,
	dim: usize,
	db_path: PathBuf,
}

fn search_err(e: impl std::fmt::Display) -> Error { Error::Operation(format!("{}: {e}", Stage::VectorSearch)) }

impl LanceSearchEngine {
	/// Opens the chunk table of a built store. A missing directory or table
	/// is `IndexUnavailable`.
	pub async fn open(db_path: &Path) -> Result<Self> {
		if !db_path.is_dir() {
			return Err(Error::index_unavailable(db_path, "vector store directory not found"));
		}
		let db = open_db(db_path).await?;
		if !has_table(&db, TABLE_NAME).await? {
			return Err(Error::index_unavailable(db_path, format!("table '{TABLE_NAME}' not found")));
		}
		let table = db.open_table(TABLE_NAME).execute().await.map_err(|e| Error::index_unavailable(db_path, e))?;
		let schema = table.schema().await.map_err(|e| Error::index_unavailable(db_path, e))?;
		let dim = vector_dim(&schema).ok_or_else(|| Error::index_unavailable(db_path, "table has no fixed-size 'vector' column"))?;
		Ok(Self { table, dim, db_path: db_path.to_path_buf() })
	}

	pub fn dim(&self) -> usize { self.dim }

	pub async fn count(&self) -> Result<usize> { self.table.count_rows(None).await.map_err(search_err) }

	/// Ids of every stored row, in storage order.
	pub async fn chunk_ids(&self) -> Result<Vec<String>> {
		let rows = self.count().await?;
		let mut ids = Vec::with_capacity(rows);
		let mut stream = self.table.query().select(Select::columns(&["id"])).limit(rows.max(1)).execute().await.map_err(|e| Error::index_unavailable(&self.db_path, e))?;
		while let Some(batch) = stream.try_next().await.map_err(|e| Error::index_unavailable(&self.db_path, e))? {
			let col = batch
				.column_by_name("id")
				.and_then(|c| c.as_any().downcast_ref::<StringArray>())
				.ok_or_else(|| Error::index_unavailable(&self.db_path, "column 'id' missing"))?;
			ids.extend((0..batch.num_rows()).map(|i| col.value(i).to_string()));
		}
		Ok(ids)
	}
}

fn rows(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
	let text = |name: &str| batch.column_by_name(name).and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| search_err(format!("column '{name}' missing")));
	let (ids, sources, paths, titles, texts) = (text("id")?, text("source")?, text("section_path")?, text("title")?, text("text")?);
	let ordinals = batch.column_by_name("ordinal").and_then(|c| c.as_any().downcast_ref::<UInt64Array>()).ok_or_else(|| search_err("column 'ordinal' missing"))?;
	let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>()).ok_or_else(|| search_err("column '_distance' missing"))?;
	Ok((0..batch.num_rows())
		.map(|i| {
			let chunk = Chunk {
				id: ids.value(i).to_string(),
				text: texts.value(i).to_string(),
				source: sources.value(i).to_string(),
				section_path: paths.value(i).to_string(),
				title: titles.value(i).to_string(),
				ordinal: ordinals.value(i) as usize,
			};
			// Cosine distance in [0, 2]; similarity in [-1, 1].
			let score = if distances.is_null(i) { f32::NEG_INFINITY } else { 1.0 - distances.value(i) };
			ScoredChunk::new(chunk, score, SourceKind::Vector)
		})
		.collect())
}

#[async_trait]
impl VectorSearcher for LanceSearchEngine {
	async fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
		if k == 0 { return Ok(vec![]); }
		if query_vec.len() != self.dim {
			return Err(Error::Operation(format!("query vector has {} dims, store has {}", query_vec.len(), self.dim)));
		}
		// Over-fetch so that rows tied at the cut-off are ordered by ordinal, not storage order.
		let fetch = k.saturating_mul(2).max(k.saturating_add(16));
		let batches: Vec<RecordBatch> = self
			.table
			.vector_search(query_vec)
			.map_err(search_err)?
			.distance_type(DistanceType::Cosine)
			.limit(fetch)
			.execute()
			.await
			.map_err(search_err)?
			.try_collect()
			.await
			.map_err(search_err)?;
		let mut hits = Vec::new();
		for batch in &batches { hits.extend(rows(batch)?); }
		hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.chunk.ordinal.cmp(&b.chunk.ordinal)));
		hits.truncate(k);
		debug!(hits = hits.len(), "vector search");
		Ok(hits)
	}
}
