use std::path::{Path, PathBuf};

use tantivy::{doc, Index};
use tracing::info;

use siteqa_core::{ChunkStore, Error, Result};

use crate::tantivy_utils::{build_schema, register_tokenizer, Fields};

const WRITER_HEAP_BYTES: usize = 50_000_000;

pub struct TantivyIndexer {
	index: Index,
	fields: Fields,
	dir: PathBuf,
}

impl TantivyIndexer {
	/// Creates an empty index in `index_dir`, replacing whatever was there.
	pub fn create(index_dir: &Path) -> Result<Self> {
		let schema = build_schema();
		if index_dir.exists() { std::fs::remove_dir_all(index_dir).map_err(anyhow::Error::from)?; }
		std::fs::create_dir_all(index_dir).map_err(anyhow::Error::from)?;
		let index = Index::create_in_dir(index_dir, schema.clone()).map_err(anyhow::Error::from)?;
		register_tokenizer(&index);
		let fields = Fields::from_schema(&schema).map_err(anyhow::Error::from)?;
		Ok(Self { index, fields, dir: index_dir.to_path_buf() })
	}

	/// Writes every chunk of the store in ordinal order and commits once.
	pub fn index(&self, store: &ChunkStore) -> Result<usize> {
		let mut index_writer = self.index.writer(WRITER_HEAP_BYTES).map_err(anyhow::Error::from)?;
		let f = self.fields;
		for c in store.chunks() {
			index_writer.add_document(doc!(
				f.id => c.id.clone(),
				f.source => c.source.clone(),
				f.section_path => c.section_path.clone(),
				f.title => c.title.clone(),
				f.text => c.text.clone(),
				f.ordinal => c.ordinal as u64,
			)).map_err(anyhow::Error::from)?;
		}
		index_writer.commit().map_err(|e| Error::Operation(format!("commit lexical index at {}: {e}", self.dir.display())))?;
		info!(chunks = store.len(), dir = %self.dir.display(), "lexical index written");
		Ok(store.len())
	}
}
