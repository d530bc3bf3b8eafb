use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, QueryParser};
use tantivy::schema::Value;
use tantivy::{DocId, Index, IndexReader, Score, SegmentReader, TantivyDocument};
use tracing::debug;

use siteqa_core::traits::TextSearcher;
use siteqa_core::{Chunk, Error, Result, ScoredChunk, SourceKind, Stage};

use crate::tantivy_utils::{register_tokenizer, Fields};

pub struct TantivySearchEngine {
	index: Index,
	reader: IndexReader,
	fields: Fields,
	dir: PathBuf,
}

fn search_err(e: impl std::fmt::Display) -> Error { Error::Operation(format!("{}: {e}", Stage::LexicalSearch)) }

impl TantivySearchEngine {
	/// Opens a built index. A missing or unreadable directory is
	/// `IndexUnavailable`, never an empty engine.
	pub fn open(index_dir: &Path) -> Result<Self> {
		if !index_dir.join("meta.json").is_file() {
			return Err(Error::index_unavailable(index_dir, "lexical index not found (meta.json missing)"));
		}
		let index = Index::open_in_dir(index_dir).map_err(|e| Error::index_unavailable(index_dir, e))?;
		register_tokenizer(&index);
		let fields = Fields::from_schema(&index.schema()).map_err(|e| Error::index_unavailable(index_dir, e))?;
		let reader = index.reader().map_err(|e| Error::index_unavailable(index_dir, e))?;
		Ok(Self { index, reader, fields, dir: index_dir.to_path_buf() })
	}

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	/// Stored ids of every live document.
	pub fn chunk_ids(&self) -> Result<Vec<String>> {
		let searcher = self.reader.searcher();
		let mut addrs: Vec<_> = searcher.search(&AllQuery, &DocSetCollector).map_err(|e| Error::index_unavailable(&self.dir, e))?.into_iter().collect();
		addrs.sort();
		let mut ids = Vec::with_capacity(addrs.len());
		for addr in addrs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(|e| Error::index_unavailable(&self.dir, e))?;
			ids.push(doc.get_first(self.fields.id).and_then(|v| v.as_str()).unwrap_or("").to_string());
		}
		Ok(ids)
	}

	fn to_chunk(&self, doc: &TantivyDocument) -> Chunk {
		let f = self.fields;
		let text = |field| doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		Chunk {
			id: text(f.id),
			text: text(f.text),
			source: text(f.source),
			section_path: text(f.section_path),
			title: text(f.title),
			ordinal: doc.get_first(f.ordinal).and_then(|v| v.as_u64()).unwrap_or(u64::MAX) as usize,
		}
	}
}

impl TextSearcher for TantivySearchEngine {
	fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
		if k == 0 || query.trim().is_empty() { return Ok(vec![]); }
		let searcher = self.reader.searcher();
		let qp = QueryParser::for_index(&self.index, vec![self.fields.text]);
		// User text is not query syntax; stray quotes or colons must not fail the request.
		let (q, errors) = qp.parse_query_lenient(query);
		if !errors.is_empty() { debug!(query, errors = errors.len(), "lenient parse dropped query fragments"); }

		// Equal BM25 scores resolve to the lower corpus ordinal.
		let collector = TopDocs::with_limit(k).tweak_score(move |segment_reader: &SegmentReader| {
			let ordinals = segment_reader.fast_fields().u64("ordinal").ok();
			move |doc: DocId, score: Score| {
				let ord = ordinals.as_ref().and_then(|c| c.first(doc)).unwrap_or(u64::MAX);
				(score, Reverse(ord))
			}
		});
		let top_docs = searcher.search(&q, &collector).map_err(search_err)?;

		let mut hits = Vec::with_capacity(top_docs.len());
		for ((score, _), addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(search_err)?;
			hits.push(ScoredChunk::new(self.to_chunk(&doc), score, SourceKind::Text));
		}
		debug!(query, hits = hits.len(), "lexical search");
		Ok(hits)
	}
}
