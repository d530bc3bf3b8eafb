//! siteqa-text
//!
//! BM25 keyword index over tantivy. `index` writes a snapshot's chunks,
//! `search` serves read-only queries against it.
pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::TantivyIndexer;
pub use search::TantivySearchEngine;
