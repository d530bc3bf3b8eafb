//! siteqa-vector
//!
//! LanceDB-backed vector store: one `chunks` table per snapshot holding the
//! chunk fields alongside a fixed-size embedding column.
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use search::LanceSearchEngine;
pub use writer::LanceDbIndexer;
