//! siteqa-hybrid
//!
//! The retrieval pipeline: weighted fusion of lexical and vector search,
//! query expansion, cross-encoder re-ranking and the `retrieve` entry
//! point, plus snapshot build/load, answer synthesis and evaluation runs.

pub mod answer;
pub mod evaluate;
pub mod expand;
pub mod fusion;
pub mod indexing;
pub mod orchestrator;
pub mod pipeline;
pub mod rerank;
pub mod retriever;
pub mod snapshot;
mod stage;

pub use answer::{Answer, AnswerService, NO_ANSWER};
pub use expand::QueryExpander;
pub use fusion::{weighted_rrf, FusionWeights};
pub use indexing::{build_snapshot, index_directory, IndexReport};
pub use orchestrator::Retriever;
pub use pipeline::{open_answer_service, open_retriever, Models};
pub use rerank::Reranker;
pub use retriever::{HybridParams, HybridRetriever};
pub use snapshot::{Snapshot, SnapshotStore};
