use std::fmt;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// Pipeline stage that talks to an index or an external model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Rerank,
    Expansion,
    Generation,
    LexicalSearch,
    VectorSearch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::Rerank => "rerank",
            Stage::Expansion => "query expansion",
            Stage::Generation => "generation",
            Stage::LexicalSearch => "lexical search",
            Stage::VectorSearch => "vector search",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A persisted index is missing or unreadable. Operators must reindex.
    #[error("Index unavailable at {path}: {reason}")]
    IndexUnavailable { path: String, reason: String },

    #[error("{stage} call failed: {message}")]
    Model { stage: Stage, message: String },

    #[error("{stage} call timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn index_unavailable(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        Error::IndexUnavailable { path: path.as_ref().display().to_string(), reason: reason.to_string() }
    }

    pub fn model(stage: Stage, err: impl fmt::Display) -> Self {
        Error::Model { stage, message: err.to_string() }
    }

    /// Configuration-class errors are fatal and never retried.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::InvalidConfig(_) | Error::IndexUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_unavailable_is_config_class() {
        let err = Error::index_unavailable("/tmp/idx", "missing meta.json");
        assert!(err.is_config());
        assert_eq!(err.to_string(), "Index unavailable at /tmp/idx: missing meta.json");
        assert!(!Error::model(Stage::Rerank, "boom").is_config());
    }

    #[test]
    fn timeout_message_names_stage() {
        let err = Error::Timeout { stage: Stage::Expansion, after: Duration::from_secs(2) };
        assert_eq!(err.to_string(), "query expansion call timed out after 2s");
    }

    #[test]
    fn search_stages_have_readable_names() {
        assert_eq!(Stage::LexicalSearch.to_string(), "lexical search");
        assert_eq!(Stage::VectorSearch.to_string(), "vector search");
    }
}
