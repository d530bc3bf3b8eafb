//! Asymmetric query/passage encoding.
//!
//! Some model families (e5) expect `"query: "` in front of search text and
//! `"passage: "` in front of indexed text. The prefix is configuration of the
//! model, applied by wrapping the base embedder once per role.

use std::sync::Arc;

use siteqa_core::config::EmbeddingSettings;
use siteqa_core::traits::Embedder;

struct Prefixed {
    prefix: String,
    base: Arc<dyn Embedder>,
    id: String,
}

impl Embedder for Prefixed {
    fn id(&self) -> &str { &self.id }

    fn dim(&self) -> usize { self.base.dim() }

    fn max_len(&self) -> usize { self.base.max_len() }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let prefixed: Vec<String> = texts.iter().map(|t| format!("{}{}", self.prefix, t)).collect();
        self.base.embed_batch(&prefixed)
    }
}

/// Returns an embedder that prepends `prefix` to every input before
/// delegating to `base`. An empty prefix returns `base` unchanged.
pub fn with_prefix(prefix: impl Into<String>, base: Arc<dyn Embedder>) -> Arc<dyn Embedder> {
    let prefix = prefix.into();
    if prefix.is_empty() { return base; }
    let id = format!("{}+{:?}", base.id(), prefix);
    Arc::new(Prefixed { prefix, base, id })
}

/// The two roles of one embedding model: `document` at index time,
/// `query` at search time.
#[derive(Clone)]
pub struct EncoderPair {
    pub document: Arc<dyn Embedder>,
    pub query: Arc<dyn Embedder>,
}

impl EncoderPair {
    pub fn new(base: Arc<dyn Embedder>, query_prefix: &str, passage_prefix: &str) -> Self {
        Self { document: with_prefix(passage_prefix, base.clone()), query: with_prefix(query_prefix, base) }
    }

    pub fn from_settings(base: Arc<dyn Embedder>, settings: &EmbeddingSettings) -> Self {
        Self::new(base, &settings.query_prefix, &settings.passage_prefix)
    }

    /// Identifies the model and its document-side convention; recorded in
    /// snapshot manifests.
    pub fn id(&self) -> &str { self.document.id() }
}
