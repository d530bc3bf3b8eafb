use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Loads from the current directory.
    pub fn load() -> Result<Self> { Self::load_from(Path::new(".")) }

    /// Merges defaults, `config.toml`, `config.<env>.toml` and `APP_*` variables.
    /// Nested keys in the environment use a double underscore:
    /// `APP_RETRIEVAL__SEARCH_K=8`.
    pub fn load_from(base_dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(base_dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, base_dir: base_dir.to_path_buf() })
    }

    pub fn from_figment(figment: Figment, base_dir: &Path) -> Self { Self { figment, base_dir: base_dir.to_path_buf() } }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Typed, validated settings with every path resolved against the base dir.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        // Legacy flag honoured by every fake-model switch.
        if env::var("APP_USE_FAKE_EMBEDDINGS").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false) {
            settings.embedding.use_fake = true;
            settings.reranker.use_fake = true;
        }
        settings.paths = settings.paths.resolved(&self.base_dir);
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathsSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub retrieval: RetrievalSettings,
    pub timeouts: TimeoutSettings,
    pub llm: LlmSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        for (name, w) in [("lexical_weight", r.lexical_weight), ("vector_weight", r.vector_weight)] {
            if !(0.0..=1.0).contains(&w) {
                return Err(Error::InvalidConfig(format!("retrieval.{name} must be within [0, 1], got {w}")));
            }
        }
        if ((r.lexical_weight + r.vector_weight) - 1.0).abs() > 1e-6 {
            return Err(Error::InvalidConfig(format!(
                "retrieval weights must sum to 1.0, got {} + {}",
                r.lexical_weight, r.vector_weight
            )));
        }
        if r.search_k == 0 { return Err(Error::InvalidConfig("retrieval.search_k must be > 0".into())); }
        if r.top_n == 0 { return Err(Error::InvalidConfig("retrieval.top_n must be > 0".into())); }
        if r.rrf_c <= 0.0 { return Err(Error::InvalidConfig("retrieval.rrf_c must be > 0".into())); }
        if r.fan_out_concurrency == 0 { return Err(Error::InvalidConfig("retrieval.fan_out_concurrency must be > 0".into())); }
        let t = &self.timeouts;
        if t.embed_secs == 0 || t.rerank_secs == 0 || t.expand_secs == 0 || t.generate_secs == 0 {
            return Err(Error::InvalidConfig("timeouts must be non-zero".into()));
        }
        if self.embedding.batch_size == 0 { return Err(Error::InvalidConfig("embedding.batch_size must be > 0".into())); }
        if !(0.0..1.0).contains(&self.chunking.overlap_percent) {
            return Err(Error::InvalidConfig("chunking.overlap_percent must be within [0, 1)".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSettings {
    pub data_dir: PathBuf,
    pub index_root: PathBuf,
    pub qa_test_set: PathBuf,
    pub report_dir: PathBuf,
}

impl Default for PathsSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/pages"),
            index_root: PathBuf::from("data/index"),
            qa_test_set: PathBuf::from("data/qa_test_set.yaml"),
            report_dir: PathBuf::from("reports"),
        }
    }
}

impl PathsSettings {
    fn resolved(self, base: &Path) -> Self {
        let r = |p: PathBuf| resolve_with_base(base, p.to_string_lossy());
        Self { data_dir: r(self.data_dir), index_root: r(self.index_root), qa_test_set: r(self.qa_test_set), report_dir: r(self.report_dir) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    Markdown,
    Html,
    PlainText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub strategy: ChunkingStrategy,
    /// Fragments shorter than this are dropped.
    pub min_chunk_chars: usize,
    pub max_words: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingSettings {
    fn default() -> Self { Self { strategy: ChunkingStrategy::Markdown, min_chunk_chars: 30, max_words: 300, overlap_percent: 0.2 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: PathBuf,
    pub max_len: usize,
    pub batch_size: usize,
    /// Prepended to query text before embedding, e.g. "query: " for e5 models.
    pub query_prefix: String,
    /// Prepended to chunk text before embedding at index time.
    pub passage_prefix: String,
    /// Vector size of the fake embedder. Real models report their own.
    pub dim: usize,
    pub use_fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/multilingual-e5-base"),
            max_len: 512,
            batch_size: 32,
            query_prefix: "query: ".into(),
            passage_prefix: "passage: ".into(),
            dim: 384,
            use_fake: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub model_dir: PathBuf,
    pub max_len: usize,
    pub use_fake: bool,
}

impl Default for RerankerSettings {
    fn default() -> Self { Self { model_dir: PathBuf::from("models/bge-reranker-v2-m3"), max_len: 512, use_fake: false } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Per-index top-k for every fan-out query.
    pub search_k: usize,
    pub lexical_weight: f32,
    pub vector_weight: f32,
    /// Reciprocal rank fusion constant.
    pub rrf_c: f32,
    pub top_n: usize,
    pub expansion_enabled: bool,
    pub num_expansions: usize,
    pub fan_out_concurrency: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            search_k: 5,
            lexical_weight: 0.3,
            vector_weight: 0.7,
            rrf_c: 60.0,
            top_n: 5,
            expansion_enabled: true,
            num_expansions: 3,
            fan_out_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub embed_secs: u64,
    pub rerank_secs: u64,
    pub expand_secs: u64,
    pub generate_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self { Self { embed_secs: 30, rerank_secs: 60, expand_secs: 20, generate_secs: 120 } }
}

impl TimeoutSettings {
    pub fn embed(&self) -> Duration { Duration::from_secs(self.embed_secs) }
    pub fn rerank(&self) -> Duration { Duration::from_secs(self.rerank_secs) }
    pub fn expand(&self) -> Duration { Duration::from_secs(self.expand_secs) }
    pub fn generate(&self) -> Duration { Duration::from_secs(self.generate_secs) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Ollama,
    #[serde(alias = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self { provider: LlmProvider::Ollama, base_url: "http://localhost:11434".into(), model: "llama3.1:8b".into(), api_key: None, temperature: 0.0 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
