//! siteqa-embed
//!
//! Embedding and pairwise scoring models. `EmbeddingModel` and
//! `CrossEncoderModel` run XLM-RoBERTa checkpoints through candle; the fake
//! variants are deterministic stand-ins for tests and offline runs.

pub mod cross_encoder;
pub mod device;
pub mod pool;
pub mod prefix;
pub mod tokenize;

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use siteqa_core::config::EmbeddingSettings;
use siteqa_core::traits::Embedder;

pub use cross_encoder::{get_default_cross_encoder, CrossEncoderModel, FakeCrossEncoder};
pub use pool::masked_mean_l2;
pub use prefix::{with_prefix, EncoderPair};

pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    pad_id: u32,
    dim: usize,
    max_len: usize,
    batch_size: usize,
    id: String,
}

impl EmbeddingModel {
    pub fn load(model_dir: &Path, max_len: usize, batch_size: usize) -> Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), "loading embedding model");
        let tokenizer = tokenize::load_tokenizer(&model_dir.join("tokenizer.json"), max_len)?;
        let (config, dim) = read_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let model = XLMRobertaModel::new(&config, vb)?;
        let pad_id = tokenize::pad_id(&tokenizer);
        let id = format!("xlm-roberta:{}", dir_name(model_dir));
        info!(dim, max_len, "embedding model loaded");
        Ok(Self { model, tokenizer, device, pad_id, dim, max_len, batch_size: batch_size.max(1), id })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = tokenize::encode_texts(&self.tokenizer, texts)?;
        let (input_ids, attention_mask) = tokenize::pad_batch(&encodings, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let out: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        Ok(out)
    }
}

impl Embedder for EmbeddingModel {
    fn id(&self) -> &str { &self.id }

    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) { out.extend(self.embed_chunk(chunk)?); }
        debug!(n = texts.len(), ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}

pub(crate) fn dir_name(dir: &Path) -> String {
    dir.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| dir.display().to_string())
}

/// Parses `config.json` and reports `hidden_size` alongside it.
pub(crate) fn read_config(model_dir: &Path) -> Result<(XLMRobertaConfig, usize)> {
    let config_path = model_dir.join("config.json");
    let raw = std::fs::read_to_string(&config_path).map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
    let config: XLMRobertaConfig = serde_json::from_str(&raw)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let hidden = value.get("hidden_size").and_then(|v| v.as_u64()).ok_or_else(|| anyhow!("hidden_size missing in {}", config_path.display()))?;
    Ok((config, hidden as usize))
}

/// Prefers `model.safetensors`, falls back to `pytorch_model.bin`.
pub(crate) fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.is_file() {
        // SAFETY: weights are mapped read-only and must not change while loaded.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let weights_path: PathBuf = model_dir.join("pytorch_model.bin");
    if !weights_path.is_file() { return Err(anyhow!("no model weights found in {}", model_dir.display())); }
    let weights = candle_core::pickle::read_all(&weights_path)?;
    let weights_map: std::collections::HashMap<String, candle_core::Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

/// Token-hashing embedder: same text, same vector; shared words pull
/// vectors together. No model files needed.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { let dim = dim.max(1); Self { dim, id: format!("fake-xxhash-{dim}") } }
}

impl Embedder for FakeEmbedder {
    fn id(&self) -> &str { &self.id }

    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0f32; self.dim];
                for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
                    let mut hasher = XxHash64::with_seed(0);
                    token.to_lowercase().hash(&mut hasher);
                    let h = hasher.finish();
                    let idx = (h as usize) % self.dim;
                    v[idx] += 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
                }
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
                for x in &mut v { *x /= norm; }
                v
            })
            .collect())
    }
}

fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Base (un-prefixed) embedder for the configured model.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake || fake_requested() {
        info!(dim = settings.dim, "using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.dim)));
    }
    Ok(Arc::new(EmbeddingModel::load(&settings.model_dir, settings.max_len, settings.batch_size)?))
}
