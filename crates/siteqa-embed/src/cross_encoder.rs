use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use candle_core::{DType, Device};
use candle_transformers::models::xlm_roberta::XLMRobertaForSequenceClassification;
use tokenizers::Tokenizer;
use tracing::info;

use siteqa_core::config::RerankerSettings;
use siteqa_core::traits::CrossEncoder;

use crate::{device, dir_name, load_weights, read_config, tokenize};

const PAIR_BATCH: usize = 16;

/// XLM-R sequence classifier with a single relevance logit
/// (bge-reranker family). Scores are sigmoid probabilities.
pub struct CrossEncoderModel {
    model: XLMRobertaForSequenceClassification,
    tokenizer: Tokenizer,
    device: Device,
    pad_id: u32,
    id: String,
}

impl CrossEncoderModel {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), "loading cross-encoder");
        let tokenizer = tokenize::load_tokenizer(&model_dir.join("tokenizer.json"), max_len)?;
        let (config, _) = read_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let model = XLMRobertaForSequenceClassification::new(1, &config, vb)?;
        let pad_id = tokenize::pad_id(&tokenizer);
        Ok(Self { model, tokenizer, device, pad_id, id: format!("cross-encoder:{}", dir_name(model_dir)) })
    }

    fn score_chunk(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let encodings = tokenize::encode_pairs(&self.tokenizer, query, passages)?;
        let (input_ids, attention_mask) = tokenize::pad_batch(&encodings, self.pad_id, &self.device)?;
        // XLM-R has a single token type; both segments use id 0.
        let token_type_ids = input_ids.zeros_like()?;
        let logits = self.model.forward(&input_ids, &attention_mask, &token_type_ids)?;
        let probs = candle_nn::ops::sigmoid(&logits)?;
        let scores: Vec<f32> = probs.flatten_all()?.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec1()?;
        Ok(scores)
    }
}

impl CrossEncoder for CrossEncoderModel {
    fn id(&self) -> &str { &self.id }

    fn score_batch(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(passages.len());
        for chunk in passages.chunks(PAIR_BATCH) { out.extend(self.score_chunk(query, chunk)?); }
        Ok(out)
    }
}

/// Scores by the share of query terms present in the passage, lightly
/// penalising long passages. Deterministic and model-free.
#[derive(Debug, Default, Clone)]
pub struct FakeCrossEncoder;

fn terms(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric()).filter(|t| t.chars().count() > 2).map(|t| t.to_lowercase()).collect()
}

impl CrossEncoder for FakeCrossEncoder {
    fn id(&self) -> &str { "fake-term-overlap" }

    fn score_batch(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let q = terms(query);
        Ok(passages
            .iter()
            .map(|p| {
                let pt = terms(p);
                let overlap = q.intersection(&pt).count() as f32;
                overlap / (q.len().max(1) as f32) - 0.001 * pt.len() as f32
            })
            .collect())
    }
}

pub fn get_default_cross_encoder(settings: &RerankerSettings) -> Result<Arc<dyn CrossEncoder>> {
    if settings.use_fake || crate::fake_requested() {
        info!("using FakeCrossEncoder");
        return Ok(Arc::new(FakeCrossEncoder));
    }
    Ok(Arc::new(CrossEncoderModel::load(&settings.model_dir, settings.max_len)?))
}
