use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{Encoding, Tokenizer, TruncationParams};

/// Loads `tokenizer.json` with truncation at `max_len` and padding disabled;
/// batches are padded by [`pad_batch`].
pub fn load_tokenizer(path: &std::path::Path, max_len: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
    tokenizer.with_padding(None);
    Ok(tokenizer)
}

/// XLM-R vocabularies use id 1 for `<pad>`.
pub fn pad_id(tokenizer: &Tokenizer) -> u32 { tokenizer.token_to_id("<pad>").unwrap_or(1) }

pub fn encode_texts(tokenizer: &Tokenizer, texts: &[String]) -> Result<Vec<Encoding>> {
    texts.iter().map(|t| tokenizer.encode(t.as_str(), true).map_err(|e| anyhow!("Tokenization failed: {}", e))).collect()
}

/// Encodes `(query, passage)` pairs; truncation trims the longer side first.
pub fn encode_pairs(tokenizer: &Tokenizer, query: &str, passages: &[String]) -> Result<Vec<Encoding>> {
    passages
        .iter()
        .map(|p| tokenizer.encode((query, p.as_str()), true).map_err(|e| anyhow!("Tokenization failed: {}", e)))
        .collect()
}

/// Right-pads a batch to its longest member. Returns `(input_ids, attention_mask)`, both `[B, T]`.
pub fn pad_batch(encodings: &[Encoding], pad_id: u32, device: &Device) -> Result<(Tensor, Tensor)> {
    let batch = encodings.len();
    let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0).max(1);
    let mut ids = Vec::with_capacity(batch * max_len);
    let mut mask = Vec::with_capacity(batch * max_len);
    for enc in encodings {
        let n = enc.get_ids().len();
        ids.extend_from_slice(enc.get_ids());
        mask.extend_from_slice(enc.get_attention_mask());
        ids.extend(std::iter::repeat(pad_id).take(max_len - n));
        mask.extend(std::iter::repeat(0u32).take(max_len - n));
    }
    let input_ids = Tensor::from_vec(ids, (batch, max_len), device)?;
    let attention_mask = Tensor::from_vec(mask, (batch, max_len), device)?;
    Ok((input_ids, attention_mask))
}
