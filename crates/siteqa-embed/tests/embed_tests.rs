use std::sync::{Arc, Mutex};

use siteqa_core::config::{EmbeddingSettings, RerankerSettings};
use siteqa_core::traits::{CrossEncoder, Embedder};
use siteqa_embed::{get_default_cross_encoder, get_default_embedder, with_prefix, EncoderPair, FakeCrossEncoder, FakeEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { use_fake: true, dim: 256, ..Default::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let (v1, v2) = (&embs[0], &embs[1]);

    assert_eq!(v1.len(), 256, "embedding dim follows settings");
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_shared_terms_are_closer() {
    let e = FakeEmbedder::new(512);
    let v = e.embed_batch(&["who founded the faculty".into(), "Founded 1970".into(), "Admissions open".into()]).unwrap();
    assert!(cosine(&v[0], &v[1]) > cosine(&v[0], &v[2]));
}

/// Records every text it is asked to embed.
struct Recording {
    seen: Mutex<Vec<String>>,
}

impl Embedder for Recording {
    fn id(&self) -> &str { "recording" }
    fn dim(&self) -> usize { 2 }
    fn max_len(&self) -> usize { 512 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.seen.lock().unwrap().extend(texts.iter().cloned());
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

#[test]
fn prefix_applied_once_per_role() {
    let base = Arc::new(Recording { seen: Mutex::new(vec![]) });
    let pair = EncoderPair::new(base.clone(), "query: ", "passage: ");

    pair.document.embed_batch(&["Founded 1970".into()]).unwrap();
    pair.query.embed_batch(&["who founded the faculty".into()]).unwrap();

    let seen = base.seen.lock().unwrap().clone();
    assert_eq!(seen, vec!["passage: Founded 1970".to_string(), "query: who founded the faculty".to_string()]);
    assert_eq!(pair.query.dim(), 2);
    assert_ne!(pair.query.id(), pair.document.id());
}

#[test]
fn empty_prefix_is_identity() {
    let base: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(8));
    let wrapped = with_prefix("", base.clone());
    assert_eq!(wrapped.id(), base.id());
}

#[test]
fn fake_cross_encoder_prefers_overlap() {
    let ce = get_default_cross_encoder(&RerankerSettings { use_fake: true, ..Default::default() }).unwrap();
    let scores = ce.score_batch("who founded the faculty", &["Dean is Ivanov".into(), "Founded 1970".into(), "Admissions open".into()]).unwrap();
    assert_eq!(scores.len(), 3);
    assert!(scores[1] > scores[0] && scores[1] > scores[2]);
    assert_eq!(FakeCrossEncoder.score_batch("q", &[]).unwrap(), Vec::<f32>::new());
}
