//! Weighted reciprocal-rank fusion of lexical and vector result lists.
//!
//! Each list contributes `weight / (c + rank)` for every chunk it returns,
//! `rank` starting at 1. Raw scores are never compared across lists.

use std::collections::{HashMap, HashSet};

use siteqa_core::{Error, Result, ScoredChunk, SourceKind};

const WEIGHT_TOLERANCE: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub lexical: f32,
    pub vector: f32,
}

impl FusionWeights {
    /// Both weights in `[0, 1]`, summing to 1.
    pub fn new(lexical: f32, vector: f32) -> Result<Self> {
        let in_range = |w: f32| (0.0..=1.0).contains(&w);
        if !in_range(lexical) || !in_range(vector) {
            return Err(Error::InvalidConfig(format!("fusion weights must lie in [0, 1], got lexical={lexical} vector={vector}")));
        }
        if (lexical + vector - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(Error::InvalidConfig(format!("fusion weights must sum to 1.0, got {}", lexical + vector)));
        }
        Ok(Self { lexical, vector })
    }
}

impl Default for FusionWeights {
    fn default() -> Self { Self { lexical: 0.3, vector: 0.7 } }
}

struct Entry {
    chunk: ScoredChunk,
    score: f32,
    lists: u8,
    first_seen: usize,
}

/// Fuses two ranked lists into one, deduplicated by chunk id.
///
/// Ordering: fused score descending, then chunks returned by both lists,
/// then first appearance (vector list first, lexical after). A list with
/// zero weight is ignored entirely, so the output equals the other list.
pub fn weighted_rrf(lexical: &[ScoredChunk], vector: &[ScoredChunk], weights: FusionWeights, c: f32) -> Vec<ScoredChunk> {
    let mut entries: Vec<Entry> = Vec::with_capacity(lexical.len() + vector.len());
    let mut slot: HashMap<&str, usize> = HashMap::new();

    for (list, weight) in [(vector, weights.vector), (lexical, weights.lexical)] {
        if weight <= 0.0 { continue; }
        let mut seen_here: HashSet<&str> = HashSet::new();
        let mut rank = 0usize;
        for hit in list {
            let id = hit.chunk.id.as_str();
            if !seen_here.insert(id) { continue; }
            rank += 1;
            let contribution = weight / (c + rank as f32);
            match slot.get(id) {
                Some(&i) => {
                    entries[i].score += contribution;
                    entries[i].lists += 1;
                }
                None => {
                    slot.insert(id, entries.len());
                    let first_seen = entries.len();
                    entries.push(Entry { chunk: hit.clone(), score: contribution, lists: 1, first_seen });
                }
            }
        }
    }

    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(b.lists.cmp(&a.lists))
            .then(a.first_seen.cmp(&b.first_seen))
    });
    entries
        .into_iter()
        .map(|e| ScoredChunk::new(e.chunk.chunk, e.score, SourceKind::Fused))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteqa_core::Chunk;

    fn hit(text: &str, kind: SourceKind) -> ScoredChunk {
        ScoredChunk::new(Chunk::new("doc", text, "", ""), 1.0, kind)
    }

    fn texts(v: &[ScoredChunk]) -> Vec<&str> { v.iter().map(|s| s.chunk.text.as_str()).collect() }

    #[test]
    fn weights_are_validated() {
        assert!(FusionWeights::new(0.3, 0.7).is_ok());
        assert!(FusionWeights::new(0.0, 1.0).is_ok());
        assert!(matches!(FusionWeights::new(0.5, 0.6), Err(Error::InvalidConfig(_))));
        assert!(matches!(FusionWeights::new(-0.1, 1.1), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn chunk_in_both_lists_appears_once_and_wins() {
        let lex = vec![hit("a", SourceKind::Text), hit("b", SourceKind::Text)];
        let vec = vec![hit("c", SourceKind::Vector), hit("b", SourceKind::Vector)];
        let fused = weighted_rrf(&lex, &vec, FusionWeights::new(0.5, 0.5).unwrap(), 60.0);
        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].chunk.text, "b");
        assert!(fused.iter().all(|s| s.kind == SourceKind::Fused));
    }

    #[test]
    fn zero_weight_reproduces_other_list() {
        let lex = vec![hit("a", SourceKind::Text), hit("b", SourceKind::Text), hit("c", SourceKind::Text)];
        let vec = vec![hit("c", SourceKind::Vector), hit("d", SourceKind::Vector), hit("a", SourceKind::Vector)];

        let vector_only = weighted_rrf(&lex, &vec, FusionWeights::new(0.0, 1.0).unwrap(), 60.0);
        assert_eq!(texts(&vector_only), vec!["c", "d", "a"]);

        let lexical_only = weighted_rrf(&lex, &vec, FusionWeights::new(1.0, 0.0).unwrap(), 60.0);
        assert_eq!(texts(&lexical_only), vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_scores_fall_back_to_first_appearance() {
        let lex = vec![hit("x", SourceKind::Text), hit("y", SourceKind::Text)];
        let vec = vec![hit("p", SourceKind::Vector), hit("q", SourceKind::Vector)];
        let fused = weighted_rrf(&lex, &vec, FusionWeights::new(0.5, 0.5).unwrap(), 60.0);
        assert_eq!(texts(&fused), vec!["p", "x", "q", "y"]);
    }

    #[test]
    fn equal_scores_prefer_presence_in_both_lists() {
        // c = 1: rank 3 in both lists scores 0.125 + 0.125, same as rank 1 in one.
        let lex = vec![hit("z", SourceKind::Text), hit("l2", SourceKind::Text), hit("x", SourceKind::Text)];
        let vec = vec![hit("y", SourceKind::Vector), hit("v2", SourceKind::Vector), hit("x", SourceKind::Vector)];
        let fused = weighted_rrf(&lex, &vec, FusionWeights::new(0.5, 0.5).unwrap(), 1.0);
        assert_eq!(texts(&fused), vec!["x", "y", "z", "v2", "l2"]);
    }

    #[test]
    fn duplicate_within_one_list_counts_once() {
        let lex = vec![hit("a", SourceKind::Text), hit("a", SourceKind::Text), hit("b", SourceKind::Text)];
        let fused = weighted_rrf(&lex, &[], FusionWeights::new(1.0, 0.0).unwrap(), 60.0);
        assert_eq!(texts(&fused), vec!["a", "b"]);
        assert!((fused[1].score - 1.0 / 62.0).abs() < 1e-6);
    }

    #[test]
    fn empty_inputs_fuse_to_empty() {
        assert!(weighted_rrf(&[], &[], FusionWeights::default(), 60.0).is_empty());
    }
}
