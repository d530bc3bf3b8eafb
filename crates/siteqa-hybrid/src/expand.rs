//! Query expansion: paraphrases from a generator to widen recall.
//!
//! Best effort throughout. A generator error, a timeout or unusable output
//! all yield no paraphrases, and retrieval carries on with the original query.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use siteqa_core::traits::Generator;
use siteqa_core::Stage;

use crate::stage::with_timeout;

pub struct QueryExpander {
    generator: Arc<dyn Generator>,
    max: usize,
    timeout: Duration,
}

impl QueryExpander {
    pub fn new(generator: Arc<dyn Generator>, max: usize, timeout: Duration) -> Self { Self { generator, max, timeout } }

    /// At most `max` distinct, non-empty paraphrases of `query`.
    pub async fn expand(&self, query: &str) -> Vec<String> {
        if self.max == 0 { return vec![]; }
        let prompt = build_prompt(query, self.max);
        match with_timeout(Stage::Expansion, self.timeout, self.generator.generate(&prompt)).await {
            Ok(output) => {
                let paraphrases = parse_paraphrases(&output, self.max);
                debug!(query, ?paraphrases, "query expanded");
                paraphrases
            }
            Err(e) => {
                warn!(query, error = %e, "query expansion failed; searching with the original query only");
                vec![]
            }
        }
    }
}

/// Few-shot prompt asking for `n` one-per-line paraphrases.
pub fn build_prompt(query: &str, n: usize) -> String {
    format!(
        "You help users search the knowledge base of a university faculty website.\n\
         Write {n} alternative, semantically close versions of the user's question to improve search.\n\
         \n\
         Examples\n\
         Original: who was the first dean?\n\
         Versions:\n\
         who led the faculty when it was founded\n\
         who is considered the founding head of the faculty\n\
         name of the first dean of the faculty\n\
         \n\
         Original: why was the faculty created?\n\
         Versions:\n\
         what was the purpose of founding the faculty\n\
         mission and goals of the faculty\n\
         reasons the faculty was established\n\
         \n\
         Rules\n\
         - Exactly {n} versions.\n\
         - One version per line.\n\
         - No numbers, bullets, quotes or labels.\n\
         - Output only the questions, nothing else.\n\
         \n\
         Original: {query}\n\
         Versions:\n"
    )
}

/// Turns raw generator output into at most `max` paraphrases.
///
/// Lines are trimmed; list numbering, bullets and wrapping quotes are
/// stripped; empty lines, label lines ending in ':' and repeats are dropped.
pub fn parse_paraphrases(output: &str, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    output
        .lines()
        .map(clean_line)
        .filter(|l| !l.is_empty() && !l.ends_with(':'))
        .filter(|l| seen.insert(l.clone()))
        .take(max)
        .collect()
}

fn clean_line(line: &str) -> String {
    let mut l = line.trim();
    let digits = l.len() - l.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &l[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            l = stripped.trim_start();
        }
    }
    l = l.trim_start_matches(['-', '*', '•']).trim_start();
    l.trim_matches(|c: char| c == '"' || c == '\'' || c == '«' || c == '»').trim().to_string()
}

/// The set of queries sent to the hybrid retriever: the original first,
/// then each expansion not exactly equal to one already present.
pub fn fan_out_queries(query: &str, expansions: &[String]) -> Vec<String> {
    let mut out = vec![query.to_string()];
    for e in expansions {
        if !out.iter().any(|q| q == e) { out.push(e.clone()); }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_paraphrase_per_line() {
        let out = "\nwho led the faculty at its founding\n\n  who was the founding dean  \nfirst head of the faculty\nextra line\n";
        assert_eq!(
            parse_paraphrases(out, 3),
            vec!["who led the faculty at its founding", "who was the founding dean", "first head of the faculty"]
        );
    }

    #[test]
    fn strips_numbering_bullets_and_quotes() {
        let out = "Versions:\n1. \"first dean\"\n2) founding head\n- original leader\n* «first director»";
        assert_eq!(parse_paraphrases(out, 4), vec!["first dean", "founding head", "original leader", "first director"]);
    }

    #[test]
    fn keeps_leading_numbers_that_are_content() {
        assert_eq!(parse_paraphrases("1970 founding year", 3), vec!["1970 founding year"]);
    }

    #[test]
    fn blank_or_garbage_output_yields_nothing() {
        assert!(parse_paraphrases("", 3).is_empty());
        assert!(parse_paraphrases("\n  \n- \n", 3).is_empty());
    }

    #[test]
    fn fan_out_keeps_original_first_and_drops_exact_repeats() {
        let expansions = vec!["who founded it".to_string(), "who founded the faculty".to_string(), "who founded it".to_string()];
        assert_eq!(fan_out_queries("who founded the faculty", &expansions), vec!["who founded the faculty", "who founded it"]);
        assert_eq!(fan_out_queries("q", &[]), vec!["q"]);
    }

    #[test]
    fn prompt_mentions_count_and_query() {
        let p = build_prompt("admission rules", 3);
        assert!(p.contains("Exactly 3 versions"));
        assert!(p.trim_end().ends_with("Original: admission rules\nVersions:"));
    }
}
