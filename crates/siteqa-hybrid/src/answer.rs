use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use siteqa_core::traits::Generator;
use siteqa_core::{Result, RetrievedPassage, Stage};

use crate::orchestrator::Retriever;
use crate::stage::with_timeout;

/// Reply used when retrieval finds nothing. The generator is not called.
pub const NO_ANSWER: &str = "Sorry, I could not find an answer to your question in the available materials.";

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub passages: Vec<RetrievedPassage>,
}

/// Grounded answer synthesis on top of [`Retriever`].
pub struct AnswerService {
    retriever: Arc<Retriever>,
    generator: Arc<dyn Generator>,
    timeout: Duration,
}

impl AnswerService {
    pub fn new(retriever: Arc<Retriever>, generator: Arc<dyn Generator>, timeout: Duration) -> Self { Self { retriever, generator, timeout } }

    pub fn retriever(&self) -> &Retriever { &self.retriever }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let passages = self.retriever.retrieve(question).await?;
        if passages.is_empty() {
            info!(question, "no passages; answering with the fallback reply");
            return Ok(Answer { text: NO_ANSWER.to_string(), passages });
        }
        let prompt = build_answer_prompt(question, &passages);
        let text = with_timeout(Stage::Generation, self.timeout, self.generator.generate(&prompt)).await?;
        Ok(Answer { text: text.trim().to_string(), passages })
    }
}

pub fn build_answer_prompt(question: &str, passages: &[RetrievedPassage]) -> String {
    let mut context = String::new();
    for (i, p) in passages.iter().enumerate() {
        let _ = writeln!(context, "[{}] Source: {} | Section: {}\n{}\n", i + 1, p.source, p.section_path, p.text);
    }
    format!(
        "You are a polite and precise assistant for a university faculty website.\n\
         Answer the question using ONLY the context below. Do not use outside knowledge.\n\
         If the context does not contain the answer, reply exactly: \"{NO_ANSWER}\"\n\
         Combine facts from several fragments when needed. Use full names and positions as written.\n\
         Use Markdown bullet lists for enumerations. Answer in the language of the question.\n\
         ---\n\
         CONTEXT:\n\
         {context}\
         ---\n\
         QUESTION:\n\
         {question}\n\
         ---\n\
         ANSWER:\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_sources_sections_and_question() {
        let passages = vec![RetrievedPassage {
            id: "x".into(),
            text: "Founded 1970".into(),
            source: "https://example.org/history".into(),
            section_path: "Faculty > History".into(),
            score: 0.9,
        }];
        let p = build_answer_prompt("When was it founded?", &passages);
        assert!(p.contains("[1] Source: https://example.org/history | Section: Faculty > History\nFounded 1970"));
        assert!(p.contains("QUESTION:\nWhen was it founded?"));
        assert!(p.contains(NO_ANSWER));
    }
}
