//! Batch runs over a QA test set, written to an explicit report sink.

use std::io::Write;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use siteqa_core::{Error, Result, RetrievedPassage};

use crate::answer::AnswerService;
use crate::orchestrator::Retriever;

const RULE: &str = "==================================================";
const DOC_RULE: &str = "----------------------------------------";

#[derive(Debug, Clone, Deserialize)]
pub struct QaItem {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvalSummary {
    pub questions: usize,
    /// Questions with no passages, or with the fallback answer.
    pub empty: usize,
}

/// Reads a YAML list of `{question, answer}` items.
pub fn load_test_set(path: &Path) -> Result<Vec<QaItem>> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::NotFound(format!("QA test set {}: {e}", path.display())))?;
    let items: Vec<QaItem> = serde_yaml::from_str(&raw).map_err(|e| Error::InvalidConfig(format!("QA test set {}: {e}", path.display())))?;
    info!(items = items.len(), path = %path.display(), "QA test set loaded");
    Ok(items)
}

fn io(e: std::io::Error) -> Error { Error::Other(e.into()) }

fn questions(items: &[QaItem]) -> impl Iterator<Item = (usize, &str)> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| item.question.as_deref().map(str::trim).filter(|q| !q.is_empty()).map(|q| (i + 1, q)))
}

pub fn write_retrieval_result(sink: &mut dyn Write, index: usize, question: &str, passages: &[RetrievedPassage]) -> std::io::Result<()> {
    writeln!(sink, "{RULE}\nQUESTION #{index}: {question}\n{RULE}")?;
    if passages.is_empty() {
        return writeln!(sink, ">>> No relevant passages found.\n");
    }
    writeln!(sink, ">>> Retrieved passages:\n")?;
    for (j, p) in passages.iter().enumerate() {
        writeln!(sink, "--- Passage #{} (Source: {}, Section: {}, Score: {:.4}) ---", j + 1, p.source, p.section_path, p.score)?;
        writeln!(sink, "{}\n{DOC_RULE}\n", p.text)?;
    }
    Ok(())
}

/// Retrieves passages for every question and writes them to `sink`.
pub async fn evaluate_retrieval(retriever: &Retriever, items: &[QaItem], sink: &mut dyn Write) -> Result<EvalSummary> {
    let mut summary = EvalSummary::default();
    for (index, question) in questions(items) {
        let passages = retriever.retrieve(question).await?;
        write_retrieval_result(sink, index, question, &passages).map_err(io)?;
        summary.questions += 1;
        if passages.is_empty() { summary.empty += 1; }
        info!(index, "question evaluated");
    }
    sink.flush().map_err(io)?;
    Ok(summary)
}

/// Generates an answer for every question and writes it next to the
/// expected one.
pub async fn evaluate_answers(service: &AnswerService, items: &[QaItem], sink: &mut dyn Write) -> Result<EvalSummary> {
    let mut summary = EvalSummary::default();
    for (index, question) in questions(items) {
        let answer = service.answer(question).await?;
        let expected = items[index - 1].answer.as_deref().unwrap_or("-");
        writeln!(sink, "{RULE}\nQUESTION #{index}\nQuestion: {question}\nExpected: {expected}\nBot answer: {}\n{RULE}\n", answer.text).map_err(io)?;
        summary.questions += 1;
        if answer.passages.is_empty() { summary.empty += 1; }
        info!(index, passages = answer.passages.len(), "question answered");
    }
    sink.flush().map_err(io)?;
    Ok(summary)
}
