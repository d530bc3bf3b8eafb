use super::{Chunker, SourceDocument};
use crate::types::Chunk;

/// Paragraph chunker for pre-extracted text. Paragraphs over `max_words`
/// are cut into overlapping word windows.
#[derive(Debug, Clone)]
pub struct PlainTextChunker {
    max_words: usize,
    overlap_percent: f32,
}

impl Default for PlainTextChunker {
    fn default() -> Self { Self { max_words: 300, overlap_percent: 0.2 } }
}

impl PlainTextChunker {
    pub fn new(max_words: usize, overlap_percent: f32) -> Self { Self { max_words: max_words.max(1), overlap_percent } }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let overlap_words = ((self.max_words as f32 * self.overlap_percent) as usize).min(self.max_words - 1);
        let mut out = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.max_words).min(words.len());
            out.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start = end - overlap_words;
        }
        out
    }
}

impl Chunker for PlainTextChunker {
    fn name(&self) -> &'static str { "plain_text" }

    fn extensions(&self) -> &'static [&'static str] { &["txt"] }

    fn chunk(&self, doc: &SourceDocument) -> Vec<Chunk> {
        let normalized = doc.content.replace("\r\n", "\n");
        let mut chunks = Vec::new();
        for paragraph in normalized.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() { continue; }
            if paragraph.split_whitespace().count() <= self.max_words {
                chunks.push(Chunk::new(doc.source.clone(), paragraph, "", ""));
            } else {
                for window in self.split_paragraph_with_overlap(paragraph) {
                    chunks.push(Chunk::new(doc.source.clone(), window, "", ""));
                }
            }
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> SourceDocument { SourceDocument { source: "a.txt".into(), content: content.into() } }

    #[test]
    fn one_chunk_per_paragraph() {
        let chunks = PlainTextChunker::default().chunk(&doc("Dean is Ivanov\n\n\nFounded 1970\r\n\r\nAdmissions open"));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Dean is Ivanov", "Founded 1970", "Admissions open"]);
    }

    #[test]
    fn long_paragraph_windows_overlap() {
        let words: Vec<String> = (0..25).map(|i| format!("w{i}")).collect();
        let chunks = PlainTextChunker::new(10, 0.2).chunk(&doc(&words.join(" ")));
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].text.ends_with("w8 w9"));
        assert!(chunks[1].text.starts_with("w8 w9"));
        assert!(chunks[2].text.ends_with("w24"));
    }
}
