use super::{join_section_path, Chunker, SourceDocument};
use crate::types::Chunk;

const SPLIT_LEVELS: usize = 3;

/// Splits on ATX headings `#`, `##` and `###`. The heading lines themselves
/// are dropped from chunk text and kept in `section_path`. Deeper headings
/// stay inline as content.
#[derive(Debug, Default, Clone)]
pub struct MarkdownChunker;

impl MarkdownChunker {
    pub fn new() -> Self { Self }
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > SPLIT_LEVELS { return None; }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) { return None; }
    Some((level, rest.trim().trim_end_matches('#').trim()))
}

impl Chunker for MarkdownChunker {
    fn name(&self) -> &'static str { "markdown" }

    fn extensions(&self) -> &'static [&'static str] { &["md", "markdown"] }

    fn chunk(&self, doc: &SourceDocument) -> Vec<Chunk> {
        let mut stack: [String; SPLIT_LEVELS] = Default::default();
        let mut title = String::new();
        let mut sections: Vec<(String, Vec<&str>)> = Vec::new();
        let mut in_fence = false;

        for line in doc.content.lines() {
            let fence = line.trim_start().starts_with("```") || line.trim_start().starts_with("~~~");
            if fence { in_fence = !in_fence; }
            if !in_fence && !fence {
                if let Some((level, text)) = heading(line) {
                    if level == 1 && title.is_empty() { title = text.to_string(); }
                    stack[level - 1] = text.to_string();
                    for deeper in stack.iter_mut().skip(level) { deeper.clear(); }
                    continue;
                }
            }
            let path = join_section_path(&stack);
            match sections.last_mut() {
                Some((p, lines)) if *p == path => lines.push(line),
                _ => sections.push((path, vec![line])),
            }
        }

        sections
            .into_iter()
            .filter_map(|(path, lines)| {
                let text = lines.join("\n").trim().to_string();
                if text.is_empty() { None } else { Some(Chunk::new(doc.source.clone(), text, path, title.clone())) }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> SourceDocument { SourceDocument { source: "https://fpmi.example/about".into(), content: content.into() } }

    #[test]
    fn splits_on_headings_and_tracks_path() {
        let md = "# Faculty\nIntro text.\n## History\nFounded 1970.\n### Deans\nDean is Ivanov.\n## Admissions\nAdmissions open.\n";
        let chunks = MarkdownChunker::new().chunk(&doc(md));
        let got: Vec<(&str, &str)> = chunks.iter().map(|c| (c.section_path.as_str(), c.text.as_str())).collect();
        assert_eq!(
            got,
            vec![
                ("Faculty", "Intro text."),
                ("Faculty > History", "Founded 1970."),
                ("Faculty > History > Deans", "Dean is Ivanov."),
                ("Faculty > Admissions", "Admissions open."),
            ]
        );
        assert!(chunks.iter().all(|c| c.title == "Faculty"));
    }

    #[test]
    fn ignores_hashes_in_code_and_deep_headings() {
        let md = "## Build\n```\n# not a heading\n```\n#### Step one\nrun it\n";
        let chunks = MarkdownChunker::new().chunk(&doc(md));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("# not a heading"));
        assert!(chunks[0].text.contains("#### Step one"));
        assert_eq!(chunks[0].section_path, "Build");
    }

    #[test]
    fn hashtag_without_space_is_text() {
        assert!(heading("#rust").is_none());
        assert_eq!(heading("## Contacts ##"), Some((2, "Contacts")));
    }
}
