use anyhow::anyhow;
use scraper::{ElementRef, Html, Selector};

use super::{join_section_path, normalize_ws, Chunker, SourceDocument};
use crate::types::Chunk;

const MAIN_CONTENT: &str = "#block-famcs-content, article, [role='main'], main";
const SKIPPED: &[&str] = &["script", "style", "nav", "footer", "header", "form", "aside", "iframe", "noscript"];
const BLOCKS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "ul", "ol", "table", "div", "section", "article"];
const PATH_DEPTH: usize = 4;

/// Walks the main content block in document order. Headings `h1..h4` feed
/// the section path; paragraphs, list items and leaf `div`s become chunks;
/// each table row becomes a `column: value` chunk.
pub struct HtmlChunker {
    min_chunk_chars: usize,
    main: Selector,
    title: Selector,
    body: Selector,
    row: Selector,
    cell: Selector,
}

impl HtmlChunker {
    pub fn new(min_chunk_chars: usize) -> anyhow::Result<Self> {
        let sel = |s: &str| Selector::parse(s).map_err(|e| anyhow!("invalid selector '{s}': {e}"));
        Ok(Self { min_chunk_chars, main: sel(MAIN_CONTENT)?, title: sel("title")?, body: sel("body")?, row: sel("tr")?, cell: sel("th, td")? })
    }

    fn table_rows(&self, table: ElementRef<'_>) -> Vec<String> {
        let mut header: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        for tr in table.select(&self.row) {
            let cells: Vec<(bool, String)> = tr.select(&self.cell).map(|c| (c.value().name() == "th", normalize_ws(&c.text().collect::<String>()))).collect();
            if cells.is_empty() { continue; }
            if header.is_empty() && cells.iter().all(|(is_th, _)| *is_th) {
                header = cells.into_iter().map(|(_, t)| t).collect();
                continue;
            }
            let line = if header.is_empty() {
                cells.into_iter().map(|(_, t)| t).filter(|t| !t.is_empty()).collect::<Vec<_>>().join(" | ")
            } else {
                cells
                    .into_iter()
                    .enumerate()
                    .filter(|(_, (_, t))| !t.is_empty())
                    .map(|(i, (_, t))| match header.get(i).filter(|h| !h.is_empty()) { Some(h) => format!("{h}: {t}"), None => t })
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            if !line.is_empty() { rows.push(line); }
        }
        rows
    }
}

fn name<'a>(el: &ElementRef<'a>) -> &'a str { el.value().name() }

/// True when some ancestor below `root` is skipped chrome or already a chunk.
fn covered(el: &ElementRef<'_>, root: &ElementRef<'_>) -> bool {
    for node in el.ancestors() {
        if node.id() == root.id() { break; }
        if let Some(a) = node.value().as_element() {
            let n = a.name();
            if SKIPPED.contains(&n) || matches!(n, "p" | "li" | "table") { return true; }
        }
    }
    false
}

fn is_leaf_div(el: &ElementRef<'_>) -> bool {
    !el.children().filter_map(ElementRef::wrap).any(|c| BLOCKS.contains(&name(&c)))
}

impl Chunker for HtmlChunker {
    fn name(&self) -> &'static str { "html" }

    fn extensions(&self) -> &'static [&'static str] { &["html", "htm"] }

    fn chunk(&self, doc: &SourceDocument) -> Vec<Chunk> {
        let page = Html::parse_document(&doc.content);
        let title = page.select(&self.title).next().map(|t| normalize_ws(&t.text().collect::<String>())).unwrap_or_default();
        let Some(root) = page.select(&self.main).next().or_else(|| page.select(&self.body).next()) else {
            return Vec::new();
        };

        let mut stack: [String; PATH_DEPTH] = Default::default();
        let mut chunks = Vec::new();
        let mut push = |text: String, stack: &[String]| {
            chunks.push(Chunk::new(doc.source.clone(), text, join_section_path(stack), title.clone()));
        };

        for el in root.descendants().filter_map(ElementRef::wrap) {
            let tag = name(&el);
            if SKIPPED.contains(&tag) || covered(&el, &root) { continue; }
            match tag {
                "h1" | "h2" | "h3" | "h4" => {
                    let level = usize::from(tag.as_bytes()[1] - b'0');
                    stack[level - 1] = normalize_ws(&el.text().collect::<String>());
                    for deeper in stack.iter_mut().skip(level) { deeper.clear(); }
                }
                "table" => {
                    for row in self.table_rows(el) { push(row, &stack); }
                }
                "p" | "li" => {
                    let text = normalize_ws(&el.text().collect::<String>());
                    if text.chars().count() >= self.min_chunk_chars { push(text, &stack); }
                }
                "div" if is_leaf_div(&el) => {
                    let text = normalize_ws(&el.text().collect::<String>());
                    if text.chars().count() >= self.min_chunk_chars { push(text, &stack); }
                }
                _ => {}
            }
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>FAMCS</title></head><body>
<nav><p>Home | About | Contacts and other navigation</p></nav>
<article>
  <h1>Faculty</h1>
  <h2>History</h2>
  <p>The faculty was founded in 1970 as a department of the university.</p>
  <p>Short.</p>
  <ul><li>First dean was Ivanov, who served for twenty years.</li></ul>
  <h2>Contacts</h2>
  <table>
    <tr><th>Role</th><th>Name</th></tr>
    <tr><td>Dean</td><td>Ivanov</td></tr>
  </table>
  <script>var x = "this script text is long enough to be a chunk";</script>
</article>
<footer><p>Copyright notice that is definitely long enough</p></footer>
</body></html>"#;

    fn chunks() -> Vec<Chunk> {
        HtmlChunker::new(30).unwrap().chunk(&SourceDocument { source: "https://fpmi.example/".into(), content: PAGE.into() })
    }

    #[test]
    fn extracts_paragraphs_lists_and_tables_under_headings() {
        let got: Vec<(String, String)> = chunks().into_iter().map(|c| (c.section_path, c.text)).collect();
        assert_eq!(
            got,
            vec![
                ("Faculty > History".to_string(), "The faculty was founded in 1970 as a department of the university.".to_string()),
                ("Faculty > History".to_string(), "First dean was Ivanov, who served for twenty years.".to_string()),
                ("Faculty > Contacts".to_string(), "Role: Dean; Name: Ivanov".to_string()),
            ]
        );
    }

    #[test]
    fn carries_page_title_and_skips_chrome() {
        let all = chunks();
        assert!(all.iter().all(|c| c.title == "FAMCS"));
        assert!(!all.iter().any(|c| c.text.contains("Copyright") || c.text.contains("script")));
    }

    #[test]
    fn falls_back_to_body_without_main_block() {
        let html = "<html><body><div>Admissions are open from June until the end of August.</div></body></html>";
        let out = HtmlChunker::new(10).unwrap().chunk(&SourceDocument { source: "s".into(), content: html.into() });
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].section_path, "");
    }
}
