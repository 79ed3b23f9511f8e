//! Pure HTML -> [`Article`] conversion for Wikipedia pages.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use wq_core::{Article, Error, Result};

pub const FALLBACK_TITLE: &str = "Unknown Article Title";

/// Headings after which nothing belongs to the article body.
pub const STOP_SECTIONS: [&str; 5] = [
    "See also",
    "References",
    "External links",
    "Notes",
    "Further reading",
];

/// The summary stops after the paragraph that pushes it past this many words.
pub const SUMMARY_WORD_LIMIT: usize = 200;

lazy_static! {
    static ref TITLE_SELECTOR: Selector = Selector::parse("h1#firstHeading").unwrap();
    static ref PARSER_OUTPUT_SELECTOR: Selector =
        Selector::parse("#mw-content-text > .mw-parser-output").unwrap();
    static ref CONTENT_SELECTOR: Selector = Selector::parse("#mw-content-text").unwrap();
    static ref CITATION_RE: Regex = Regex::new(r"\s*\[\d+\]").unwrap();
}

/// One top-level piece of the content container, in document order.
#[derive(Debug, Clone, PartialEq)]
enum Block {
    Heading(String),
    Text(String),
    Other,
}

/// Remove `[12]`-style citation markers and trim.
pub fn clean_text(text: &str) -> String {
    CITATION_RE.replace_all(text, "").trim().to_string()
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

fn bare_heading_title(text: &str) -> String {
    text.split('[').next().unwrap_or_default().trim().to_string()
}

fn child_elements<'a>(element: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

fn is_section_heading(name: &str) -> bool {
    matches!(name, "h2" | "h3")
}

fn to_blocks(element: ElementRef) -> Vec<Block> {
    let value = element.value();
    let name = value.name();

    if is_section_heading(name) {
        return vec![Block::Heading(bare_heading_title(&element_text(&element)))];
    }

    // <div class="mw-heading mw-heading2"><h2>History</h2><span>[edit]</span></div>
    if name == "div" && value.classes().any(|class| class == "mw-heading") {
        return child_elements(&element)
            .find(|child| is_section_heading(child.value().name()))
            .map(|heading| vec![Block::Heading(bare_heading_title(&element_text(&heading)))])
            .unwrap_or_else(|| vec![Block::Other]);
    }

    if name == "p" || name == "li" || value.id() == Some("firstHeading") {
        return vec![Block::Text(clean_text(&element_text(&element)))];
    }

    if name == "ul" || name == "ol" {
        return child_elements(&element)
            .filter(|child| child.value().name() == "li")
            .map(|item| Block::Text(clean_text(&element_text(&item))))
            .collect();
    }

    vec![Block::Other]
}

fn find_title(document: &Html) -> String {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|heading| element_text(&heading).trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

fn find_content(document: &Html) -> Option<ElementRef<'_>> {
    document
        .select(&PARSER_OUTPUT_SELECTOR)
        .next()
        .or_else(|| document.select(&CONTENT_SELECTOR).next())
}

fn build_summary(content: &ElementRef) -> String {
    let mut paragraphs = Vec::new();
    let mut words = 0;

    for paragraph in child_elements(content).filter(|child| child.value().name() == "p") {
        let text = clean_text(&element_text(&paragraph));
        if text.is_empty() {
            continue;
        }
        words += text.split_whitespace().count();
        paragraphs.push(text);
        if words > SUMMARY_WORD_LIMIT {
            break;
        }
    }

    paragraphs.join("\n")
}

/// Split the blocks into section titles and body paragraphs, stopping at the
/// first stop-set heading.
fn walk_blocks(blocks: Vec<Block>) -> (Vec<String>, Vec<String>) {
    let mut sections = Vec::new();
    let mut body = Vec::new();

    for block in blocks {
        match block {
            Block::Heading(title) => {
                if STOP_SECTIONS.contains(&title.as_str()) {
                    break;
                }
                if !title.is_empty() {
                    sections.push(title);
                }
            }
            Block::Text(text) if !text.is_empty() => body.push(text),
            Block::Text(_) | Block::Other => {}
        }
    }

    (sections, body)
}

/// Parse a fetched Wikipedia page. Fails only when no body text survives.
pub fn parse_article(url: &str, html: &str) -> Result<Article> {
    let document = Html::parse_document(html);
    let title = find_title(&document);

    let content = find_content(&document).ok_or_else(|| {
        Error::Extraction(format!("No main content container found in {}", url))
    })?;

    let summary = build_summary(&content);
    let blocks: Vec<Block> = child_elements(&content).flat_map(to_blocks).collect();
    let (sections, body) = walk_blocks(blocks);

    if body.is_empty() {
        return Err(Error::Extraction(format!(
            "Could not extract meaningful content from {}",
            url
        )));
    }

    Ok(Article {
        url: url.to_string(),
        title,
        summary,
        sections,
        body_text: body.join("\n\n"),
    })
}
