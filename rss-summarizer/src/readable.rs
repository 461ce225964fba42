//! Main-content isolation for arbitrary article pages.
//!
//! Finds the region of a page that holds the article body, drops page chrome
//! (navigation, sidebars, ads, share widgets) and converts what is left to
//! Markdown so headings, lists and links survive.

use htmd::HtmlToMarkdown;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// Containers that conventionally wrap the article body, most specific first.
const MAIN_SELECTORS: &[&str] = &[
    "[itemprop='articleBody']",
    "article",
    "main",
    "[role='main']",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".article-content",
    "#content",
    ".content",
];

/// Page chrome removed from inside the chosen container.
const BOILERPLATE_SELECTORS: &[&str] = &[
    "nav",
    "header",
    "footer",
    "aside",
    "form",
    ".nav",
    ".navbar",
    ".menu",
    ".sidebar",
    ".advertisement",
    ".ads",
    ".ad",
    ".share",
    ".social",
    ".related",
    ".comments",
    "#comments",
];

const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "nav", "aside", "footer", "form", "button", "svg",
];

/// Minimum amount of text a region needs to count as the article.
const MIN_CONTENT_CHARS: usize = 140;

/// Paragraphs shorter than this do not contribute to a container's score.
const MIN_PARAGRAPH_CHARS: usize = 25;

/// Isolate the readable main content of `html` as Markdown.
///
/// Returns `None` when no region holds enough text to be an article.
pub fn extract_readable(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let container = find_main_content(&document)?;
    let cleaned = remove_boilerplate(&container.html());
    let markdown = html_to_markdown(&cleaned)?;

    if markdown.chars().filter(|c| !c.is_whitespace()).count() == 0 {
        return None;
    }

    Some(markdown)
}

fn text_len(element: ElementRef<'_>) -> usize {
    element
        .text()
        .map(|t| t.trim().chars().count())
        .sum()
}

fn find_main_content(document: &Html) -> Option<ElementRef<'_>> {
    for selector_str in MAIN_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            let found = document
                .select(&selector)
                .find(|el| text_len(*el) >= MIN_CONTENT_CHARS);
            if found.is_some() {
                return found;
            }
        }
    }

    best_scoring_container(document)
}

/// Score each element by the paragraph text it directly or nearly contains
/// and return the densest one.
fn best_scoring_container(document: &Html) -> Option<ElementRef<'_>> {
    let paragraphs = Selector::parse("p").ok()?;
    let mut scores: HashMap<_, (ElementRef<'_>, usize)> = HashMap::new();

    for paragraph in document.select(&paragraphs) {
        let len = text_len(paragraph);
        if len < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let parent = paragraph.parent().and_then(ElementRef::wrap);
        if let Some(parent) = parent {
            scores.entry(parent.id()).or_insert((parent, 0)).1 += len;

            if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
                scores.entry(grandparent.id()).or_insert((grandparent, 0)).1 += len / 2;
            }
        }
    }

    scores
        .into_values()
        .filter(|(el, _)| !matches!(el.value().name(), "html" | "body"))
        .filter(|(_, score)| *score >= MIN_CONTENT_CHARS)
        .max_by_key(|(_, score)| *score)
        .map(|(el, _)| el)
}

fn remove_boilerplate(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut result = html.to_string();

    for selector_str in BOILERPLATE_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            for element in fragment.select(&selector) {
                result = result.replace(&element.html(), "");
            }
        }
    }

    result
}

fn html_to_markdown(html: &str) -> Option<String> {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();
    let markdown = converter.convert(html).ok()?;
    Some(collapse_blank_lines(&markdown))
}

fn collapse_blank_lines(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;

    for line in markdown.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out.trim().to_string()
}
