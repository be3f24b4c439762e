//! Chapter text cleanup: drops junk tags and boilerplate paragraphs, emits `<p>` lines.

use crate::scraper::error::ScraperError;
use crate::scraper::markup::{escape_attr, escape_text};
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Node};

/// Tags whose whole subtree is dropped.
const BAD_TAGS: &[&str] = &[
    "audio", "button", "footer", "form", "header", "iframe", "input", "ins", "map", "nav",
    "noscript", "object", "script", "select", "source", "style", "textarea", "video",
];

/// Tags that start and end a paragraph.
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "li",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "td",
    "th",
    "tr",
    "ul",
];

/// One output line of cleaned content.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Text(String),
    Image { src: String, alt: String },
}

/// Shared cleanup for chapter bodies.
///
/// Paragraphs matching any bad-text pattern (case-insensitive) are removed whole.
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    bad_text: Vec<String>,
    blacklist: Option<Regex>,
}

impl Cleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add regex patterns to the bad-text set. Invalid patterns leave the cleaner unchanged.
    pub fn update_bad_text<I, S>(&mut self, patterns: I) -> Result<(), ScraperError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut bad_text = self.bad_text.clone();
        for pattern in patterns {
            let pattern = pattern.into();
            if !bad_text.contains(&pattern) {
                bad_text.push(pattern);
            }
        }
        let alternation = bad_text
            .iter()
            .map(|p| format!("(?:{})", p))
            .collect::<Vec<_>>()
            .join("|");
        let blacklist = if bad_text.is_empty() {
            None
        } else {
            Some(
                RegexBuilder::new(&alternation)
                    .case_insensitive(true)
                    .build()?,
            )
        };
        self.bad_text = bad_text;
        self.blacklist = blacklist;
        Ok(())
    }

    /// Current bad-text patterns in insertion order.
    pub fn bad_text(&self) -> &[String] {
        &self.bad_text
    }

    /// True when `text` matches any bad-text pattern.
    pub fn contains_bad_text(&self, text: &str) -> bool {
        self.blacklist
            .as_ref()
            .map(|re| re.is_match(text))
            .unwrap_or(false)
    }

    /// Clean an HTML fragment into `<p>...</p>` lines (and standalone `<img/>` lines).
    pub fn extract_contents(&self, markup: &str) -> String {
        let fragment = Html::parse_fragment(markup);
        let mut blocks = Vec::new();
        let mut line = String::new();
        collect_blocks(fragment.root_element(), &mut line, &mut blocks);
        flush_line(&mut line, &mut blocks);

        blocks
            .into_iter()
            .filter_map(|block| match block {
                Block::Text(text) if self.contains_bad_text(&text) => None,
                Block::Text(text) => Some(format!("<p>{}</p>", escape_text(&text))),
                Block::Image { src, alt } => Some(format!(
                    "<img src=\"{}\" alt=\"{}\"/>",
                    escape_attr(&src),
                    escape_attr(&alt)
                )),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn flush_line(line: &mut String, blocks: &mut Vec<Block>) {
    let text = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        blocks.push(Block::Text(text));
    }
    line.clear();
}

fn collect_blocks(element: ElementRef<'_>, line: &mut String, blocks: &mut Vec<Block>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => line.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if BAD_TAGS.contains(&name) {
                    continue;
                }
                match name {
                    "br" => flush_line(line, blocks),
                    "img" => {
                        if let Some(src) = el.attr("src").filter(|s| !s.trim().is_empty()) {
                            flush_line(line, blocks);
                            blocks.push(Block::Image {
                                src: src.trim().to_string(),
                                alt: el.attr("alt").unwrap_or_default().to_string(),
                            });
                        }
                    }
                    _ => {
                        let Some(child_element) = ElementRef::wrap(child) else {
                            continue;
                        };
                        let block = BLOCK_TAGS.contains(&name);
                        if block {
                            flush_line(line, blocks);
                        }
                        collect_blocks(child_element, line, blocks);
                        if block {
                            flush_line(line, blocks);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}
