//! Markup helpers: escaping, a splice-aware inner-HTML serializer, and non-BMP escaping.

use crate::scraper::error::ScraperError;
use scraper::{ElementRef, Node};
use std::borrow::Cow;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// Text to insert immediately before and after an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub before: String,
    pub after: String,
}

/// Serialize the children of `element` as HTML.
///
/// `splice` is called for every descendant element in document order; when it
/// returns a [`Splice`] the text is emitted around that element's markup. Comments
/// and processing instructions are dropped.
pub fn inner_html_with<F>(element: ElementRef<'_>, splice: &mut F) -> Result<String, ScraperError>
where
    F: FnMut(ElementRef<'_>) -> Result<Option<Splice>, ScraperError>,
{
    let mut out = String::new();
    render_children(element, &mut out, splice)?;
    Ok(out)
}

fn render_children<F>(
    element: ElementRef<'_>,
    out: &mut String,
    splice: &mut F,
) -> Result<(), ScraperError>
where
    F: FnMut(ElementRef<'_>) -> Result<Option<Splice>, ScraperError>,
{
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    render_element(child_element, out, splice)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn render_element<F>(
    element: ElementRef<'_>,
    out: &mut String,
    splice: &mut F,
) -> Result<(), ScraperError>
where
    F: FnMut(ElementRef<'_>) -> Result<Option<Splice>, ScraperError>,
{
    let around = splice(element)?;
    if let Some(s) = &around {
        out.push_str(&escape_text(&s.before));
    }

    let value = element.value();
    let name = value.name();
    out.push('<');
    out.push_str(name);
    for (attr, attr_value) in value.attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&escape_attr(attr_value));
        out.push('"');
    }
    out.push('>');
    if !VOID_ELEMENTS.contains(&name) {
        render_children(element, out, splice)?;
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }

    if let Some(s) = &around {
        out.push_str(&escape_text(&s.after));
    }
    Ok(())
}

/// Replace every code point above U+FFFF with a decimal character reference (`&#128512;`).
pub fn escape_non_bmp(text: &str) -> Cow<'_, str> {
    if text.chars().all(|c| (c as u32) <= 0xFFFF) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        let code = c as u32;
        if code > 0xFFFF {
            out.push_str(&format!("&#{};", code));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}
