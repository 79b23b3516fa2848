//! Readable-text extraction.
//!
//! A readability-style heuristic over the parsed DOM: paragraph-like
//! elements are scored by length and comma count, the score flows to their
//! parent and (halved) grandparent, and the best container after a
//! link-density penalty wins. Navigation, forms, hidden nodes and elements
//! whose class/id looks like chrome are ignored. When nothing qualifies the
//! whole `<body>` text is used instead.
//!
//! Output is whitespace-normalized so reflowed markup hashes the same.

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use crate::error::{ExtractionError, ExtractionResult};

/// Shortest paragraph that contributes to scoring.
const MIN_PARAGRAPH_CHARS: usize = 25;

/// Never part of visible text.
const EXCLUDED_TAGS: [&str; 9] = [
    "script", "style", "noscript", "template", "svg", "iframe", "canvas", "object", "embed",
];

/// Page furniture rather than content.
const BOILERPLATE_TAGS: [&str; 7] = ["nav", "aside", "footer", "form", "button", "select", "dialog"];

/// Elements that break text flow; a space is emitted around them.
const BLOCK_TAGS: [&str; 33] = [
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul", "body",
];

/// Children that stop a `<div>` from being scored as a paragraph.
const DIV_BLOCK_CHILDREN: [&str; 13] = [
    "div", "p", "table", "ul", "ol", "pre", "blockquote", "section", "article", "dl", "figure",
    "form", "h2",
];

/// class/id fragments marking chrome (comments, share bars, ads...).
const UNLIKELY_HINTS: [&str; 22] = [
    "-ad-", "banner", "breadcrumbs", "combx", "comment", "community", "cookie", "disqus", "extra",
    "gdpr", "legends", "menu", "popup", "related", "remark", "replies", "rss", "shoutbox",
    "sidebar", "skyscraper", "social", "sponsor",
];

/// class/id fragments that rescue an element from `UNLIKELY_HINTS`.
const MAYBE_HINTS: [&str; 6] = ["and", "article", "body", "column", "content", "main"];

const POSITIVE_HINTS: [&str; 11] = [
    "article", "body", "content", "entry", "hentry", "main", "page", "post", "text", "blog",
    "story",
];

const NEGATIVE_HINTS: [&str; 14] = [
    "hidden", "banner", "comment", "contact", "footer", "masthead", "meta", "outbrain", "promo",
    "related", "share", "sidebar", "sponsor", "widget",
];

/// Readable content of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadableText {
    /// Normalized main-content text
    pub text: String,

    /// `<title>`, else first `<h1>`, else the host name
    pub title: String,
}

/// Extract normalized readable text from `html`.
///
/// `base_url` resolves relative links while measuring link density and
/// supplies the fallback title.
pub fn extract_readable_text(html: &str, base_url: &Url) -> ExtractionResult<ReadableText> {
    let document = Html::parse_document(html);
    let title = document_title(&document, base_url);

    if let Some(text) = main_content_text(&document, base_url) {
        debug!(url = %base_url, chars = text.len(), "Readable content isolated");
        return Ok(ReadableText { text, title });
    }

    let text = body_text(&document);
    if text.is_empty() {
        return Err(ExtractionError::NoReadableText);
    }

    debug!(url = %base_url, chars = text.len(), "Fell back to body text");
    Ok(ReadableText { text, title })
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Elements scored as paragraphs.
const PARAGRAPH_TAGS: [&str; 5] = ["p", "pre", "td", "blockquote", "div"];

fn main_content_text(document: &Html, base_url: &Url) -> Option<String> {
    let measured = measure(document.root_element(), base_url);
    let mut candidates = Candidates::default();

    for &element in &measured.elements {
        let name = element.value().name();
        if !PARAGRAPH_TAGS.contains(&name) || (name == "div" && has_block_children(element)) {
            continue;
        }
        let Some(stats) = measured.stats.get(&element.id()) else {
            continue;
        };
        let length = stats.len();
        if length < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let score = 1.0 + stats.commas as f64 + (length / 100).min(3) as f64;

        let mut ancestors = element.ancestors().filter_map(ElementRef::wrap);
        if let Some(parent) = ancestors.next() {
            candidates.add(parent, score);
            if let Some(grandparent) = ancestors.next() {
                candidates.add(grandparent, score / 2.0);
            }
        }
    }

    let best = candidates
        .list
        .iter()
        .map(|c| {
            let density = measured
                .stats
                .get(&c.element.id())
                .map(TextStats::link_density)
                .unwrap_or(0.0);
            (c.element, c.score * (1.0 - density))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    debug!(
        tag = best.0.value().name(),
        score = best.1,
        candidates = candidates.list.len(),
        "Top content candidate"
    );

    let text = normalize_whitespace(&visible_text(best.0, true));
    (!text.is_empty()).then_some(text)
}

struct Candidate<'a> {
    element: ElementRef<'a>,
    score: f64,
}

/// Scored containers in first-seen order.
#[derive(Default)]
struct Candidates<'a> {
    list: Vec<Candidate<'a>>,
    index: HashMap<NodeId, usize>,
}

impl<'a> Candidates<'a> {
    fn add(&mut self, element: ElementRef<'a>, score: f64) {
        let list = &mut self.list;
        let slot = *self.index.entry(element.id()).or_insert_with(|| {
            list.push(Candidate {
                element,
                score: initial_score(element),
            });
            list.len() - 1
        });
        self.list[slot].score += score;
    }
}

/// Measurements of a subtree's visible text, as it would read after
/// [`normalize_whitespace`].
///
/// Concatenating two subtrees' stats with [`TextStats::then`] gives the
/// stats of their joined text, so every element is measured from its
/// children without rereading them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TextStats {
    /// Non-whitespace characters
    chars: usize,
    words: usize,
    commas: usize,
    leading_space: bool,
    trailing_space: bool,
    /// Link text length, same-document links weighted down
    linked: f64,
}

impl TextStats {
    const SPACE: TextStats = TextStats {
        chars: 0,
        words: 0,
        commas: 0,
        leading_space: true,
        trailing_space: true,
        linked: 0.0,
    };

    fn of_text(text: &str) -> Self {
        Self {
            chars: text.chars().filter(|c| !c.is_whitespace()).count(),
            words: text.split_whitespace().count(),
            commas: text.matches(',').count(),
            leading_space: text.starts_with(char::is_whitespace),
            trailing_space: text.ends_with(char::is_whitespace),
            linked: 0.0,
        }
    }

    fn is_empty(&self) -> bool {
        self.words == 0 && !self.leading_space
    }

    fn then(self, next: Self) -> Self {
        if self.is_empty() {
            return Self {
                linked: self.linked + next.linked,
                ..next
            };
        }
        if next.is_empty() {
            return Self {
                linked: self.linked + next.linked,
                ..self
            };
        }

        let joined =
            self.words > 0 && next.words > 0 && !self.trailing_space && !next.leading_space;
        Self {
            chars: self.chars + next.chars,
            words: self.words + next.words - usize::from(joined),
            commas: self.commas + next.commas,
            leading_space: self.leading_space,
            trailing_space: next.trailing_space,
            linked: self.linked + next.linked,
        }
    }

    /// Characters in the normalized text.
    fn len(&self) -> usize {
        self.chars + self.words.saturating_sub(1)
    }

    fn link_density(&self) -> f64 {
        match self.len() {
            0 => 0.0,
            total => (self.linked / total as f64).min(1.0),
        }
    }
}

/// Every element outside boilerplate, with its text measured.
struct Measured<'a> {
    /// Document order
    elements: Vec<ElementRef<'a>>,
    stats: HashMap<NodeId, TextStats>,
}

/// Walk the tree once, skipping boilerplate subtrees, and measure each
/// element on the way back up.
fn measure<'a>(root: ElementRef<'a>, base_url: &Url) -> Measured<'a> {
    enum Visit<'a> {
        Enter(ElementRef<'a>),
        Exit(ElementRef<'a>),
    }

    let mut elements = Vec::new();
    let mut stats: HashMap<NodeId, TextStats> = HashMap::new();
    let mut stack = vec![Visit::Enter(root)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(element) => {
                if is_boilerplate(element) {
                    continue;
                }
                elements.push(element);
                stack.push(Visit::Exit(element));
                stack.extend(
                    element
                        .children()
                        .rev()
                        .filter_map(ElementRef::wrap)
                        .map(Visit::Enter),
                );
            }
            Visit::Exit(element) => {
                let mut total = element.children().fold(TextStats::default(), |acc, child| {
                    let next = match child.value().as_text() {
                        Some(text) => TextStats::of_text(text),
                        None => stats.get(&child.id()).copied().unwrap_or_default(),
                    };
                    acc.then(next)
                });

                let name = element.value().name();
                if name == "a" {
                    let weight = if is_same_document_link(element, base_url) {
                        0.3
                    } else {
                        1.0
                    };
                    total.linked += total.len() as f64 * weight;
                }
                if BLOCK_TAGS.contains(&name) {
                    total = TextStats::SPACE.then(total).then(TextStats::SPACE);
                }
                stats.insert(element.id(), total);
            }
        }
    }

    Measured { elements, stats }
}

fn initial_score(element: ElementRef<'_>) -> f64 {
    let tag_score = match element.value().name() {
        "article" | "main" => 10.0,
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    tag_score + class_weight(element)
}

fn class_weight(element: ElementRef<'_>) -> f64 {
    let hints = class_and_id(element);
    if hints.is_empty() {
        return 0.0;
    }
    let mut weight = 0.0;
    if POSITIVE_HINTS.iter().any(|h| hints.contains(h)) {
        weight += 25.0;
    }
    if NEGATIVE_HINTS.iter().any(|h| hints.contains(h)) {
        weight -= 25.0;
    }
    weight
}

fn class_and_id(element: ElementRef<'_>) -> String {
    let value = element.value();
    format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.id().unwrap_or_default()
    )
    .trim()
    .to_ascii_lowercase()
}

fn has_block_children(element: ElementRef<'_>) -> bool {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .any(|child| DIV_BLOCK_CHILDREN.contains(&child.value().name()))
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    value
        .attr("style")
        .map(|style| {
            let style: String = style.chars().filter(|c| !c.is_whitespace()).collect();
            let style = style.to_ascii_lowercase();
            style.contains("display:none") || style.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

fn is_unlikely(element: ElementRef<'_>) -> bool {
    if matches!(element.value().name(), "html" | "body" | "article" | "main" | "a") {
        return false;
    }
    let hints = class_and_id(element);
    !hints.is_empty()
        && UNLIKELY_HINTS.iter().any(|h| hints.contains(h))
        && !MAYBE_HINTS.iter().any(|h| hints.contains(h))
}

/// Whether an element is dropped from readable text.
fn is_boilerplate(element: ElementRef<'_>) -> bool {
    let name = element.value().name();
    EXCLUDED_TAGS.contains(&name)
        || BOILERPLATE_TAGS.contains(&name)
        || is_hidden(element)
        || is_unlikely(element)
}

/// In-page anchors (`#section`, or a link back to the page itself).
fn is_same_document_link(anchor: ElementRef<'_>, base_url: &Url) -> bool {
    let Some(href) = anchor.value().attr("href") else {
        return false;
    };
    let Ok(mut target) = base_url.join(href) else {
        return false;
    };
    let mut base = base_url.clone();
    target.set_fragment(None);
    base.set_fragment(None);
    target == base
}

enum Frame<N> {
    Enter(N),
    /// Leaving a block element
    Close,
}

/// Concatenated text under `root`, walking the tree with an explicit stack.
///
/// With `skip_boilerplate` the readability filters apply; without it only
/// never-visible elements (scripts, styles...) are skipped.
fn visible_text(root: ElementRef<'_>, skip_boilerplate: bool) -> String {
    let mut out = String::new();
    let mut stack = vec![Frame::Enter(*root)];

    while let Some(frame) = stack.pop() {
        let node = match frame {
            Frame::Enter(node) => node,
            Frame::Close => {
                out.push(' ');
                continue;
            }
        };

        if let Some(text) = node.value().as_text() {
            out.push_str(text);
            continue;
        }

        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let name = element.value().name();
        let skipped = if skip_boilerplate {
            is_boilerplate(element)
        } else {
            EXCLUDED_TAGS.contains(&name)
        };
        if skipped && element.id() != root.id() {
            continue;
        }

        if BLOCK_TAGS.contains(&name) {
            out.push(' ');
            stack.push(Frame::Close);
        }
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev().map(Frame::Enter));
    }

    out
}

fn body_text(document: &Html) -> String {
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());
    normalize_whitespace(&visible_text(body, false))
}

fn document_title(document: &Html, base_url: &Url) -> String {
    ["title", "h1"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .map(|el| normalize_whitespace(&el.text().collect::<String>()))
                .find(|t| !t.is_empty())
        })
        .unwrap_or_else(|| base_url.host_str().unwrap_or_default().to_string())
}
