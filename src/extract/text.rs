//! HTML-to-text flattening shared by the extraction strategies.

use ego_tree::iter::Edge;
use scraper::ElementRef;
use scraper::node::{Element, Node};

/// Elements whose boundaries become line breaks.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "td",
    "th", "tr", "ul",
];

/// Elements that never render visible text.
const INVISIBLE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "canvas", "object", "head",
];

pub fn is_invisible(el: &Element) -> bool {
    INVISIBLE_TAGS.contains(&el.name())
}

/// Visible text under `root`, one line per block element.
///
/// Elements for which `skip` returns true are dropped with their subtree.
/// Whitespace inside a line is collapsed and empty lines are removed.
/// The tree is walked iteratively, so nesting depth is not bounded by the
/// call stack.
pub fn block_text<F>(root: ElementRef<'_>, skip: F) -> String
where
    F: Fn(&Element) -> bool,
{
    let mut raw = String::new();
    // Open edges seen inside a skipped subtree, including its own.
    let mut skipping = 0usize;
    for edge in root.traverse() {
        match edge {
            Edge::Open(node) => {
                if skipping > 0 {
                    skipping += 1;
                    continue;
                }
                if node.id() == root.id() {
                    continue;
                }
                match node.value() {
                    Node::Text(text) => raw.push_str(text),
                    Node::Element(el) if skip(el) => skipping = 1,
                    Node::Element(el) if is_block(el) => raw.push('\n'),
                    _ => {}
                }
            }
            Edge::Close(node) => {
                if skipping > 0 {
                    skipping -= 1;
                    continue;
                }
                if node.id() == root.id() {
                    continue;
                }
                if let Node::Element(el) = node.value() {
                    if is_block(el) {
                        raw.push('\n');
                    }
                }
            }
        }
    }
    normalize_lines(&raw)
}

fn is_block(el: &Element) -> bool {
    BLOCK_TAGS.contains(&el.name())
}

/// Deepest element nesting under `root`, counted without recursion.
pub fn max_depth(root: ElementRef<'_>) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    for edge in root.traverse() {
        match edge {
            Edge::Open(node) if node.value().is_element() => {
                depth += 1;
                max = max.max(depth);
            }
            Edge::Close(node) if node.value().is_element() => depth -= 1,
            _ => {}
        }
    }
    max
}

/// Collapse whitespace per line and drop blank lines.
pub fn normalize_lines(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
