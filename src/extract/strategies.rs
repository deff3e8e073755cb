//! Article text extraction strategies.
//!
//! Publishers render articles with very different markup, so no single
//! heuristic works everywhere. Each strategy implements
//! [`ExtractionStrategy`] and the body extractor tries them in order.
//!
//! | Strategy | Tag | Method |
//! |----------|-----|--------|
//! | [`BoilerplateStrategy`] | `primary` | Known article containers, else densest paragraph block |
//! | [`ReadabilityStrategy`] | `secondary` | `readability` main-content isolation |
//! | [`body_fallback`] | `fallback_body` | All visible `<body>` text |

use super::text::{block_text, is_invisible, max_depth};
use once_cell::sync::Lazy;
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;
use url::Url;

/// Trait for a single extraction heuristic.
pub trait ExtractionStrategy: Send + Sync {
    /// Tag recorded when this strategy's text is accepted.
    fn name(&self) -> &'static str;

    /// Extract main text from `html`, or `None` if nothing was found.
    fn attempt(&self, html: &str, url: Option<&Url>) -> Option<String>;
}

/// Containers that hold the article body on common Korean and global news sites.
static ARTICLE_CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "[itemprop=articleBody]",
        "#dic_area",
        "#newsct_article",
        "#articleBodyContents",
        "#article-view-content-div",
        "#articleBody",
        "#article_body",
        "#articletxt",
        "#news_body_area",
        ".article_body",
        ".article-body",
        ".news_body",
        ".story-news",
        "article",
    ]
    .iter()
    .filter_map(|s| Selector::parse(s).ok())
    .collect()
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// Layout elements that never carry article text.
const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "form", "button", "select", "table", "menu",
];

/// Class/id fragments marking comment widgets, share bars and ad slots.
const BOILERPLATE_MARKERS: &[&str] = &["comment", "reply", "share", "sns", "related", "advert", "banner"];

fn is_boilerplate(el: &Element) -> bool {
    if is_invisible(el) || BOILERPLATE_TAGS.contains(&el.name()) {
        return true;
    }
    let marked = |value: Option<&str>| {
        value
            .map(|v| {
                let v = v.to_lowercase();
                BOILERPLATE_MARKERS.iter().any(|m| v.contains(m))
            })
            .unwrap_or(false)
    };
    marked(el.attr("class")) || marked(el.id())
}

fn text_len(s: &str) -> usize {
    s.chars().count()
}

/// Boilerplate-removing heuristic tuned for news articles.
///
/// Known article containers are tried first and the longest one wins. When
/// none yields at least `min_chars`, the element whose direct `<p>` children
/// carry the most text is used instead. Comments, tables and page chrome are
/// always excluded.
#[derive(Debug, Clone)]
pub struct BoilerplateStrategy {
    pub min_chars: usize,
}

impl BoilerplateStrategy {
    fn from_containers(doc: &Html) -> Option<String> {
        ARTICLE_CONTAINERS
            .iter()
            .flat_map(|sel| doc.select(sel))
            .map(|el| block_text(el, is_boilerplate))
            .max_by_key(|text| text_len(text))
            .filter(|text| !text.is_empty())
    }

    fn from_paragraph_density(doc: &Html) -> Option<String> {
        let mut totals: HashMap<_, (ElementRef<'_>, usize)> = HashMap::new();
        for p in doc.select(&PARAGRAPH) {
            let Some(parent) = p.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            if is_boilerplate(parent.value()) {
                continue;
            }
            let len = text_len(&block_text(p, is_boilerplate));
            totals.entry(parent.id()).or_insert((parent, 0)).1 += len;
        }
        totals
            .into_values()
            .max_by_key(|(_, len)| *len)
            .map(|(el, _)| block_text(el, is_boilerplate))
            .filter(|text| !text.is_empty())
    }
}

impl ExtractionStrategy for BoilerplateStrategy {
    fn name(&self) -> &'static str {
        "primary"
    }

    fn attempt(&self, html: &str, _url: Option<&Url>) -> Option<String> {
        let doc = Html::parse_document(html);
        match Self::from_containers(&doc) {
            Some(text) if text_len(&text) > self.min_chars => Some(text),
            container => Self::from_paragraph_density(&doc)
                .into_iter()
                .chain(container)
                .max_by_key(|text| text_len(text)),
        }
    }
}

/// Deepest element nesting handed to `readability`, which recurses over the DOM.
pub const READABILITY_MAX_DEPTH: usize = 512;

/// Main-content isolation via the `readability` crate, flattened to text.
///
/// Documents nested deeper than [`READABILITY_MAX_DEPTH`] are skipped: a
/// stack overflow aborts the process and cannot be caught like a panic.
#[derive(Debug, Clone, Default)]
pub struct ReadabilityStrategy;

impl ExtractionStrategy for ReadabilityStrategy {
    fn name(&self) -> &'static str {
        "secondary"
    }

    fn attempt(&self, html: &str, url: Option<&Url>) -> Option<String> {
        let url = url?;
        let depth = max_depth(Html::parse_document(html).root_element());
        if depth > READABILITY_MAX_DEPTH {
            debug!(depth, "Document too deeply nested for readability; skipping");
            return None;
        }
        // readability can panic on malformed documents; treat that as no result.
        let product = panic::catch_unwind(AssertUnwindSafe(|| {
            readability::extractor::extract(&mut html.as_bytes(), url)
        }));
        match product {
            Ok(Ok(product)) => {
                let fragment = Html::parse_fragment(&product.content);
                let text = block_text(fragment.root_element(), is_invisible);
                (!text.is_empty()).then_some(text)
            }
            Ok(Err(e)) => {
                debug!(error = %e, "readability extraction failed");
                None
            }
            Err(_) => {
                debug!("readability extraction panicked");
                None
            }
        }
    }
}

/// All visible text of `<body>`, or `None` when the document has no body.
pub fn body_fallback(html: &str) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }
    let doc = Html::parse_document(html);
    doc.select(&BODY)
        .next()
        .map(|body| block_text(body, is_invisible))
}
