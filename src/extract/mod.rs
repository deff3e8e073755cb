//! Full-text extraction of article bodies from publisher pages.
//!
//! [`BodyExtractor::extract`] fetches a page and runs a layered fallback:
//!
//! 1. **Fetch** through a [`PageFetcher`]; a 403 becomes `blocked_403`, any
//!    other failure an `error_*` tag, and extraction stops there
//! 2. **Strategies** in priority order ([`strategies`]), each accepted only
//!    when its text is longer than [`MIN_BODY_CHARS`]
//! 3. **Body fallback**, accepted regardless of length
//!
//! The extractor never returns an error: every failure is folded into an
//! [`Extraction`] with empty text and a tag describing what went wrong.

pub mod fetch;
pub mod strategies;
pub mod text;

use fetch::{FetchError, PageFetcher};
use std::fmt;
use strategies::{BoilerplateStrategy, ExtractionStrategy, ReadabilityStrategy, body_fallback};
use tracing::{debug, instrument};
use url::Url;

/// Extracted text must be longer than this (in characters) to be accepted
/// from a strategy. Guards against placeholder-only pages.
pub const MIN_BODY_CHARS: usize = 100;

/// Which strategy produced the text, or why none did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractorTag {
    /// Accepted from the named strategy (`primary`, `secondary`).
    Strategy(&'static str),
    FallbackBody,
    ExtractFailed,
    /// HTTP 403 from the publisher.
    Blocked,
    HttpStatus(u16),
    /// Transport failure, classified (`timeout`, `connect`, ...).
    Error(&'static str),
}

impl fmt::Display for ExtractorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractorTag::Strategy(name) => f.write_str(name),
            ExtractorTag::FallbackBody => f.write_str("fallback_body"),
            ExtractorTag::ExtractFailed => f.write_str("extract_failed"),
            ExtractorTag::Blocked => f.write_str("blocked_403"),
            ExtractorTag::HttpStatus(status) => write!(f, "error_http_{status}"),
            ExtractorTag::Error(kind) => write!(f, "error_{kind}"),
        }
    }
}

impl From<&FetchError> for ExtractorTag {
    fn from(e: &FetchError) -> Self {
        match e {
            FetchError::Status { status: 403 } => ExtractorTag::Blocked,
            FetchError::Status { status } => ExtractorTag::HttpStatus(*status),
            FetchError::Transport { kind, .. } => ExtractorTag::Error(*kind),
        }
    }
}

/// Outcome of one body extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub tag: ExtractorTag,
    /// The page was fetched only after disabling certificate verification.
    pub insecure_retry: bool,
}

impl Extraction {
    fn failed(tag: ExtractorTag) -> Self {
        Self {
            text: String::new(),
            tag,
            insecure_retry: false,
        }
    }

    /// Tag as persisted in `extractor_used`, e.g. `primary` or `primary+ssl_retry`.
    pub fn label(&self) -> String {
        if self.insecure_retry {
            format!("{}+ssl_retry", self.tag)
        } else {
            self.tag.to_string()
        }
    }
}

/// Fetches pages and runs the extraction chain.
pub struct BodyExtractor<F> {
    fetcher: F,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl<F: PageFetcher> BodyExtractor<F> {
    /// Extractor with the default chain: boilerplate heuristic, then readability.
    pub fn new(fetcher: F) -> Self {
        Self::with_strategies(
            fetcher,
            vec![
                Box::new(BoilerplateStrategy {
                    min_chars: MIN_BODY_CHARS,
                }),
                Box::new(ReadabilityStrategy),
            ],
        )
    }

    pub fn with_strategies(fetcher: F, strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { fetcher, strategies }
    }

    /// Fetch `url` and extract its main text. Never fails.
    ///
    /// # Arguments
    ///
    /// * `url` - Article page to scrape
    /// * `referer` - Sent as the `Referer` header; the harvester passes the
    ///   API link here
    ///
    /// # Returns
    ///
    /// An [`Extraction`] whose tag names the strategy that produced the text.
    /// Fetch errors yield an empty text tagged `blocked_403`,
    /// `error_http_<code>` or `error_<kind>`.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn extract(&self, url: &str, referer: Option<&str>) -> Extraction {
        let page = match self.fetcher.fetch(url, referer).await {
            Ok(page) => page,
            Err(e) => {
                debug!(error = %e, "Page fetch failed");
                return Extraction::failed(ExtractorTag::from(&e));
            }
        };

        let mut extraction = self.extract_from_html(&page.html, url);
        extraction.insecure_retry = page.insecure_retry;
        extraction
    }

    /// Run the strategy chain and the body fallback over already-fetched HTML.
    pub fn extract_from_html(&self, html: &str, url: &str) -> Extraction {
        let base = Url::parse(url).ok();

        for strategy in &self.strategies {
            if let Some(text) = strategy.attempt(html, base.as_ref()) {
                let chars = text.chars().count();
                if chars > MIN_BODY_CHARS {
                    return Extraction {
                        text,
                        tag: ExtractorTag::Strategy(strategy.name()),
                        insecure_retry: false,
                    };
                }
                debug!(strategy = strategy.name(), chars, "Strategy text below threshold");
            }
        }

        match body_fallback(html) {
            Some(text) => Extraction {
                text,
                tag: ExtractorTag::FallbackBody,
                insecure_retry: false,
            },
            None => Extraction::failed(ExtractorTag::ExtractFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fetch::FetchedPage;
    use super::*;

    /// Fetch stub returning a fixed result.
    struct StubFetcher(Result<FetchedPage, FetchError>);

    impl PageFetcher for StubFetcher {
        async fn fetch(&self, _url: &str, _referer: Option<&str>) -> Result<FetchedPage, FetchError> {
            self.0.clone()
        }
    }

    fn page(html: &str, insecure_retry: bool) -> StubFetcher {
        StubFetcher(Ok(FetchedPage {
            html: html.to_string(),
            insecure_retry,
        }))
    }

    fn article_html() -> String {
        let para = "한국은행은 기준금리를 동결하고 금융시장의 변동성에 대비하겠다고 밝혔다. ".repeat(4);
        format!("<html><body><header>로고</header><article><p>{para}</p></article></body></html>")
    }

    const URL: &str = "https://www.example.co.kr/news/1";

    #[tokio::test]
    async fn test_blocked_403() {
        let extractor = BodyExtractor::new(StubFetcher(Err(FetchError::Status { status: 403 })));
        let result = extractor.extract(URL, Some("https://n.news.naver.com/a")).await;
        assert_eq!(result.text, "");
        assert_eq!(result.tag, ExtractorTag::Blocked);
        assert_eq!(result.label(), "blocked_403");
    }

    #[tokio::test]
    async fn test_other_status_and_transport_errors() {
        let extractor = BodyExtractor::new(StubFetcher(Err(FetchError::Status { status: 404 })));
        assert_eq!(extractor.extract(URL, None).await.label(), "error_http_404");

        let extractor = BodyExtractor::new(StubFetcher(Err(FetchError::Transport {
            kind: "timeout",
            message: "timed out".to_string(),
        })));
        let result = extractor.extract(URL, None).await;
        assert_eq!(result.text, "");
        assert_eq!(result.label(), "error_timeout");
    }

    #[tokio::test]
    async fn test_primary_strategy_accepted() {
        let extractor = BodyExtractor::new(page(&article_html(), false));
        let result = extractor.extract(URL, None).await;
        assert_eq!(result.label(), "primary");
        assert!(result.text.starts_with("한국은행은"));
        assert!(!result.text.contains("로고"));
    }

    #[tokio::test]
    async fn test_ssl_retry_is_recorded() {
        let extractor = BodyExtractor::new(page(&article_html(), true));
        let result = extractor.extract(URL, None).await;
        assert!(result.insecure_retry);
        assert_eq!(result.label(), "primary+ssl_retry");
    }

    #[tokio::test]
    async fn test_short_page_uses_body_fallback() {
        let extractor = BodyExtractor::new(page("<html><body><p>loading...</p></body></html>", false));
        let result = extractor.extract(URL, None).await;
        assert_eq!(result.tag, ExtractorTag::FallbackBody);
        assert_eq!(result.text, "loading...");
    }

    #[tokio::test]
    async fn test_empty_document_fails() {
        let extractor = BodyExtractor::new(page("", false));
        let result = extractor.extract(URL, None).await;
        assert_eq!(result.tag, ExtractorTag::ExtractFailed);
        assert!(result.text.is_empty());
    }

    #[tokio::test]
    async fn test_deeply_nested_page_does_not_abort() {
        let depth = 3_000;
        let html = format!(
            "<html><body>{}깊은 본문{}</body></html>",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        );
        let extractor = BodyExtractor::new(page(&html, false));
        let result = extractor.extract(URL, None).await;
        assert_eq!(result.tag, ExtractorTag::FallbackBody);
        assert_eq!(result.text, "깊은 본문");
    }

    struct FixedStrategy(&'static str, String);

    impl ExtractionStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            self.0
        }

        fn attempt(&self, _html: &str, _url: Option<&Url>) -> Option<String> {
            Some(self.1.clone())
        }
    }

    #[test]
    fn test_length_gate_falls_through_to_next_strategy() {
        let extractor = BodyExtractor::with_strategies(
            page("", false),
            vec![
                Box::new(FixedStrategy("primary", "짧음".to_string())),
                Box::new(FixedStrategy("secondary", "가".repeat(101))),
            ],
        );
        let result = extractor.extract_from_html("<html><body></body></html>", URL);
        assert_eq!(result.tag, ExtractorTag::Strategy("secondary"));
        assert_eq!(result.text.chars().count(), 101);
    }

    #[test]
    fn test_exactly_threshold_is_rejected() {
        let extractor = BodyExtractor::with_strategies(
            page("", false),
            vec![Box::new(FixedStrategy("primary", "가".repeat(100)))],
        );
        let result = extractor.extract_from_html("<html><body><p>본문</p></body></html>", URL);
        assert_eq!(result.tag, ExtractorTag::FallbackBody);
        assert_eq!(result.text, "본문");
    }
}
