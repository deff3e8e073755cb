//! Page fetching with browser-like headers.
//!
//! [`PageFetcher`] is the seam between the body extractor and the network.
//! [`HttpFetcher`] sends browser headers tuned for Korean pages, follows
//! redirects, and retries once without certificate verification when the
//! first attempt fails on certificate validation (common on smaller
//! publisher sites).

use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

/// How many leading bytes to scan for a `<meta charset>` declaration.
const CHARSET_SNIFF_BYTES: usize = 2048;

static META_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-:]+)"#).unwrap());

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    /// True when the page was only reachable with certificate checks off.
    pub insecure_retry: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("{kind} error: {message}")]
    Transport { kind: &'static str, message: String },
}

impl FetchError {
    fn from_reqwest(e: &reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return FetchError::Status {
                status: status.as_u16(),
            };
        }
        FetchError::Transport {
            kind: transport_kind(e),
            message: e.to_string(),
        }
    }
}

/// Short classifier for a transport failure, used in extractor tags.
fn transport_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_redirect() {
        "redirect"
    } else if e.is_body() {
        "body"
    } else if e.is_decode() {
        "decode"
    } else if e.is_builder() {
        "builder"
    } else {
        "request"
    }
}

/// True when any cause of `e` is a TLS certificate failure.
///
/// The top-level message is not inspected: it embeds the request URL.
fn is_certificate_error(e: &(dyn StdError + 'static)) -> bool {
    let mut current = e.source();
    while let Some(err) = current {
        let msg = err.to_string().to_lowercase();
        if msg.contains("certificate") || msg.contains("cert verify") || msg.contains("unknownissuer") {
            return true;
        }
        current = err.source();
    }
    false
}

/// Trait for fetching a page's HTML.
pub trait PageFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedPage, FetchError>;
}

/// Browser-like HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    insecure: Client,
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let builder = || {
            Client::builder()
                .user_agent(BROWSER_UA)
                .default_headers(browser_headers())
                .timeout(SCRAPE_TIMEOUT)
                .redirect(reqwest::redirect::Policy::limited(10))
        };
        Ok(Self {
            client: builder().build()?,
            insecure: builder().danger_accept_invalid_certs(true).build()?,
        })
    }

    async fn send(client: &Client, url: &str, referer: Option<&str>) -> Result<Response, reqwest::Error> {
        let mut req = client.get(url);
        if let Some(referer) = referer {
            req = req.header(header::REFERER, referer);
        }
        req.send().await
    }

    async fn read_page(resp: Response, insecure_retry: bool) -> Result<FetchedPage, FetchError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp.bytes().await.map_err(|e| FetchError::from_reqwest(&e))?;
        Ok(FetchedPage {
            html: decode_html(&bytes, content_type.as_deref()),
            insecure_retry,
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedPage, FetchError> {
        match Self::send(&self.client, url, referer).await {
            Ok(resp) => Self::read_page(resp, false).await,
            Err(e) if is_certificate_error(&e) => {
                warn!(%url, error = %e, "Certificate validation failed; retrying without verification");
                match Self::send(&self.insecure, url, referer).await {
                    Ok(resp) => Self::read_page(resp, true).await,
                    Err(e) => Err(FetchError::from_reqwest(&e)),
                }
            }
            Err(e) => Err(FetchError::from_reqwest(&e)),
        }
    }
}

/// Decode a page body using the `Content-Type` charset, then a
/// `<meta charset>` declaration, then UTF-8.
///
/// Many Korean publishers still serve EUC-KR and only declare it in markup.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> String {
    let from_header = content_type
        .and_then(|ct| {
            ct.split(';')
                .filter_map(|part| part.trim().strip_prefix("charset="))
                .next()
                .map(|c| c.trim_matches('"').to_string())
        })
        .and_then(|label| Encoding::for_label(label.as_bytes()));

    let encoding = from_header
        .or_else(|| {
            let head = &bytes[..bytes.len().min(CHARSET_SNIFF_BYTES)];
            META_CHARSET
                .captures(head)
                .and_then(|caps| caps.get(1))
                .and_then(|m| Encoding::for_label(m.as_bytes()))
        })
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = used.name(), "Page decoded with replacement characters");
    }
    text.into_owned()
}
