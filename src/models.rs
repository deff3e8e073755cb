//! Data models for search results and harvested article records.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SearchResponse`]: Decoded page of results from the news search API
//! - [`SearchItem`]: Typed view over a single raw result item
//! - [`ArticleRecord`]: The persisted unit, one per harvested result item
//!
//! The API payload uses camelCase (`pubDate`), hence the serde renames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Provenance marker written into every record.
pub const RECORD_SOURCE: &str = "naver_news_api";
/// Language of the harvested articles.
pub const RECORD_LANG: &str = "ko";
/// Schema version tag.
pub const RECORD_VERSION: &str = "v1";

/// Column order of the tabular and columnar outputs.
pub const RECORD_COLUMNS: [&str; 14] = [
    "id",
    "source",
    "query",
    "title",
    "body_text",
    "body_full",
    "extractor_used",
    "url",
    "originallink",
    "published_at_kst",
    "first_seen_at_kst",
    "lang",
    "response_hash",
    "version",
];

/// One decoded page of search results.
///
/// Items are kept as raw JSON objects so that each one can be fingerprinted
/// exactly as the API returned it. A missing `items` key decodes as empty.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<Value>,
}

/// A single search result item as returned by the API.
///
/// `title` and `description` are HTML-escaped and may carry `<b>` highlight
/// tags around the matched query terms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub originallink: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: String,
}

impl SearchItem {
    /// Decode a raw item leniently; unknown or mistyped fields fall back to defaults.
    pub fn from_value(raw: &Value) -> Self {
        serde_json::from_value(raw.clone()).unwrap_or_default()
    }

    /// URL to scrape: the publisher's own link when present, otherwise the API link.
    pub fn scrape_target(&self) -> Option<&str> {
        non_empty(self.originallink.as_deref()).or_else(|| non_empty(self.link.as_deref()))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

/// SHA-256 hex digest of a raw API item.
///
/// `serde_json` objects serialize with sorted keys, so the digest does not
/// depend on the order the API emitted fields in.
pub fn response_hash(raw: &Value) -> String {
    let bytes = serde_json::to_vec(raw).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

/// A harvested article, persisted as one row of the CSV and Parquet outputs.
///
/// Field order here is the column order of both output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Unique per record (UUID v4).
    pub id: String,
    /// Always [`RECORD_SOURCE`].
    pub source: String,
    /// Search query that produced the record.
    pub query: String,
    /// HTML-unescaped, tag-stripped title.
    pub title: String,
    /// Cleaned API snippet.
    pub body_text: String,
    /// Scraped article text; empty when extraction failed.
    pub body_full: String,
    /// Extraction strategy or failure tag.
    pub extractor_used: String,
    /// API link; with `title`, the identity of a record.
    pub url: String,
    /// Publisher link, if the API supplied one.
    pub originallink: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS+0900`.
    pub published_at_kst: String,
    /// Collection time, same format.
    pub first_seen_at_kst: String,
    pub lang: String,
    pub response_hash: String,
    pub version: String,
}

impl ArticleRecord {
    /// Identity key used for deduplication.
    pub fn identity(&self) -> (&str, &str) {
        (&self.url, &self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_response_missing_items() {
        let resp: SearchResponse = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(resp.items.is_empty());
    }

    #[test]
    fn test_search_item_from_value() {
        let raw = json!({
            "title": "<b>금융</b> AI 도입",
            "description": "요약",
            "link": "https://n.news.naver.com/mnews/article/001/0000000001",
            "originallink": "https://www.example.co.kr/news/1",
            "pubDate": "Mon, 02 Jan 2023 03:04:05 +0900"
        });
        let item = SearchItem::from_value(&raw);
        assert_eq!(item.title, "<b>금융</b> AI 도입");
        assert_eq!(item.pub_date, "Mon, 02 Jan 2023 03:04:05 +0900");
        assert_eq!(item.scrape_target(), Some("https://www.example.co.kr/news/1"));
    }

    #[test]
    fn test_scrape_target_falls_back_to_link() {
        let item = SearchItem {
            link: Some("https://n.news.naver.com/a".to_string()),
            originallink: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(item.scrape_target(), Some("https://n.news.naver.com/a"));

        let none = SearchItem::default();
        assert_eq!(none.scrape_target(), None);
    }

    #[test]
    fn test_response_hash_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"title":"t","link":"l"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"link":"l","title":"t"}"#).unwrap();
        assert_eq!(response_hash(&a), response_hash(&b));
        assert_eq!(response_hash(&a).len(), 64);
    }

    #[test]
    fn test_response_hash_changes_with_content() {
        let a = json!({"title": "t1"});
        let b = json!({"title": "t2"});
        assert_ne!(response_hash(&a), response_hash(&b));
    }
}
