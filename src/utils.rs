//! Utility functions for KST timestamps, text cleanup, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Fixed-offset (UTC+9) timestamp formatting and parsing
//! - Cleanup of HTML-escaped API snippets
//! - String truncation and filename sanitizing
//! - Output directory creation

use chrono::{DateTime, FixedOffset, Utc};
use scraper::Html;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// Format of every persisted timestamp, e.g. `2023-01-02 03:04:05+0900`.
pub const KST_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

/// Format of the API's `pubDate` field, e.g. `Mon, 02 Jan 2023 03:04:05 +0900`.
const PUBDATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// The fixed UTC+9 offset all timestamps are rendered in.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).unwrap()
}

/// Current time in KST.
pub fn kst_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&kst())
}

/// Render any aware timestamp in KST using [`KST_FORMAT`].
pub fn format_kst(dt: &DateTime<FixedOffset>) -> String {
    dt.with_timezone(&kst()).format(KST_FORMAT).to_string()
}

/// Parse a timestamp previously rendered by [`format_kst`].
pub fn parse_kst(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s.trim(), KST_FORMAT).ok()
}

/// Normalize an API `pubDate` to a KST timestamp string.
///
/// Unparsable input falls back to `now` rather than failing, so every record
/// carries a usable publish time.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     parse_pubdate("Mon, 02 Jan 2023 03:04:05 +0900", kst_now()),
///     "2023-01-02 03:04:05+0900"
/// );
/// ```
pub fn parse_pubdate(pubdate: &str, now: DateTime<FixedOffset>) -> String {
    let trimmed = pubdate.trim();
    let parsed = DateTime::parse_from_str(trimmed, PUBDATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc2822(trimmed));
    match parsed {
        Ok(dt) => format_kst(&dt),
        Err(e) => {
            debug!(%pubdate, error = %e, "Unparsable pubDate; using collection time");
            format_kst(&now)
        }
    }
}

/// Unescape HTML entities and strip tags (the API wraps matches in `<b>`).
pub fn clean_html_text(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(s);
    fragment
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

/// Turn a search query into a filename-safe slug.
///
/// Keeps alphanumerics (including Hangul) and spaces, trims, then replaces
/// spaces with underscores.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(safe_query("금융 AI!"), "금융_AI");
/// ```
pub fn safe_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes on a character boundary, with
/// an ellipsis and byte count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Create the parent directory of `path` if it does not exist yet.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}
