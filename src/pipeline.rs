//! Post-harvest record processing: deduplication and date-window filtering.

use crate::models::ArticleRecord;
use crate::utils::parse_kst;
use chrono::{DateTime, Duration, FixedOffset};
use itertools::Itertools;
use tracing::{info, warn};

/// Collapse records sharing `(url, title)` to their first occurrence.
///
/// Order of first occurrences is preserved.
pub fn dedupe(records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    let before = records.len();
    let out = records
        .into_iter()
        .unique_by(|r| {
            let (url, title) = r.identity();
            (url.to_owned(), title.to_owned())
        })
        .collect::<Vec<_>>();
    info!(before, after = out.len(), "Deduplicated records");
    out
}

/// Keep records published within `days` days before `now` (cutoff inclusive).
///
/// `days == 0` disables the filter. Records whose `published_at_kst` cannot
/// be parsed are dropped.
pub fn filter_recent(records: Vec<ArticleRecord>, days: u32, now: DateTime<FixedOffset>) -> Vec<ArticleRecord> {
    if days == 0 {
        return records;
    }
    let cutoff = now - Duration::days(i64::from(days));
    let before = records.len();
    let out = records
        .into_iter()
        .filter(|r| match parse_kst(&r.published_at_kst) {
            Some(published) => published >= cutoff,
            None => {
                warn!(id = %r.id, published_at_kst = %r.published_at_kst, "Unparsable publish time; dropping record");
                false
            }
        })
        .collect::<Vec<_>>();
    info!(days, before, after = out.len(), "Filtered records by publish date");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{format_kst, kst};
    use chrono::TimeZone;

    fn record(id: &str, url: &str, title: &str, published: &str) -> ArticleRecord {
        ArticleRecord {
            id: id.to_string(),
            source: "naver_news_api".to_string(),
            query: "금융 AI".to_string(),
            title: title.to_string(),
            body_text: String::new(),
            body_full: format!("본문 {id}"),
            extractor_used: "primary".to_string(),
            url: url.to_string(),
            originallink: None,
            published_at_kst: published.to_string(),
            first_seen_at_kst: "2024-05-06 07:08:09+0900".to_string(),
            lang: "ko".to_string(),
            response_hash: String::new(),
            version: "v1".to_string(),
        }
    }

    const PUB: &str = "2024-05-01 09:00:00+0900";

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let records = vec![
            record("1", "https://a", "제목 A", PUB),
            record("2", "https://b", "제목 B", PUB),
            record("3", "https://a", "제목 A", PUB),
            record("4", "https://a", "제목 C", PUB),
        ];
        let out = dedupe(records);
        let ids: Vec<_> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);
        assert_eq!(out[0].body_full, "본문 1");
    }

    #[test]
    fn test_dedupe_output_has_unique_identity() {
        let records = (0..20)
            .map(|i| record(&i.to_string(), &format!("https://u/{}", i % 4), &format!("t{}", i % 3), PUB))
            .collect::<Vec<_>>();
        let out = dedupe(records);
        let unique = out.iter().map(|r| r.identity()).unique().count();
        assert_eq!(unique, out.len());
        assert_eq!(out.len(), 12);
    }

    #[test]
    fn test_filter_recent_window_inclusive() {
        let now = kst().with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap();
        let cutoff = now - Duration::days(30);
        let records = vec![
            record("in", "https://a", "a", "2024-05-20 08:00:00+0900"),
            record("old", "https://b", "b", "2024-03-01 08:00:00+0900"),
            record("edge", "https://c", "c", &format_kst(&cutoff)),
            record("just_out", "https://d", "d", &format_kst(&(cutoff - Duration::seconds(1)))),
        ];
        let out = filter_recent(records, 30, now);
        let ids: Vec<_> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["in", "edge"]);
    }

    #[test]
    fn test_filter_recent_disabled() {
        let now = kst().with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap();
        let records = vec![record("old", "https://b", "b", "2001-01-01 00:00:00+0900")];
        assert_eq!(filter_recent(records, 0, now).len(), 1);
    }

    #[test]
    fn test_filter_recent_drops_unparsable() {
        let now = kst().with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap();
        let records = vec![record("bad", "https://b", "b", "yesterday")];
        assert!(filter_recent(records, 30, now).is_empty());
    }
}
