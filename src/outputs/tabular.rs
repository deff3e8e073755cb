//! CSV output, the authoritative copy of a harvest.
//!
//! Files are UTF-8 with a byte-order mark so spreadsheet tools detect the
//! encoding and render Hangul correctly. The header row follows the field
//! order of [`ArticleRecord`].

use super::OutputError;
use crate::models::{ArticleRecord, RECORD_COLUMNS};
use crate::utils::ensure_parent_dir;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Serialize rows to BOM-prefixed CSV bytes.
///
/// `header` is written explicitly when `rows` is empty so the file always
/// carries its header.
pub fn to_csv_bytes<T: Serialize>(rows: &[T], header: &[&str]) -> Result<Vec<u8>, OutputError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(UTF8_BOM.to_vec());
    if rows.is_empty() {
        writer.write_record(header)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| OutputError::Io(e.into_error()))
}

/// Parse CSV bytes, tolerating a leading BOM. Columns are matched by header name.
pub fn from_csv_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, OutputError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::Reader::from_reader(bytes);
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

/// Write records to `path` as BOM-prefixed CSV, creating parent directories.
///
/// # Arguments
///
/// * `records` - Records to write, in order
/// * `path` - Destination file, overwritten if present
///
/// # Errors
///
/// Returns [`OutputError`] if serialization fails or the file cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_csv(records: &[ArticleRecord], path: &Path) -> Result<(), OutputError> {
    let bytes = to_csv_bytes(records, &RECORD_COLUMNS)?;
    ensure_parent_dir(path).await?;
    fs::write(path, bytes).await?;
    info!("Wrote CSV");
    Ok(())
}

/// Read a CSV file written by [`write_csv`] (or any BOM-prefixed CSV).
pub async fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, OutputError> {
    let bytes = fs::read(path).await?;
    from_csv_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, originallink: Option<&str>) -> ArticleRecord {
        ArticleRecord {
            id: id.to_string(),
            source: "naver_news_api".to_string(),
            query: "금융 AI".to_string(),
            title: "\"AI 금융\", 규제 샌드박스 확대".to_string(),
            body_text: "은행권, AI 상담 도입…고객 만족도↑".to_string(),
            body_full: "첫 문단입니다.\n두 번째 문단, 쉼표와 \"따옴표\" 포함.\n😀 이모지".to_string(),
            extractor_used: "primary+ssl_retry".to_string(),
            url: "https://n.news.naver.com/mnews/article/001/0000000001".to_string(),
            originallink: originallink.map(str::to_string),
            published_at_kst: "2023-01-02 03:04:05+0900".to_string(),
            first_seen_at_kst: "2024-05-06 07:08:09+0900".to_string(),
            lang: "ko".to_string(),
            response_hash: "ab".repeat(32),
            version: "v1".to_string(),
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("news_harvest_{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_csv_bytes_header_and_bom() {
        let bytes = to_csv_bytes(&[sample("1", None)], &RECORD_COLUMNS).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, RECORD_COLUMNS.join(","));
    }

    #[test]
    fn test_empty_records_still_have_header() {
        let bytes = to_csv_bytes::<ArticleRecord>(&[], &RECORD_COLUMNS).unwrap();
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(text.trim_end(), RECORD_COLUMNS.join(","));
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let path = temp_path("nested/out.csv");
        let records = vec![
            sample("1", Some("https://www.example.co.kr/news/1")),
            sample("2", None),
        ];

        write_csv(&records, &path).await.unwrap();
        let read: Vec<ArticleRecord> = read_csv(&path).await.unwrap();
        let _ = std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap());

        assert_eq!(read, records);
    }
}
