//! Parquet output with the same logical schema as the CSV.
//!
//! All columns are `Utf8`; only `originallink` is nullable.

use super::OutputError;
use crate::models::{ArticleRecord, RECORD_COLUMNS};
use crate::utils::ensure_parent_dir;
use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, instrument};

fn schema() -> Schema {
    Schema::new(
        RECORD_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, *name == "originallink"))
            .collect::<Vec<_>>(),
    )
}

fn utf8_column<'a, F>(records: &'a [ArticleRecord], field: F) -> ArrayRef
where
    F: Fn(&'a ArticleRecord) -> &'a str,
{
    Arc::new(StringArray::from_iter_values(records.iter().map(field)))
}

/// Build one record batch holding every record, columns in [`RECORD_COLUMNS`] order.
pub fn record_batch(records: &[ArticleRecord]) -> Result<RecordBatch, OutputError> {
    let originallink: ArrayRef = Arc::new(
        records
            .iter()
            .map(|r| r.originallink.as_deref())
            .collect::<StringArray>(),
    );
    let columns = vec![
        utf8_column(records, |r| r.id.as_str()),
        utf8_column(records, |r| r.source.as_str()),
        utf8_column(records, |r| r.query.as_str()),
        utf8_column(records, |r| r.title.as_str()),
        utf8_column(records, |r| r.body_text.as_str()),
        utf8_column(records, |r| r.body_full.as_str()),
        utf8_column(records, |r| r.extractor_used.as_str()),
        utf8_column(records, |r| r.url.as_str()),
        originallink,
        utf8_column(records, |r| r.published_at_kst.as_str()),
        utf8_column(records, |r| r.first_seen_at_kst.as_str()),
        utf8_column(records, |r| r.lang.as_str()),
        utf8_column(records, |r| r.response_hash.as_str()),
        utf8_column(records, |r| r.version.as_str()),
    ];
    Ok(RecordBatch::try_new(Arc::new(schema()), columns)?)
}

/// Encode records as a Parquet file in memory.
pub fn to_parquet_bytes(records: &[ArticleRecord]) -> Result<Vec<u8>, OutputError> {
    let batch = record_batch(records)?;
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buf)
}

/// Write records to `path` as a Parquet file, creating parent directories.
///
/// # Arguments
///
/// * `records` - Records to write, in order
/// * `path` - Destination file, overwritten if present
///
/// # Errors
///
/// Returns [`OutputError`] if encoding fails or the file cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_parquet(records: &[ArticleRecord], path: &Path) -> Result<(), OutputError> {
    let bytes = to_parquet_bytes(records)?;
    ensure_parent_dir(path).await?;
    fs::write(path, bytes).await?;
    info!("Wrote Parquet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn sample(id: &str, originallink: Option<&str>) -> ArticleRecord {
        ArticleRecord {
            id: id.to_string(),
            source: "naver_news_api".to_string(),
            query: "금융 AI".to_string(),
            title: format!("기사 {id}"),
            body_text: "요약".to_string(),
            body_full: "본문".to_string(),
            extractor_used: "secondary".to_string(),
            url: format!("https://n.news.naver.com/{id}"),
            originallink: originallink.map(str::to_string),
            published_at_kst: "2023-01-02 03:04:05+0900".to_string(),
            first_seen_at_kst: "2024-05-06 07:08:09+0900".to_string(),
            lang: "ko".to_string(),
            response_hash: "00".repeat(32),
            version: "v1".to_string(),
        }
    }

    #[test]
    fn test_record_batch_schema() {
        let batch = record_batch(&[sample("1", None), sample("2", Some("https://x"))]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), RECORD_COLUMNS.len());

        let schema = batch.schema();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, RECORD_COLUMNS.to_vec());
        assert!(schema.field_with_name("originallink").unwrap().is_nullable());
        assert!(!schema.field_with_name("title").unwrap().is_nullable());
        assert_eq!(batch.column(8).null_count(), 1);
    }

    #[tokio::test]
    async fn test_write_parquet_readable() {
        let dir = std::env::temp_dir().join(format!("news_harvest_{}", uuid::Uuid::new_v4()));
        let path = dir.join("out.parquet");
        write_parquet(&[sample("1", Some("https://x")), sample("2", None)], &path)
            .await
            .unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>().unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 2);
        let titles = batches[0]
            .column(3)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(titles.value(0), "기사 1");
    }
}
