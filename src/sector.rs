//! Keyword-based sector tagging of harvested articles.
//!
//! A keyword table maps sectors to keywords. Each article body is scored per
//! sector by counting keywords that occur in it, and the best-scoring sector
//! is attached. This is the hand-off point for downstream sentiment tooling,
//! which consumes the `body_full, published_at_kst, 섹터` CSV.

use crate::outputs::OutputError;
use crate::outputs::tabular::{UTF8_BOM, read_csv, to_csv_bytes};
use crate::utils::{ensure_parent_dir, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Label for text that matched no keyword.
pub const UNCLASSIFIED: &str = "분류불가";

const SECTOR_COLUMNS: [&str; 3] = ["body_full", "published_at_kst", "섹터"];

static MEANINGFUL_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[가-힣a-zA-Z0-9]").unwrap());

#[derive(Error, Debug)]
pub enum SectorError {
    #[error("column `{0}` is missing from the news CSV")]
    MissingColumn(&'static str),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct KeywordRow {
    #[serde(rename = "섹터")]
    sector: String,
    #[serde(rename = "키워드")]
    keyword: String,
}

#[derive(Debug, Serialize)]
struct SectorRow<'a> {
    body_full: &'a str,
    published_at_kst: &'a str,
    #[serde(rename = "섹터")]
    sector: &'a str,
}

/// Sectors and their keywords, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorTable {
    sectors: Vec<(String, Vec<String>)>,
}

impl SectorTable {
    /// Build a table from `(sector, keyword)` pairs.
    ///
    /// Keywords are trimmed; blank keywords are ignored since they would
    /// match every text.
    pub fn from_pairs<I, S, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, K)>,
        S: Into<String>,
        K: AsRef<str>,
    {
        let mut table = SectorTable::default();
        for (sector, keyword) in pairs {
            let sector = sector.into();
            let idx = match table.sectors.iter().position(|(name, _)| *name == sector) {
                Some(idx) => idx,
                None => {
                    table.sectors.push((sector, Vec::new()));
                    table.sectors.len() - 1
                }
            };
            let keyword = keyword.as_ref().trim();
            if !keyword.is_empty() {
                table.sectors[idx].1.push(keyword.to_string());
            }
        }
        table
    }

    /// Load a keyword CSV with `섹터` and `키워드` columns.
    pub async fn from_csv(path: &Path) -> Result<Self, SectorError> {
        let rows: Vec<KeywordRow> = read_csv(path).await?;
        let table = Self::from_pairs(rows.into_iter().map(|r| (r.sector, r.keyword)));
        if table.is_empty() {
            warn!(path = %path.display(), "Keyword table is empty; every article will be unclassified");
        }
        info!(path = %path.display(), sectors = table.len(), "Loaded sector keywords");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Best-scoring sector for `text`, or [`UNCLASSIFIED`].
    ///
    /// Each keyword found as a substring scores one point. Ties go to the
    /// sector listed first.
    pub fn classify(&self, text: &str) -> &str {
        let mut best: Option<(&str, usize)> = None;
        for (sector, keywords) in &self.sectors {
            let score = keywords.iter().filter(|kw| text.contains(kw.as_str())).count();
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((sector.as_str(), score));
            }
        }
        best.map_or(UNCLASSIFIED, |(sector, _)| sector)
    }
}

/// Whether a body carries any Hangul, Latin letter or digit.
pub fn is_meaningful(text: &str) -> bool {
    MEANINGFUL_TEXT.is_match(text)
}

/// Classify harvested CSV bytes, returning the sector CSV bytes and the row count.
pub fn classify_csv_bytes(news: &[u8], table: &SectorTable) -> Result<(Vec<u8>, usize), SectorError> {
    let news = news.strip_prefix(UTF8_BOM).unwrap_or(news);
    let mut reader = csv::Reader::from_reader(news);
    let headers = reader.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(SectorError::MissingColumn(name))
    };
    let body_idx = column("body_full")?;
    let published_idx = column("published_at_kst")?;

    let mut records = Vec::new();
    for row in reader.records() {
        records.push(row?);
    }

    let rows = records
        .iter()
        .filter_map(|r| {
            let body = r.get(body_idx).unwrap_or_default();
            if !is_meaningful(body) {
                debug!(body = %truncate_for_log(body, 40), "Skipping row without meaningful text");
                return None;
            }
            Some(SectorRow {
                body_full: body,
                published_at_kst: r.get(published_idx).unwrap_or_default(),
                sector: table.classify(body),
            })
        })
        .collect::<Vec<_>>();

    let bytes = to_csv_bytes(&rows, &SECTOR_COLUMNS)?;
    Ok((bytes, rows.len()))
}

/// Tag every article in `news_csv` with a sector and write the result to `output`.
///
/// Rows whose `body_full` has no Hangul, Latin letter or digit are dropped.
///
/// # Arguments
///
/// * `news_csv` - Harvest CSV with `body_full` and `published_at_kst` columns
/// * `keyword_csv` - Keyword table with `섹터` and `키워드` columns
/// * `output` - Destination CSV (`body_full, published_at_kst, 섹터`, UTF-8 BOM)
///
/// # Returns
///
/// The number of rows written.
///
/// # Errors
///
/// Returns [`SectorError::MissingColumn`] when a required column is absent,
/// or an I/O or CSV error.
#[instrument(level = "info", skip_all, fields(news = %news_csv.display(), output = %output.display()))]
pub async fn classify_news_csv(news_csv: &Path, keyword_csv: &Path, output: &Path) -> Result<usize, SectorError> {
    let table = SectorTable::from_csv(keyword_csv).await?;
    let news = fs::read(news_csv).await?;
    let (bytes, count) = classify_csv_bytes(&news, &table)?;
    ensure_parent_dir(output).await?;
    fs::write(output, bytes).await?;
    info!(rows = count, "Sector classification complete");
    Ok(count)
}
