//! # News Harvest
//!
//! A Korean financial news harvester built on the Naver news search API.
//! It pages through search results, scrapes each article's full body, and
//! saves the collected records as CSV and Parquet.
//!
//! ## Features
//!
//! - Pages through the search API up to its 1000-result offset ceiling
//! - Extracts article bodies with a layered fallback chain and tags the
//!   method (or failure) that produced each body
//! - Deduplicates on `(url, title)` and keeps a recent publish window
//! - Writes UTF-8 (BOM) CSV plus Parquet, marking interrupted runs
//! - Tags harvested articles with sectors from a keyword table
//!
//! ## Usage
//!
//! ```sh
//! news_harvest collect -q "금융 AI" -n 500
//! news_harvest classify --news-csv out/run.csv -k sectors.csv -o out/run_sector.csv
//! ```
//!
//! ## Architecture
//!
//! 1. **Search**: request result pages for the query
//! 2. **Scrape**: fetch each hit and extract its body
//! 3. **Finalize**: dedupe, filter by date, persist
//!
//! Ctrl-C stops the harvest early; whatever was collected is still finalized.

use chrono::{DateTime, FixedOffset};
use clap::Parser;
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod extract;
mod harvest;
mod models;
mod outputs;
mod pipeline;
mod search;
mod sector;
mod utils;

use cli::{ClassifyArgs, Cli, CollectArgs, Command};
use config::Credentials;
use extract::BodyExtractor;
use extract::fetch::HttpFetcher;
use harvest::{HarvestParams, Harvester, Pacing};
use models::ArticleRecord;
use outputs::{OutputError, SavedPaths};
use search::NaverSearchClient;
use utils::kst_now;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    match args.command {
        Command::Collect(args) => collect(args).await?,
        Command::Classify(args) => classify(args).await?,
    }

    info!(elapsed_secs = start_time.elapsed().as_secs_f64(), "news_harvest finished");
    Ok(())
}

async fn collect(args: CollectArgs) -> Result<(), Box<dyn Error>> {
    // Fails before any request when credentials are missing.
    let credentials = Credentials::load(&args.env_file)?;
    info!(env_file = %args.env_file.display(), "Loaded credentials");

    let search = NaverSearchClient::new(credentials)?;
    let extractor = BodyExtractor::new(HttpFetcher::new()?);
    let harvester = Harvester::new(search, extractor, Pacing::default());

    let params = HarvestParams {
        query: args.query.clone(),
        max_items: args.max_items,
        sort: args.sort,
        per_page: args.per_page,
    };

    // ---- Harvest until done, capped, or interrupted ----
    let (records, interrupted) = harvest::drain(
        harvester.harvest(params),
        tokio::signal::ctrl_c(),
        args.max_items,
    )
    .await;
    info!(collected = records.len(), interrupted, "Harvest stopped");

    finalize(records, &args, kst_now()).await?;
    Ok(())
}

/// Dedupe, date-filter and persist a harvest.
///
/// The run counts as incomplete when fewer than `max_items` records were
/// collected, before dedupe and filtering.
///
/// # Returns
///
/// The written paths, or `None` when no record survived filtering.
async fn finalize(
    records: Vec<ArticleRecord>,
    args: &CollectArgs,
    now: DateTime<FixedOffset>,
) -> Result<Option<SavedPaths>, OutputError> {
    let collected = records.len();
    let records = pipeline::dedupe(records);
    let records = pipeline::filter_recent(records, args.recent_days, now);
    if records.is_empty() {
        warn!("No records to save");
        return Ok(None);
    }

    let incomplete = collected < args.max_items;
    let base = outputs::output_base(&args.out_dir, &args.query, &now, incomplete);
    let saved = outputs::persist(&records, &base).await?;
    info!(
        count = records.len(),
        csv = %saved.csv.display(),
        incomplete,
        "Harvest saved"
    );
    Ok(Some(saved))
}

async fn classify(args: ClassifyArgs) -> Result<(), Box<dyn Error>> {
    let count = sector::classify_news_csv(&args.news_csv, &args.keywords, &args.output).await?;
    info!(rows = count, output = %args.output.display(), "Wrote sector CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::{StreamExt, stream};
    use std::path::PathBuf;

    fn record(id: &str, url: &str) -> ArticleRecord {
        ArticleRecord {
            id: id.to_string(),
            source: "naver_news_api".to_string(),
            query: "금융 AI".to_string(),
            title: format!("기사 {url}"),
            body_text: String::new(),
            body_full: "본문".to_string(),
            extractor_used: "primary".to_string(),
            url: url.to_string(),
            originallink: None,
            published_at_kst: "2024-05-30 09:00:00+0900".to_string(),
            first_seen_at_kst: "2024-05-31 09:00:00+0900".to_string(),
            lang: "ko".to_string(),
            response_hash: String::new(),
            version: "v1".to_string(),
        }
    }

    fn collect_args(out_dir: PathBuf, max_items: usize) -> CollectArgs {
        let Command::Collect(mut args) = Cli::parse_from(["news_harvest", "collect"]).command else {
            panic!("expected collect");
        };
        args.out_dir = out_dir;
        args.max_items = max_items;
        args
    }

    #[tokio::test]
    async fn test_interrupted_harvest_is_saved_as_incomplete() {
        let dir = std::env::temp_dir().join(format!("news_harvest_{}", uuid::Uuid::new_v4()));
        let args = collect_args(dir.clone(), 100);
        let now = utils::kst().with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap();

        // Two records arrive, then the harvest stalls until shutdown fires.
        let harvest = stream::iter(vec![record("1", "https://a"), record("2", "https://a")])
            .chain(stream::pending());
        let (records, interrupted) =
            harvest::drain(harvest, tokio::time::sleep(std::time::Duration::from_millis(20)), 100).await;
        assert!(interrupted);
        assert_eq!(records.len(), 2);

        let saved = finalize(records, &args, now).await.unwrap().unwrap();
        let written: Vec<ArticleRecord> = outputs::tabular::read_csv(&saved.csv).await.unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert!(saved.csv.to_string_lossy().ends_with("_incomplete.csv"));
        // Duplicate (url, title) collapsed to one row.
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].id, "1");
    }

    #[tokio::test]
    async fn test_finalize_writes_nothing_when_filtered_empty() {
        let dir = std::env::temp_dir().join(format!("news_harvest_{}", uuid::Uuid::new_v4()));
        let args = collect_args(dir.clone(), 1);
        let now = utils::kst().with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        let saved = finalize(vec![record("1", "https://a")], &args, now).await.unwrap();
        assert_eq!(saved, None);
        assert!(!dir.exists());
    }
}
