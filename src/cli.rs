//! Command-line interface definitions for News Harvest.
//!
//! This module defines the CLI subcommands and options using the `clap` crate.
//! Credentials are not flags; they come from the environment or the `.env`
//! file named by `--env-file`.

use crate::search::SortOrder;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the News Harvest application.
///
/// # Examples
///
/// ```sh
/// # Collect up to 1000 recent articles for the default query
/// news_harvest collect
///
/// # Relevance-sorted, last 7 days only, into ./data
/// news_harvest collect -q "반도체 HBM" --sort sim --recent-days 7 -o ./data
///
/// # Tag a harvest with sectors
/// news_harvest classify --news-csv out/run.csv --keywords sectors.csv --output out/run_sector.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search, scrape and save articles for a query
    Collect(CollectArgs),
    /// Attach a sector label to each article of a harvested CSV
    Classify(ClassifyArgs),
}

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Search query
    #[arg(short, long, default_value = "금융 AI")]
    pub query: String,

    /// Maximum number of articles to collect
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub max_items: usize,

    /// Result ordering
    #[arg(long, value_enum, default_value_t = SortOrder::Date)]
    pub sort: SortOrder,

    /// Results requested per search call (clamped to 1..=100)
    #[arg(long, default_value_t = 100)]
    pub per_page: usize,

    /// Keep only articles published within this many days (0 keeps everything)
    #[arg(long, default_value_t = 30)]
    pub recent_days: u32,

    /// Output directory for CSV and Parquet files
    #[arg(short, long, default_value = "out")]
    pub out_dir: PathBuf,

    /// Credential file with NAVER_CLIENT_ID / NAVER_CLIENT_SECRET
    #[arg(long, env = "NEWS_HARVEST_ENV_FILE", default_value = ".env")]
    pub env_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Harvested CSV with `body_full` and `published_at_kst` columns
    #[arg(long)]
    pub news_csv: PathBuf,

    /// Keyword CSV with `섹터` and `키워드` columns
    #[arg(short, long)]
    pub keywords: PathBuf,

    /// Destination CSV
    #[arg(short, long)]
    pub output: PathBuf,
}
