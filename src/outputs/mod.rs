//! Output generation for harvested records.
//!
//! # Submodules
//!
//! - [`tabular`]: CSV (UTF-8 with BOM), the authoritative output
//! - [`columnar`]: Parquet with the same schema, best-effort
//!
//! # Output Structure
//!
//! ```text
//! out_dir/
//! ├── 20240506_070809_금융_AI.csv
//! ├── 20240506_070809_금융_AI.parquet
//! ├── 20240507_090000_금융_AI_incomplete.csv      # interrupted or short run
//! └── 20240507_090000_금융_AI_incomplete.parquet
//! ```

pub mod columnar;
pub mod tabular;

use crate::models::ArticleRecord;
use crate::utils::safe_query;
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

/// Base path (without extension) for a run's output files.
///
/// `<out_dir>/<YYYYmmdd_HHMMSS>_<safe query>[_incomplete]`
pub fn output_base(out_dir: &Path, query: &str, now: &DateTime<FixedOffset>, incomplete: bool) -> PathBuf {
    let status = if incomplete { "_incomplete" } else { "" };
    out_dir.join(format!(
        "{}_{}{}",
        now.format("%Y%m%d_%H%M%S"),
        safe_query(query),
        status
    ))
}

fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut s = base.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// Paths actually written by [`persist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPaths {
    pub csv: PathBuf,
    /// `None` when the Parquet write failed.
    pub parquet: Option<PathBuf>,
}

/// Write records as `<base>.csv` and `<base>.parquet`.
///
/// The two writes are independent. A Parquet failure is logged and
/// reported as `parquet: None`; a CSV failure is logged and returned after
/// the Parquet attempt.
///
/// # Arguments
///
/// * `records` - Deduplicated, filtered records
/// * `base` - Path without extension, usually from [`output_base`]
///
/// # Returns
///
/// The paths written. `parquet` is `None` when only the CSV succeeded.
///
/// # Errors
///
/// Returns the CSV write error, if any.
pub async fn persist(records: &[ArticleRecord], base: &Path) -> Result<SavedPaths, OutputError> {
    let csv_path = with_suffix(base, "csv");
    let parquet_path = with_suffix(base, "parquet");

    let csv_result = tabular::write_csv(records, &csv_path).await;
    if let Err(e) = &csv_result {
        error!(path = %csv_path.display(), error = %e, "Failed to write CSV");
    }

    let parquet = match columnar::write_parquet(records, &parquet_path).await {
        Ok(()) => Some(parquet_path),
        Err(e) => {
            warn!(path = %parquet_path.display(), error = %e, "Parquet save failed; CSV remains authoritative");
            None
        }
    };

    csv_result?;
    info!(csv = %csv_path.display(), parquet = ?parquet, "Saved records");
    Ok(SavedPaths { csv: csv_path, parquet })
}
