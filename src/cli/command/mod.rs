pub mod cap;
pub mod levels;
pub mod temperatures;
pub mod warnings;
pub mod zones;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Europe::Madrid;

use crate::{
    config::Config,
    download::RetryPolicy,
    output::{
        sheets::{upload_table, SheetsClient},
        TextTable,
    },
};

pub use cap::cap;
pub use levels::levels;
pub use temperatures::temperatures;
pub use warnings::warnings;
pub use zones::zones;

/// Snapshot stamp `YYYY-MM-DD_HHh` in Europe/Madrid time.
pub fn snapshot_stamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&Madrid).format("%Y-%m-%d_%Hh").to_string()
}

/// `avisos_aemet.parquet` → `avisos_aemet_2026-10-16_08h.parquet`.
pub fn make_snapshot_file_name(file_path: &Path, stamp: &str) -> PathBuf {
    let stem = file_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match file_path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    };

    file_path.with_file_name(file_name)
}

/// Replaces the configured tab, or `default_tab`, with `table`. Returns the tab name.
pub async fn upload_to_sheets(
    config: &Config,
    default_tab: &str,
    table: &TextTable,
) -> Result<String> {
    let client = SheetsClient::new(&config.sheets)?;
    let tab = config.sheets.tab_or(default_tab);

    upload_table(&client, &RetryPolicy::default(), &tab, &format!("{}!A1", tab), table).await?;

    Ok(tab)
}

// -- Tests -------------------------------------------------------------------
