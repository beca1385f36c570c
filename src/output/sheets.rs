//! Publishes a text table to a Google Sheets tab.
//!
//! The tab is cleared, the header is written at the start cell and the rows
//! follow in batches. Every call goes through the shared retry policy.

use std::{sync::OnceLock, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use regex::Regex;
use reqwest::Url;
use serde_json::json;
use tracing::info;

use crate::{
    config::SheetsConfig,
    download::{is_transient, RetryPolicy},
};

use super::TextTable;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const BATCH_ROWS: usize = 2000;

const SHEETS_API: &str = "https://sheets.googleapis.com/";
const CLEAR_COLUMNS: &str = "A1:ZZ";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// The two calls of the Sheets values API the upload needs.
pub trait ValuesApi {
    async fn clear(&self, range: &str) -> Result<()>;
    /// Writes `values` (`RAW`) starting at the top-left cell of `range`.
    async fn update(&self, range: &str, values: &[Vec<String>]) -> Result<()>;
}

/// Values API client for one spreadsheet, authenticated as a service account.
pub struct SheetsClient {
    http: reqwest::Client,
    auth: CustomServiceAccount,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(config: &SheetsConfig) -> Result<Self> {
        let auth = CustomServiceAccount::from_file(&config.credentials).with_context(|| {
            format!(
                "Could not read service account {}",
                config.credentials.display()
            )
        })?;
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(SheetsClient {
            http,
            auth,
            spreadsheet_id: config.spreadsheet_id.clone(),
        })
    }

    fn values_url(&self, range_and_action: &str) -> Result<Url> {
        let mut url = Url::parse(SHEETS_API)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Sheets API URL cannot take a path"))?
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                range_and_action,
            ]);

        Ok(url)
    }

    async fn bearer(&self) -> Result<String> {
        let token = self.auth.token(&[SHEETS_SCOPE]).await?;
        Ok(token.as_str().to_string())
    }
}

impl ValuesApi for SheetsClient {
    async fn clear(&self, range: &str) -> Result<()> {
        let url = self.values_url(&format!("{}:clear", range))?;
        self.http
            .post(url)
            .bearer_auth(self.bearer().await?)
            .json(&json!({}))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn update(&self, range: &str, values: &[Vec<String>]) -> Result<()> {
        let mut url = self.values_url(range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        self.http
            .put(url)
            .bearer_auth(self.bearer().await?)
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": values }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

/// Column letters and row of an `A1` cell. Anything unreadable is `A1`.
pub fn parse_a1(cell: &str) -> (String, usize) {
    static A1: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = A1.get_or_init(|| Regex::new(r"^([A-Za-z]+)(\d+)?$").ok());

    pattern
        .as_ref()
        .and_then(|re| re.captures(cell.trim()))
        .map(|caps| {
            let column = caps[1].to_uppercase();
            let row = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .filter(|&row| row > 0)
                .unwrap_or(1);
            (column, row)
        })
        .unwrap_or_else(|| ("A".to_string(), 1))
}

/// Replaces the contents of `tab` with `table`, header at `start_cell`.
///
/// Returns the number of row batches written.
pub async fn upload_table<A: ValuesApi>(
    api: &A,
    policy: &RetryPolicy,
    tab: &str,
    start_cell: &str,
    table: &TextTable,
) -> Result<usize> {
    let cell = start_cell
        .strip_prefix(&format!("{}!", tab))
        .unwrap_or(start_cell);
    let (column, first_row) = parse_a1(cell);

    if table.headers.is_empty() {
        bail!("Refusing to clear `{}`: the table has no header", tab);
    }

    info!(tab, "clearing sheet");
    let clear_range = format!("{}!{}", tab, CLEAR_COLUMNS);
    policy
        .run_if("Sheets clear", || api.clear(&clear_range), is_transient)
        .await?;

    let header_range = format!("{}!{}{}", tab, column, first_row);
    let header = vec![table.headers.clone()];
    policy
        .run_if("Sheets header update", || api.update(&header_range, &header), is_transient)
        .await?;

    if table.rows.is_empty() {
        info!(tab, "no rows to upload");
        return Ok(0);
    }

    let batches = table.rows.len().div_ceil(BATCH_ROWS);
    info!(tab, rows = table.rows.len(), batches, "uploading rows");

    for (i, batch) in table.rows.chunks(BATCH_ROWS).enumerate() {
        let range = format!("{}!{}{}", tab, column, first_row + 1 + i * BATCH_ROWS);
        policy
            .run_if("Sheets rows update", || api.update(&range, batch), is_transient)
            .await?;
        info!(tab, batch = i + 1, of = batches, rows = batch.len(), "batch uploaded");
    }

    Ok(batches)
}

// -- Tests -------------------------------------------------------------------
