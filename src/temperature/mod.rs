//! Daily maximum temperatures of AEMET climatological stations.
//!
//! Station ids and the station master table are CSV files. Daily values come
//! from the open-data API as a JSON array, one object per station-day.

pub mod master;

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde_json::Value;

use crate::{format::long_date, output::TextTable};

pub use master::{merge_with_master, transform_master};

pub const STATION_COLUMN: &str = "indicativo";

#[derive(Debug, Clone, Default, PartialEq)]
/// One station-day of the daily climatological values.
pub struct DailyReading {
    pub station: String,
    /// `YYYY-MM-DD` as published.
    pub date: String,
    /// `date` as a Spanish long date, empty when it does not parse.
    pub date_text: String,
    /// Maximum temperature as published (decimal comma).
    pub tmax: String,
}

impl DailyReading {
    /// Columns a reading adds to the master table, in order.
    pub const COLUMNS: [&'static str; 3] = ["fecha", "tmax", "fecha_txt"];

    pub fn values(&self) -> [&str; 3] {
        [&self.date, &self.tmax, &self.date_text]
    }
}

/// Parses the daily values payload of one station.
///
/// Objects without an `indicativo` are attributed to `station`.
pub fn parse_daily(text: &str, station: &str) -> Result<Vec<DailyReading>> {
    let text = text.trim_start_matches('\u{feff}').trim();
    let value: Value = serde_json::from_str(text)
        .with_context(|| format!("Daily values of {} are not JSON", station))?;

    let records = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => bail!("Unexpected daily values of {}: {}", station, other),
    };

    let readings = records
        .iter()
        .filter_map(Value::as_object)
        .map(|record| {
            let field = |key: &str| record.get(key).map(value_text).unwrap_or_default();

            let mut id = field(STATION_COLUMN);
            if id.is_empty() {
                id = station.to_string();
            }
            let date = field("fecha");
            let date_text = NaiveDate::parse_from_str(date.get(..10).unwrap_or(&date), "%Y-%m-%d")
                .map(long_date)
                .unwrap_or_default();

            DailyReading {
                station: id,
                date,
                date_text,
                tmax: field("tmax"),
            }
        })
        .collect();

    Ok(readings)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Station ids of the `indicativo` column: trimmed, upper-cased, unique, in file order.
pub fn read_station_ids(path: &Path) -> Result<Vec<String>> {
    let table = read_csv_table(path)?;
    let column = table
        .headers
        .iter()
        .position(|h| h == STATION_COLUMN)
        .with_context(|| format!("No `{}` column in {}", STATION_COLUMN, path.display()))?;

    let mut ids: Vec<String> = Vec::new();
    for row in &table.rows {
        let id = row.get(column).map(|v| v.trim().to_uppercase()).unwrap_or_default();
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }

    Ok(ids)
}

/// Reads a CSV file with `,` or `;` separators into a text table.
pub fn read_csv_table(path: &Path) -> Result<TextTable> {
    let bytes = fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;
    parse_csv_table(&String::from_utf8_lossy(&bytes))
        .with_context(|| format!("Could not parse {}", path.display()))
}

pub fn parse_csv_table(text: &str) -> Result<TextTable> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let mut row: Vec<String> = record?.iter().map(|cell| cell.trim().to_string()).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(TextTable { headers, rows })
}

fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

// -- Tests -------------------------------------------------------------------
