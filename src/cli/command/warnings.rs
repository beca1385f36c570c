//! Scrape the warnings table, geocode it and publish one row per zone.

use std::fs;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::{
    cap::madrid_date,
    cli::{
        command::{make_snapshot_file_name, snapshot_stamp, upload_to_sheets},
        create_spinner,
    },
    config::Config,
    output::{
        self,
        features::{feature, write_feature_collection},
        TextTable,
    },
    parquet,
    scrape::{render_page, RawTable},
    summary::{summarise, Summary},
    warning::{deduplicate_by, normalize_rows, normalized_headers, TieBreak},
    zones::{join_zones, GeoWarning, Rejected, ZoneSet, PROVINCE_COLUMN},
};

pub const GEOJSON_FILE: &str = "MAPA_AVISOS_AEMET.geojson";
pub const WARNINGS_FILE: &str = "avisos_aemet.parquet";
pub const SUMMARY_FILE: &str = "avisos_aemet_resumen.parquet";
pub const SUMMARY_JSON_FILE: &str = "avisos_aemet_resumen.json";
pub const SHEET_TAB: &str = "avisos_aemet";

#[derive(Debug)]
/// Result of turning a scraped table into map-ready warnings.
pub struct Processed {
    /// Published column names, known even when nothing matched.
    pub headers: Vec<String>,
    /// One warning per zone, highest severity first.
    pub warnings: Vec<GeoWarning>,
    pub rejected: Vec<Rejected>,
}

/// Normalizes, joins and deduplicates a scraped warnings table.
pub fn process(table: &RawTable, zones: &ZoneSet, tie: TieBreak) -> Processed {
    let mut headers = normalized_headers(table);
    headers.push(PROVINCE_COLUMN.to_string());

    let rows = normalize_rows(table);
    let outcome = join_zones(rows, zones);
    let warnings = deduplicate_by(outcome.matched, tie, |w: &GeoWarning| w.warning.zone.as_str());

    Processed {
        headers,
        warnings,
        rejected: outcome.rejected,
    }
}

/// The warnings as published to Sheets, one row per zone.
pub fn warnings_table(processed: &Processed) -> TextTable {
    let records: Vec<_> = processed.warnings.iter().map(GeoWarning::properties).collect();
    TextTable::with_headers(processed.headers.clone(), &records)
}

pub async fn warnings(config: &Config, url: &str, table_locator: &str) -> Result<String> {
    if !config.reference.exists() {
        bail!(
            "Zone reference {} does not exist. Run the `zones` command first.",
            config.reference.display()
        );
    }
    let zones = ZoneSet::load(&config.reference)?;
    if zones.is_empty() {
        bail!("Zone reference {} holds no usable zones", config.reference.display());
    }

    let bar = create_spinner("Rendering warnings page...".to_string());
    let html = render_page(&config.browser, url, table_locator).await?;
    let table = RawTable::from_html(&html, table_locator)?;
    bar.finish_with_message(format!("{} warning rows scraped", table.rows.len()));
    if table.is_empty() {
        warn!(columns = table.width(), "warnings table has no rows");
    }

    let processed = process(&table, &zones, config.tie_break);
    info!(
        zones = processed.warnings.len(),
        rejected = processed.rejected.len(),
        "warnings geocoded"
    );

    let geojson_path = config.output_file(GEOJSON_FILE);
    let features = processed
        .warnings
        .iter()
        .map(|w| feature(w.properties(), &w.geometry))
        .collect();
    write_feature_collection(&geojson_path, features)?;

    let rejected_path = output::rejected_path(&geojson_path);
    if !processed.rejected.is_empty() {
        warn!(
            rejected = processed.rejected.len(),
            file = %rejected_path.display(),
            "some warnings could not be placed on the map"
        );
    }
    output::write_json(&rejected_path, &processed.rejected)?;

    save_tables(config, &processed.warnings)?;

    if config.sheets.enabled {
        let bar = create_spinner("Uploading to Google Sheets...".to_string());
        match upload_to_sheets(config, SHEET_TAB, &warnings_table(&processed)).await {
            Ok(tab) => bar.finish_with_message(format!("Uploaded to tab `{}`", tab)),
            Err(e) => {
                bar.finish_and_clear();
                error!("Google Sheets upload failed: {:#}", e);
            }
        }
    }

    Ok(geojson_path.to_string_lossy().to_string())
}

fn save_tables(config: &Config, warnings: &[GeoWarning]) -> Result<()> {
    let now = Utc::now();

    let warnings_path = config.output_file(WARNINGS_FILE);
    parquet::save_warnings(warnings, &warnings_path)?;
    let snapshot = make_snapshot_file_name(&warnings_path, &snapshot_stamp(now));
    fs::copy(&warnings_path, &snapshot)
        .with_context(|| format!("Could not write snapshot {}", snapshot.display()))?;

    let summary = summarise(warnings, config.tie_break, madrid_date(now));
    info!(headline = %summary.headline, date = %summary.date, "summary");
    parquet::save_table(&summary_table(&summary), &config.output_file(SUMMARY_FILE))?;
    output::write_json(&config.output_file(SUMMARY_JSON_FILE), &summary)?;

    Ok(())
}

/// One row per region, the headline and date repeated on every row.
pub fn summary_table(summary: &Summary) -> TextTable {
    let headers = [
        "region",
        "phenomenon",
        "severity",
        "colour",
        "area_km2",
        "region_count",
        "headline",
        "date",
    ]
    .map(String::from)
    .to_vec();

    let rows = summary
        .rows
        .iter()
        .map(|r| {
            vec![
                r.region.clone(),
                r.phenomenon.clone(),
                r.severity.label().to_string(),
                r.colour.clone(),
                r.area_km2.clone(),
                summary.region_count_word.clone(),
                summary.headline.clone(),
                summary.date.clone(),
            ]
        })
        .collect();

    TextTable { headers, rows }
}

// -- Tests -------------------------------------------------------------------
