//! Spanish-language aggregate of the deduplicated warnings, for display.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use geo::ChamberlainDuquetteArea;
use serde::Serialize;

use crate::{
    format::{cardinal, decimal_comma, long_date},
    warning::{deduplicate_by, Severity, TieBreak},
    zones::GeoWarning,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
/// The highest-priority warning of one region.
pub struct RegionSummary {
    pub region: String,
    /// Lower-cased phenomenon.
    pub phenomenon: String,
    pub severity: Severity,
    /// `amarilla`, `naranja` or empty.
    pub colour: String,
    /// Area of the region's warned zones, km² with a decimal comma.
    pub area_km2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub region_count: usize,
    /// `region_count` as a Spanish word (0-9) or numeral.
    pub region_count_word: String,
    pub headline: String,
    /// Run date, e.g. `16 de octubre`.
    pub date: String,
    pub rows: Vec<RegionSummary>,
}

pub fn colour(severity: Severity) -> &'static str {
    match severity {
        Severity::Riesgo => "amarilla",
        Severity::RiesgoImportante => "naranja",
        Severity::None => "",
    }
}

/// Builds the summary of `warnings`, which should already hold one row per zone.
pub fn summarise(warnings: &[GeoWarning], tie: TieBreak, today: NaiveDate) -> Summary {
    let regions: BTreeSet<&str> = warnings
        .iter()
        .map(|w| w.warning.region.as_str())
        .filter(|r| !r.is_empty())
        .collect();
    let region_count = regions.len();

    let mut area_m2: HashMap<&str, f64> = HashMap::new();
    for warning in warnings {
        *area_m2.entry(warning.warning.region.as_str()).or_default() +=
            warning.geometry.chamberlain_duquette_unsigned_area();
    }

    let rows = deduplicate_by(warnings.to_vec(), tie, |w: &GeoWarning| w.warning.region.as_str())
        .into_iter()
        .filter(|w| !w.warning.region.is_empty())
        .map(|w| {
            let area = area_m2.get(w.warning.region.as_str()).copied().unwrap_or_default();
            RegionSummary {
                phenomenon: w.warning.phenomenon.to_lowercase(),
                severity: w.warning.severity,
                colour: colour(w.warning.severity).to_string(),
                area_km2: decimal_comma(area / 1_000_000.0, 1),
                region: w.warning.region,
            }
        })
        .collect();

    Summary {
        region_count,
        region_count_word: cardinal(region_count),
        headline: headline(region_count),
        date: long_date(today),
        rows,
    }
}

fn headline(region_count: usize) -> String {
    match region_count {
        0 => "Sin avisos activos".to_string(),
        1 => "Avisos activos en una comunidad".to_string(),
        n => format!("Avisos activos en {} comunidades", cardinal(n)),
    }
}

// -- Tests -------------------------------------------------------------------
