//! Warning rows scraped from the AEMET warnings table.

pub mod dedup;
pub mod normalize;
pub mod severity;

use serde::Serialize;

pub use dedup::{deduplicate_by, TieBreak};
pub use normalize::{normalize_rows, normalized_headers};
pub use severity::Severity;

pub const ZONE_COLUMN: &str = "zone";
pub const REGION_COLUMN: &str = "region";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// A scraped warning after normalization.
pub struct WarningRow {
    pub zone: String,
    pub region: String,
    /// `HH:MM` or empty.
    pub start_time: String,
    /// `HH:MM` or empty.
    pub end_time: String,
    pub severity: Severity,
    pub phenomenon: String,
    /// Remaining columns in table order, time columns already normalized.
    pub columns: Vec<(String, String)>,
}

impl WarningRow {
    /// All non-geometry fields, `zone` and `region` first.
    pub fn properties(&self) -> Vec<(String, String)> {
        let mut properties = vec![
            (ZONE_COLUMN.to_string(), self.zone.clone()),
            (REGION_COLUMN.to_string(), self.region.clone()),
        ];
        properties.extend(self.columns.iter().cloned());

        properties
    }
}

/// Anything that can be ranked by warning severity.
pub trait Ranked {
    fn severity(&self) -> Severity;
    fn start_time(&self) -> &str;
}

impl Ranked for WarningRow {
    fn severity(&self) -> Severity {
        self.severity
    }

    fn start_time(&self) -> &str {
        &self.start_time
    }
}
