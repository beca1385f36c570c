//! Geocodes warning rows to zone polygons.

use geo::MultiPolygon;
use serde::Serialize;
use tracing::warn;

use crate::{
    geometry,
    warning::{Ranked, Severity, WarningRow},
};

use super::ZoneSet;

pub const PROVINCE_COLUMN: &str = "province";

#[derive(Debug, Clone, PartialEq)]
/// A warning row joined to exactly one zone polygon (WGS84, 2D, valid).
pub struct GeoWarning {
    pub warning: WarningRow,
    pub province: String,
    pub geometry: MultiPolygon<f64>,
}

impl GeoWarning {
    /// Row properties followed by the zone's province.
    pub fn properties(&self) -> Vec<(String, String)> {
        let mut properties = self.warning.properties();
        properties.push((PROVINCE_COLUMN.to_string(), self.province.clone()));

        properties
    }
}

impl Ranked for GeoWarning {
    fn severity(&self) -> Severity {
        self.warning.severity
    }

    fn start_time(&self) -> &str {
        &self.warning.start_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// No reference zone has this exact name.
    UnknownZone,
    /// The zone polygon stayed invalid after repair.
    InvalidGeometry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejected {
    pub reason: RejectReason,
    pub row: WarningRow,
}

#[derive(Debug, Default)]
pub struct JoinOutcome {
    pub matched: Vec<GeoWarning>,
    pub rejected: Vec<Rejected>,
}

/// Joins rows to zones on exact, case-sensitive zone name.
///
/// Rows that cannot be placed on the map are returned in `rejected`, in
/// input order, instead of being dropped.
pub fn join_zones(rows: Vec<WarningRow>, zones: &ZoneSet) -> JoinOutcome {
    let mut outcome = JoinOutcome::default();

    for row in rows {
        let Some(zone) = zones.get(&row.zone) else {
            warn!(zone = %row.zone, "warning zone not in reference");
            outcome.rejected.push(Rejected {
                reason: RejectReason::UnknownZone,
                row,
            });
            continue;
        };

        let repaired = geometry::repair(zone.geometry.clone()).filter(geometry::in_wgs84_bounds);
        match repaired {
            Some(geometry) => outcome.matched.push(GeoWarning {
                province: zone.province.clone(),
                warning: row,
                geometry,
            }),
            None => {
                warn!(zone = %row.zone, "zone geometry invalid after repair");
                outcome.rejected.push(Rejected {
                    reason: RejectReason::InvalidGeometry,
                    row,
                });
            }
        }
    }

    outcome
}

// -- Tests -------------------------------------------------------------------
