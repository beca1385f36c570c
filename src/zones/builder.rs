//! Builds the zone reference from the inland and coastal zone datasets.

use std::path::Path;

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::geometry;

use super::{property_text, read_features, ZoneReference, ZoneSet};

pub const INLAND_ORIGIN: &str = "zonas";
pub const COASTAL_ORIGIN: &str = "zonas_costeras";

const ZONE_NAME: &str = "NOM_Z";
const PROVINCE_NAME: &str = "NOM_PROV";
const REGION_NAME: &str = "NOM_CCAA";

#[derive(Debug, Default, PartialEq)]
/// Counts of source features left out of the reference.
pub struct BuildReport {
    pub missing_geometry: usize,
    pub unrepairable: usize,
}

/// Merges both datasets into one WGS84 reference.
///
/// Each file is brought to WGS84 from its declared CRS, so the two end up in
/// a common CRS before they are concatenated.
pub fn build_reference(inland: &Path, coastal: &Path) -> Result<(ZoneSet, BuildReport)> {
    let mut zones = Vec::new();
    let mut report = BuildReport::default();

    for (path, origin) in [(inland, INLAND_ORIGIN), (coastal, COASTAL_ORIGIN)] {
        let (crs, features) = read_features(path)?;
        info!(file = %path.display(), ?crs, features = features.len(), "reading zones");

        for feature in &features {
            let zone = property_text(feature, ZONE_NAME);

            let geometry = feature.geometry.as_ref().and_then(geometry::to_multipolygon);
            let Some(geometry) = geometry else {
                report.missing_geometry += 1;
                continue;
            };

            let geometry = geometry::reproject(&geometry, crs);
            let repaired = geometry::repair(geometry).filter(geometry::in_wgs84_bounds);
            let Some(geometry) = repaired else {
                warn!(zone = %zone, origin, "zone geometry could not be repaired");
                report.unrepairable += 1;
                continue;
            };

            zones.push(ZoneReference {
                zone,
                province: property_text(feature, PROVINCE_NAME),
                region: property_text(feature, REGION_NAME),
                origin: origin.to_string(),
                geometry,
            });
        }
    }

    if zones.is_empty() {
        bail!("No usable zones in {} or {}", inland.display(), coastal.display());
    }

    Ok((ZoneSet::new(zones), report))
}

// -- Tests -------------------------------------------------------------------
