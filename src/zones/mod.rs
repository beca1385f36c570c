//! Named warning zones (inland and coastal) used to geocode warnings.

pub mod builder;
pub mod join;

use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use geo::MultiPolygon;
use geojson::{Feature, GeoJson};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    geometry::{self, Crs},
    output::features::{feature, write_feature_collection},
};

pub use builder::build_reference;
pub use join::{join_zones, GeoWarning, RejectReason, Rejected, PROVINCE_COLUMN};

const ZONE_KEYS: [&str; 2] = ["zone", "zona"];
const PROVINCE_KEYS: [&str; 2] = ["province", "PROVINCIA"];
const REGION_KEYS: [&str; 2] = ["region", "CCAA"];
const ORIGIN_KEYS: [&str; 2] = ["origin", "origen"];

#[derive(Debug, Clone, PartialEq)]
/// A named zone polygon. Geometry is WGS84, 2D and valid.
pub struct ZoneReference {
    pub zone: String,
    pub province: String,
    pub region: String,
    /// Dataset the zone came from (`zonas` or `zonas_costeras`).
    pub origin: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Default)]
/// The zone reference for one run. Lookups are by exact zone name.
pub struct ZoneSet {
    zones: Vec<ZoneReference>,
    by_name: HashMap<String, usize>,
}

impl ZoneSet {
    /// Builds the set. When a name repeats, the first zone wins lookups.
    pub fn new(zones: Vec<ZoneReference>) -> Self {
        let mut by_name = HashMap::new();
        for (index, zone) in zones.iter().enumerate() {
            if by_name.contains_key(&zone.zone) {
                debug!(zone = %zone.zone, "duplicate zone name in reference");
                continue;
            }
            by_name.insert(zone.zone.clone(), index);
        }

        ZoneSet { zones, by_name }
    }

    /// Loads a reference file written by [`ZoneSet::save`].
    ///
    /// Files keyed `zona` / `PROVINCIA` / `CCAA` / `origen` are read too.
    /// Features without a zone name are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let (crs, features) = read_features(path)?;

        let mut zones = Vec::with_capacity(features.len());
        let mut unnamed = 0;
        for feature in &features {
            let zone = first_property(feature, &ZONE_KEYS);
            if zone.is_empty() {
                unnamed += 1;
                continue;
            }
            let geometry = feature.geometry.as_ref().and_then(geometry::to_multipolygon);
            let Some(geometry) = geometry else {
                warn!(zone = %zone, "reference zone without polygon geometry skipped");
                continue;
            };
            let Some(geometry) = geometry::repair(geometry::reproject(&geometry, crs)) else {
                warn!(zone = %zone, "reference zone with unrepairable geometry skipped");
                continue;
            };

            zones.push(ZoneReference {
                zone,
                province: first_property(feature, &PROVINCE_KEYS),
                region: first_property(feature, &REGION_KEYS),
                origin: first_property(feature, &ORIGIN_KEYS),
                geometry,
            });
        }

        if unnamed > 0 {
            warn!(
                unnamed,
                file = %path.display(),
                "reference features without a zone name skipped"
            );
        }
        if unnamed > 0 && unnamed == features.len() {
            bail!(
                "No feature in {} has a zone name ({})",
                path.display(),
                ZONE_KEYS.join(" or ")
            );
        }

        Ok(ZoneSet::new(zones))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let features = self
            .zones
            .iter()
            .map(|z| {
                feature(
                    vec![
                        ("zone".to_string(), z.zone.clone()),
                        ("province".to_string(), z.province.clone()),
                        ("region".to_string(), z.region.clone()),
                        ("origin".to_string(), z.origin.clone()),
                    ],
                    &z.geometry,
                )
            })
            .collect();

        write_feature_collection(path, features)
    }

    pub fn get(&self, zone: &str) -> Option<&ZoneReference> {
        self.by_name.get(zone).map(|&i| &self.zones[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZoneReference> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Reads a GeoJSON FeatureCollection and its declared CRS.
pub fn read_features(path: &Path) -> Result<(Crs, Vec<Feature>)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Could not read zone file {}", path.display()))?;
    let geojson: GeoJson = text
        .parse()
        .with_context(|| format!("{} is not valid GeoJSON", path.display()))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => {
            let crs = Crs::from_geojson(collection.foreign_members.as_ref())
                .with_context(|| format!("In {}", path.display()))?;
            Ok((crs, collection.features))
        }
        _ => bail!("{} is not a FeatureCollection", path.display()),
    }
}

/// The first non-empty property among `keys`.
fn first_property(feature: &Feature, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| property_text(feature, key))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// A feature property as text. Numbers are formatted, missing or null values are empty.
pub fn property_text(feature: &Feature, key: &str) -> String {
    match feature.property(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// -- Tests -------------------------------------------------------------------
