//! GeoJSON FeatureCollection writing (WGS84, 2D, RFC 7946 winding).

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};

use crate::geometry;

/// A feature with string properties, in the given order.
pub fn feature(properties: Vec<(String, String)>, geometry: &MultiPolygon<f64>) -> Feature {
    let properties: JsonObject = properties
        .into_iter()
        .map(|(k, v)| (k, JsonValue::String(v)))
        .collect();

    Feature {
        bbox: None,
        geometry: Some(geometry::to_geojson(geometry)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Writes `features` to `path`, replacing any previous file.
pub fn write_feature_collection(path: &Path, features: Vec<Feature>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let file = File::create(path).with_context(|| format!("Could not create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
