//! Polygon handling shared by the zone reference and the warnings join.
//!
//! Geometries are kept as `MultiPolygon<f64>` in WGS84. Converting GeoJSON
//! into geo types keeps only x and y, which is how Z ordinates are dropped.

pub mod crs;

use geo::{
    algorithm::{
        bool_ops::unary_union,
        orient::{Direction, Orient},
        Validation,
    },
    Area, Geometry, MultiPolygon,
};

pub use crs::{reproject, Crs};

/// Turns a GeoJSON geometry into a 2D multipolygon. Non-areal geometries give `None`.
pub fn to_multipolygon(geometry: &geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geometry = Geometry::<f64>::try_from(geometry.value.clone()).ok()?;
    areal(geometry)
}

fn areal(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => Some(multi),
        Geometry::GeometryCollection(collection) => {
            let polygons: Vec<_> = collection
                .into_iter()
                .filter_map(areal)
                .flat_map(|multi| multi.0)
                .collect();
            (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

/// Returns a valid, RFC 7946 oriented copy of `geometry`, or `None` when it
/// cannot be repaired.
///
/// Invalid input goes through a unary union, which resolves self
/// intersections and overlaps the way a zero-width buffer does. Parts
/// without area (collinear or repeated points) are dropped.
pub fn repair(geometry: MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    let geometry = if geometry.is_valid() {
        geometry
    } else {
        unary_union(geometry.0.iter())
    };

    let polygons = geometry
        .0
        .into_iter()
        .filter(|polygon| polygon.unsigned_area() > 0.0)
        .collect();
    let geometry = MultiPolygon::new(polygons).orient(Direction::Default);

    if geometry.0.is_empty() || !geometry.is_valid() {
        return None;
    }

    Some(geometry)
}

pub fn to_geojson(geometry: &MultiPolygon<f64>) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(geometry))
}

/// True when every coordinate lies in the longitude/latitude domain.
pub fn in_wgs84_bounds(geometry: &MultiPolygon<f64>) -> bool {
    use geo::CoordsIter;

    geometry
        .coords_iter()
        .all(|c| (-180.0..=180.0).contains(&c.x) && (-90.0..=90.0).contains(&c.y))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use geo::polygon;
    use serde_json::json;

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]])
    }

    #[test]
    fn should_keep_valid_geometry() {
        let repaired = repair(square(-3.8, 40.3, 0.2)).unwrap();
        assert!(repaired.is_valid());
        assert!((repaired.unsigned_area() - 0.04).abs() < 1e-9);
    }

    #[test]
    fn should_repair_bowtie() {
        let bowtie = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]);
        assert!(!bowtie.is_valid());

        let repaired = repair(bowtie).unwrap();
        assert!(repaired.is_valid());
        assert!(repaired.unsigned_area() > 0.0);
    }

    #[test]
    fn should_drop_collinear_rings() {
        let line = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ]]);
        assert!(repair(line).is_none());

        let mut mixed = square(-3.8, 40.3, 0.2);
        mixed.0.push(polygon![
            (x: -3.0, y: 40.0),
            (x: -2.9, y: 40.0),
            (x: -2.8, y: 40.0),
            (x: -3.0, y: 40.0),
        ]);
        let repaired = repair(mixed).unwrap();
        assert_eq!(repaired.0.len(), 1);
        assert!((repaired.unsigned_area() - 0.04).abs() < 1e-9);
    }

    #[test]
    fn should_orient_exterior_counter_clockwise() {
        let clockwise = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ]]);

        let repaired = repair(clockwise).unwrap();
        assert!(repaired.0[0].signed_area() > 0.0);
    }

    #[test]
    fn should_drop_z_when_reading_geojson() {
        let geometry: geojson::Geometry = serde_json::from_value(json!({
            "type": "Polygon",
            "coordinates": [[
                [-3.8, 40.3, 650.0],
                [-3.6, 40.3, 650.0],
                [-3.6, 40.5, 650.0],
                [-3.8, 40.3, 650.0]
            ]]
        }))
        .unwrap();

        let multi = to_multipolygon(&geometry).unwrap();
        let written = serde_json::to_value(to_geojson(&multi)).unwrap();

        for position in written["coordinates"][0][0].as_array().unwrap() {
            assert_eq!(position.as_array().unwrap().len(), 2);
        }
        assert_eq!(written["type"], "MultiPolygon");
    }

    #[test]
    fn should_ignore_non_areal_geometry() {
        let point = json!({ "type": "Point", "coordinates": [-3.7, 40.4] });
        let point: geojson::Geometry = serde_json::from_value(point).unwrap();
        assert!(to_multipolygon(&point).is_none());
    }

    #[test]
    fn should_check_wgs84_bounds() {
        assert!(in_wgs84_bounds(&square(-3.8, 40.3, 0.2)));
        assert!(!in_wgs84_bounds(&square(440_000.0, 4_470_000.0, 100.0)));
    }
}
