//! Coordinate reference systems found in the zone datasets, and their
//! inverse projection to WGS84 longitude/latitude.

use anyhow::{bail, Result};
use geo::{Coord, MapCoords, MultiPolygon};
use geojson::JsonObject;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const GRS80_F: f64 = 1.0 / 298.257_222_101;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crs {
    /// EPSG:4326, EPSG:4258 and OGC CRS84: already longitude/latitude.
    Wgs84,
    /// EPSG:3857.
    WebMercator,
    /// Northern-hemisphere UTM on the given ellipsoid flattening.
    Utm { zone: u8, flattening: f64 },
}

impl Crs {
    pub fn from_epsg(code: u32) -> Result<Self> {
        let crs = match code {
            4326 | 4258 => Crs::Wgs84,
            3857 | 900913 => Crs::WebMercator,
            25828..=25831 => Crs::Utm {
                zone: (code - 25800) as u8,
                flattening: GRS80_F,
            },
            32628..=32631 => Crs::Utm {
                zone: (code - 32600) as u8,
                flattening: WGS84_F,
            },
            other => bail!("Unsupported CRS EPSG:{}", other),
        };

        Ok(crs)
    }

    /// Parses `EPSG:25830`, `urn:ogc:def:crs:EPSG::25830` or `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.to_uppercase().ends_with("CRS84") {
            return Ok(Crs::Wgs84);
        }

        match name.rsplit(':').next().map(str::parse::<u32>) {
            Some(Ok(code)) if name.to_uppercase().contains("EPSG") => Crs::from_epsg(code),
            _ => bail!("Unrecognised CRS name `{}`", name),
        }
    }

    /// Reads the legacy `crs` member of a GeoJSON object. Without one, RFC 7946 says WGS84.
    pub fn from_geojson(foreign_members: Option<&JsonObject>) -> Result<Self> {
        let name = foreign_members
            .and_then(|members| members.get("crs"))
            .and_then(|crs| crs.get("properties"))
            .and_then(|properties| properties.get("name"))
            .and_then(|name| name.as_str());

        match name {
            Some(name) => Crs::parse(name),
            None => Ok(Crs::Wgs84),
        }
    }

    pub fn to_wgs84(&self, coord: Coord<f64>) -> Coord<f64> {
        match *self {
            Crs::Wgs84 => coord,
            Crs::WebMercator => web_mercator_to_wgs84(coord),
            Crs::Utm { zone, flattening } => utm_to_wgs84(coord, zone, flattening),
        }
    }
}

pub fn reproject(geometry: &MultiPolygon<f64>, crs: Crs) -> MultiPolygon<f64> {
    if crs == Crs::Wgs84 {
        return geometry.clone();
    }
    geometry.map_coords(|c| crs.to_wgs84(c))
}

fn web_mercator_to_wgs84(coord: Coord<f64>) -> Coord<f64> {
    let lon = (coord.x / WGS84_A).to_degrees();
    let lat = (2.0 * (coord.y / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();

    Coord { x: lon, y: lat }
}

// Inverse transverse mercator (Snyder, USGS PP 1395, eqs. 8-17 to 8-25).
fn utm_to_wgs84(coord: Coord<f64>, zone: u8, flattening: f64) -> Coord<f64> {
    let e2 = flattening * (2.0 - flattening);
    let ep2 = e2 / (1.0 - e2);
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let x = coord.x - UTM_FALSE_EASTING;
    let m = coord.y / UTM_K0;
    let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin1 = phi1.sin();
    let cos1 = phi1.cos();
    let tan1 = phi1.tan();

    let n1 = WGS84_A / (1.0 - e2 * sin1 * sin1).sqrt();
    let t1 = tan1 * tan1;
    let c1 = ep2 * cos1 * cos1;
    let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
    let d = x / (n1 * UTM_K0);

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);

    let lon0 = (zone as f64 * 6.0 - 183.0).to_radians();
    let lon = lon0
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
                / 120.0)
            / cos1;

    Coord {
        x: lon.to_degrees(),
        y: lat.to_degrees(),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn assert_close(actual: Coord<f64>, lon: f64, lat: f64) {
        assert!((actual.x - lon).abs() < 1e-4, "lon {} != {}", actual.x, lon);
        assert!((actual.y - lat).abs() < 1e-4, "lat {} != {}", actual.y, lat);
    }

    #[test]
    fn should_parse_crs_names() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::Wgs84);
        assert_eq!(Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(), Crs::Wgs84);
        assert_eq!(Crs::parse("urn:ogc:def:crs:EPSG::3857").unwrap(), Crs::WebMercator);
        assert!(matches!(
            Crs::parse("urn:ogc:def:crs:EPSG::25830").unwrap(),
            Crs::Utm { zone: 30, .. }
        ));
        assert!(Crs::parse("EPSG:2154").is_err());
        assert!(Crs::parse("lambert").is_err());
    }

    #[test]
    fn should_default_to_wgs84_without_crs_member() {
        assert_eq!(Crs::from_geojson(None).unwrap(), Crs::Wgs84);

        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            json!({ "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::25830" } }),
        );
        assert!(matches!(
            Crs::from_geojson(Some(&members)).unwrap(),
            Crs::Utm { zone: 30, .. }
        ));
    }

    #[test]
    fn should_invert_utm_on_central_meridian() {
        // Zone 30 central meridian is 3°W; the equator maps to northing 0.
        let crs = Crs::from_epsg(25830).unwrap();
        assert_close(crs.to_wgs84(Coord { x: 500_000.0, y: 0.0 }), -3.0, 0.0);
    }

    #[test]
    fn should_invert_utm_in_madrid() {
        let crs = Crs::from_epsg(25830).unwrap();
        let coord = crs.to_wgs84(Coord { x: 440_291.0, y: 4_474_254.0 });

        assert!((coord.x - -3.7035).abs() < 0.01);
        assert!((coord.y - 40.4169).abs() < 0.01);
    }

    #[test]
    fn should_invert_web_mercator() {
        let crs = Crs::WebMercator;
        assert_close(crs.to_wgs84(Coord { x: 0.0, y: 0.0 }), 0.0, 0.0);

        let coord = crs.to_wgs84(Coord { x: -412_270.0, y: 4_926_700.0 });
        assert!((coord.x - -3.7035).abs() < 0.01);
        assert!((coord.y - 40.4169).abs() < 0.01);
    }
}
