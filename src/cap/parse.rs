//! Streaming parse of CAP 1.2 alert documents.

use anyhow::{Context, Result};
use geo::{algorithm::Validation, Coord, LineString, MultiPolygon, Polygon};
use quick_xml::{events::Event, Reader};
use tracing::debug;

use crate::geometry;

use super::CapAlert;

#[derive(Default)]
struct InfoTmp {
    language: String,
    event: String,
    headline: String,
    severity: String,
    effective: String,
    expires: String,
    polygons: Vec<MultiPolygon<f64>>,
}

/// Returns one [`CapAlert`] per valid `polygon` of every `info` block.
///
/// Both a bare `alert` root and documents wrapping several alerts are read.
pub fn parse_alerts(xml: &[u8]) -> Result<Vec<CapAlert>> {
    let mut out = Vec::new();
    let mut r = Reader::from_reader(xml);
    r.trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut identifier = String::new();
    let mut sent = String::new();
    let mut info: Option<InfoTmp> = None;

    loop {
        match r
            .read_event_into(&mut buf)
            .with_context(|| format!("Malformed CAP document at byte {}", r.buffer_position()))?
        {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                match name.as_str() {
                    "alert" => {
                        identifier.clear();
                        sent.clear();
                    }
                    "info" => info = Some(InfoTmp::default()),
                    _ => {}
                }
                path.push(name);
            }
            Event::End(_) => {
                if path.pop().as_deref() == Some("info") {
                    if let Some(done) = info.take() {
                        emit(&mut out, &identifier, &sent, done);
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape().unwrap_or_default().to_string();
                let Some(tag) = path.last() else { continue };
                let parent = path.len().checked_sub(2).map(|i| path[i].as_str());

                match (parent, tag.as_str()) {
                    (Some("alert"), "identifier") => identifier = text,
                    (Some("alert"), "sent") => sent = text,
                    (_, "polygon") => {
                        if let Some(info) = info.as_mut() {
                            match parse_polygon(&text) {
                                Some(polygon) => info.polygons.push(polygon),
                                None => {
                                    debug!(identifier = %identifier, "skipping invalid CAP polygon")
                                }
                            }
                        }
                    }
                    (Some("info"), field) => {
                        if let Some(info) = info.as_mut() {
                            match field {
                                "language" => info.language = text,
                                "event" => info.event = text,
                                "headline" => info.headline = text,
                                "severity" => info.severity = text,
                                "effective" => info.effective = text,
                                "expires" => info.expires = text,
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn emit(out: &mut Vec<CapAlert>, identifier: &str, sent: &str, info: InfoTmp) {
    let headline = if info.headline.is_empty() {
        info.event.clone()
    } else {
        info.headline
    };

    for polygon in info.polygons {
        out.push(CapAlert {
            identifier: identifier.to_string(),
            sent: sent.to_string(),
            event: info.event.clone(),
            headline: headline.clone(),
            severity: info.severity.clone(),
            effective: info.effective.clone(),
            expires: info.expires.clone(),
            language: info.language.clone(),
            geometry: polygon,
        });
    }
}

/// Parses `"lat,lon lat,lon ..."` into a closed lon/lat ring.
///
/// Any malformed pair, or a ring that is not a valid polygon, gives `None`.
pub fn parse_polygon(text: &str) -> Option<MultiPolygon<f64>> {
    let points = text
        .split_whitespace()
        .map(|pair| {
            let (lat, lon) = pair.split_once(',')?;
            Some(Coord {
                x: lon.trim().parse::<f64>().ok()?,
                y: lat.trim().parse::<f64>().ok()?,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    if points.len() < 3 {
        return None;
    }

    // `Polygon::new` closes the ring when the last point differs from the first.
    let polygon = Polygon::new(LineString::from(points), vec![]);
    if !polygon.is_valid() {
        return None;
    }

    geometry::repair(MultiPolygon::new(vec![polygon]))
}

// -- Tests -------------------------------------------------------------------
