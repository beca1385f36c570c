//! AEMET CAP (Common Alerting Protocol) alerts from the open-data API.

pub mod parse;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Europe::Madrid;
use geo::MultiPolygon;

pub use parse::parse_alerts;

const SPANISH_STEMS: [&str; 20] = [
    "lluv",
    "viento",
    "torment",
    "costa",
    "interior",
    "noroeste",
    "aviso",
    "amarillo",
    "naranja",
    "rojo",
    "nieve",
    "granizo",
    "marejad",
    "oleaje",
    "precipit",
    "nev",
    "rachas",
    "temperatura",
    "máxima",
    "mínima",
];

#[derive(Debug, Clone, PartialEq)]
/// One polygon of one `info` block of a CAP alert.
pub struct CapAlert {
    pub identifier: String,
    pub sent: String,
    pub event: String,
    /// The info headline, or the event when the headline is empty.
    pub headline: String,
    pub severity: String,
    pub effective: String,
    pub expires: String,
    pub language: String,
    pub geometry: MultiPolygon<f64>,
}

impl CapAlert {
    pub fn properties(&self) -> Vec<(String, String)> {
        [
            ("identifier", &self.identifier),
            ("sent", &self.sent),
            ("event", &self.event),
            ("headline", &self.headline),
            ("severity", &self.severity),
            ("effective", &self.effective),
            ("expires", &self.expires),
            ("language", &self.language),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }

    /// True when the alert was sent on `today` (a Europe/Madrid date).
    pub fn sent_on(&self, today: NaiveDate) -> bool {
        sent_date(&self.sent) == Some(today)
    }

    pub fn is_spanish(&self) -> bool {
        self.language.to_lowercase().starts_with("es")
            || looks_spanish(&self.headline)
            || looks_spanish(&self.event)
    }
}

/// The Europe/Madrid calendar date of `now`.
pub fn madrid_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Madrid).date_naive()
}

/// Madrid date of an ISO 8601 timestamp. Timestamps without offset are UTC.
fn sent_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let utc = match DateTime::parse_from_rfc3339(text) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => {
            let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
                .ok()?;
            Utc.from_utc_datetime(&naive)
        }
    };

    Some(madrid_date(utc))
}

fn looks_spanish(text: &str) -> bool {
    let text = text.to_lowercase();
    if text.is_empty() {
        return false;
    }

    text.chars().any(|c| "áéíóúñ".contains(c))
        || SPANISH_STEMS.iter().any(|stem| text.contains(stem))
}

/// Keeps today's Spanish-language alerts, in document order.
pub fn select_current(alerts: Vec<CapAlert>, today: NaiveDate) -> Vec<CapAlert> {
    alerts
        .into_iter()
        .filter(|alert| alert.sent_on(today) && alert.is_spanish())
        .collect()
}

// -- Tests -------------------------------------------------------------------
