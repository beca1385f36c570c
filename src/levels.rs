//! Merges hourly warning-level cells into readable per-zone time ranges.

use std::{collections::BTreeMap, sync::OnceLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use regex::Regex;
use tracing::debug;

use crate::scrape::{levels::NO_LEVEL, LevelSlot};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneLevels {
    pub zone: String,
    /// `"Nivel 2 de 10:00 a 13:00 | Nivel 3 de 14:00 a 14:00"`.
    pub ranges: String,
}

/// Summarises level cells per zone, zones in name order.
///
/// Cells without a level or with an unreadable timestamp are dropped. Within
/// a zone, runs are grouped by level and calendar date and split wherever
/// two consecutive hours are not exactly one hour apart.
pub fn summarise_levels(slots: &[LevelSlot]) -> Vec<ZoneLevels> {
    let mut grouped: BTreeMap<&str, BTreeMap<&str, BTreeMap<NaiveDate, Vec<NaiveDateTime>>>> =
        BTreeMap::new();

    for slot in slots.iter().filter(|s| s.level != NO_LEVEL) {
        let Some(at) = parse_timestamp(&slot.timestamp) else {
            debug!(zone = %slot.zone, timestamp = %slot.timestamp, "unreadable level timestamp");
            continue;
        };

        grouped
            .entry(slot.zone.as_str())
            .or_default()
            .entry(slot.level.as_str())
            .or_default()
            .entry(at.date())
            .or_default()
            .push(at);
    }

    grouped
        .into_iter()
        .map(|(zone, by_level)| {
            let mut parts = Vec::new();
            for (level, by_date) in by_level {
                let label = level_label(level);
                for (_, mut hours) in by_date {
                    hours.sort();
                    hours.dedup();
                    for (start, end) in hourly_runs(&hours) {
                        parts.push(format!(
                            "{} de {} a {}",
                            label,
                            start.format("%H:%M"),
                            end.format("%H:%M")
                        ));
                    }
                }
            }

            ZoneLevels {
                zone: zone.to_string(),
                ranges: parts.join(" | "),
            }
        })
        .collect()
}

/// Splits sorted hours into `(first, last)` runs of consecutive hours.
pub fn hourly_runs(hours: &[NaiveDateTime]) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut runs = Vec::new();
    let Some((&first, rest)) = hours.split_first() else {
        return runs;
    };

    let (mut start, mut end) = (first, first);
    for &at in rest {
        if at - end == TimeDelta::hours(1) {
            end = at;
        } else {
            runs.push((start, end));
            start = at;
            end = at;
        }
    }
    runs.push((start, end));

    runs
}

/// `rs-nivel-2` → `Nivel 2`. Other classes are shown as they are.
pub fn level_label(level: &str) -> String {
    static LEVEL: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = LEVEL.get_or_init(|| Regex::new(r"rs-nivel-(\d+)").ok());

    pattern
        .as_ref()
        .and_then(|re| re.captures(level))
        .map(|caps| format!("Nivel {}", &caps[1]))
        .unwrap_or_else(|| level.to_string())
}

/// Local wall-clock time of a `data-rs-fecha` value.
fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn slot(zone: &str, timestamp: &str, level: &str) -> LevelSlot {
        LevelSlot {
            zone: zone.to_string(),
            timestamp: timestamp.to_string(),
            level: level.to_string(),
        }
    }

    fn at(text: &str) -> NaiveDateTime {
        parse_timestamp(text).unwrap()
    }

    #[test]
    fn should_merge_consecutive_hours() {
        let hours = [at("2026-10-16T10:00"), at("2026-10-16T11:00"), at("2026-10-16T12:00")];
        assert_eq!(hourly_runs(&hours), vec![(hours[0], hours[2])]);
    }

    #[test]
    fn should_split_runs_at_gaps() {
        let hours = [at("2026-10-16T10:00"), at("2026-10-16T11:00"), at("2026-10-16T14:00")];
        let runs = hourly_runs(&hours);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1], (hours[2], hours[2]));
        assert!(hourly_runs(&[]).is_empty());
    }

    #[test]
    fn should_summarise_per_zone() {
        let slots = vec![
            slot("Litoral de Cádiz", "2026-10-16T11:00:00", "rs-nivel-2"),
            slot("Litoral de Cádiz", "2026-10-16T10:00:00", "rs-nivel-2"),
            slot("Litoral de Cádiz", "2026-10-16T12:00:00", NO_LEVEL),
            slot("Litoral de Cádiz", "2026-10-16T14:00:00", "rs-nivel-3"),
            slot("Campiña gaditana", "2026-10-16T09:00:00", "rs-nivel-1"),
            slot("Sin avisos", "2026-10-16T09:00:00", NO_LEVEL),
        ];

        let summary = summarise_levels(&slots);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].zone, "Campiña gaditana");
        assert_eq!(summary[0].ranges, "Nivel 1 de 09:00 a 09:00");
        assert_eq!(
            summary[1].ranges,
            "Nivel 2 de 10:00 a 11:00 | Nivel 3 de 14:00 a 14:00"
        );
    }

    #[test]
    fn should_split_runs_at_date_change() {
        let slots = vec![
            slot("Menorca", "2026-10-16T23:00:00", "rs-nivel-2"),
            slot("Menorca", "2026-10-17T00:00:00", "rs-nivel-2"),
        ];

        let summary = summarise_levels(&slots);

        assert_eq!(
            summary[0].ranges,
            "Nivel 2 de 23:00 a 23:00 | Nivel 2 de 00:00 a 00:00"
        );
    }

    #[test]
    fn should_drop_unreadable_timestamps() {
        let slots = vec![
            slot("Menorca", "mañana", "rs-nivel-2"),
            slot("Menorca", "2026-10-16T08:00:00+02:00", "rs-nivel-2"),
        ];

        assert_eq!(summarise_levels(&slots)[0].ranges, "Nivel 2 de 08:00 a 08:00");
    }

    #[test]
    fn should_label_levels() {
        assert_eq!(level_label("rs-nivel-2"), "Nivel 2");
        assert_eq!(level_label("rs-nivel-x"), "rs-nivel-x");
    }
}
