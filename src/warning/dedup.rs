//! Keeps one warning per key (zone or region) at the highest severity.

use std::collections::{HashMap, HashSet};

use clap::ValueEnum;

use super::Ranked;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
/// How to choose between rows of the same key and the same severity.
pub enum TieBreak {
    /// The row that came first in scrape order.
    #[default]
    FirstSeen,
    /// The row with the latest start time. Empty start times lose; equal
    /// start times fall back to scrape order.
    LatestStart,
}

/// Reduces `rows` to the winning row per key.
///
/// Output is ordered by descending severity, then by original position.
/// Applying it to its own output returns the output unchanged.
pub fn deduplicate_by<T, K>(rows: Vec<T>, tie: TieBreak, key: K) -> Vec<T>
where
    T: Ranked,
    K: Fn(&T) -> &str,
{
    let keep: HashSet<usize> = {
        let mut winners: HashMap<&str, usize> = HashMap::new();

        for (index, row) in rows.iter().enumerate() {
            let k = key(row);
            let replace = match winners.get(k) {
                None => true,
                Some(&current) => beats(row, &rows[current], tie),
            };
            if replace {
                winners.insert(k, index);
            }
        }

        winners.into_values().collect()
    };

    let mut kept: Vec<(usize, T)> = rows
        .into_iter()
        .enumerate()
        .filter(|(index, _)| keep.contains(index))
        .collect();

    kept.sort_by(|(ia, a), (ib, b)| b.severity().cmp(&a.severity()).then(ia.cmp(ib)));

    kept.into_iter().map(|(_, row)| row).collect()
}

// A later row only replaces the current winner when it is strictly better.
fn beats<T: Ranked>(challenger: &T, current: &T, tie: TieBreak) -> bool {
    if challenger.severity() != current.severity() {
        return challenger.severity() > current.severity();
    }

    match tie {
        TieBreak::FirstSeen => false,
        TieBreak::LatestStart => challenger.start_time() > current.start_time(),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::warning::{Severity, WarningRow};

    fn row(zone: &str, severity: Severity, start: &str, phenomenon: &str) -> WarningRow {
        WarningRow {
            zone: zone.to_string(),
            region: "Comunidad de Madrid".to_string(),
            start_time: start.to_string(),
            severity,
            phenomenon: phenomenon.to_string(),
            ..Default::default()
        }
    }

    fn by_zone(rows: Vec<WarningRow>, tie: TieBreak) -> Vec<WarningRow> {
        deduplicate_by(rows, tie, |r: &WarningRow| r.zone.as_str())
    }

    #[test]
    fn should_keep_highest_severity() {
        let rows = vec![
            row("Madrid", Severity::Riesgo, "10:00", "Lluvias"),
            row("Madrid", Severity::RiesgoImportante, "12:00", "Tormentas"),
        ];

        let result = by_zone(rows, TieBreak::FirstSeen);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].zone, "Madrid");
        assert_eq!(result[0].severity, Severity::RiesgoImportante);
        assert_eq!(result[0].severity.label(), "Riesgo importante");
    }

    #[test]
    fn should_never_downgrade_a_zone() {
        let rows = vec![
            row("Sierra", Severity::RiesgoImportante, "", "Nevadas"),
            row("Sierra", Severity::Riesgo, "", "Viento"),
            row("Sierra", Severity::None, "", "Otro"),
            row("Sur", Severity::None, "", "Otro"),
            row("Sur", Severity::RiesgoImportante, "", "Lluvias"),
        ];

        for tie in [TieBreak::FirstSeen, TieBreak::LatestStart] {
            let result = by_zone(rows.clone(), tie);
            assert_eq!(result.len(), 2);
            assert!(result.iter().all(|r| r.severity == Severity::RiesgoImportante));
        }
    }

    #[test]
    fn should_keep_first_seen_on_tie() {
        let rows = vec![
            row("Madrid", Severity::Riesgo, "08:00", "Lluvias"),
            row("Madrid", Severity::Riesgo, "18:00", "Tormentas"),
        ];

        let result = by_zone(rows, TieBreak::FirstSeen);
        assert_eq!(result[0].phenomenon, "Lluvias");
    }

    #[test]
    fn should_keep_latest_start_on_tie() {
        let rows = vec![
            row("Madrid", Severity::Riesgo, "08:00", "Lluvias"),
            row("Madrid", Severity::Riesgo, "18:00", "Tormentas"),
            row("Madrid", Severity::Riesgo, "", "Viento"),
            row("Madrid", Severity::Riesgo, "18:00", "Calor"),
        ];

        let result = by_zone(rows, TieBreak::LatestStart);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].phenomenon, "Tormentas");
    }

    #[test]
    fn should_order_by_severity_then_position() {
        let rows = vec![
            row("A", Severity::None, "", ""),
            row("B", Severity::Riesgo, "", ""),
            row("C", Severity::RiesgoImportante, "", ""),
            row("D", Severity::Riesgo, "", ""),
        ];

        let result = by_zone(rows, TieBreak::FirstSeen);
        let zones: Vec<&str> = result.iter().map(|r| r.zone.as_str()).collect();

        assert_eq!(zones, vec!["C", "B", "D", "A"]);
    }

    #[test]
    fn should_be_idempotent() {
        let rows = vec![
            row("Madrid", Severity::Riesgo, "09:00", "Lluvias"),
            row("Sur", Severity::None, "", "Otro"),
            row("Madrid", Severity::RiesgoImportante, "10:00", "Tormentas"),
            row("Sur", Severity::Riesgo, "11:00", "Viento"),
            row("Norte", Severity::Riesgo, "", "Oleaje"),
        ];

        for tie in [TieBreak::FirstSeen, TieBreak::LatestStart] {
            let once = by_zone(rows.clone(), tie);
            let twice = by_zone(once.clone(), tie);
            assert_eq!(once, twice);
        }
    }
}
