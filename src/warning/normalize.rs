//! Turns a scraped warnings table into [`WarningRow`]s.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;

use crate::{format::normalize_name, scrape::RawTable};

use super::{Severity, WarningRow, REGION_COLUMN, ZONE_COLUMN};

const DROPPED_COLUMNS: [&str; 2] = ["probabilidad", "comentario"];
const ZONE_COLUMNS: [&str; 4] = ["zona de avisos", "zona de aviso", "zona avisos", "zona"];
const START_COLUMNS: [&str; 3] = ["hora de comienzo", "hora comienzo", "inicio"];
const END_COLUMNS: [&str; 3] = ["hora de finalizacion", "hora finalizacion", "fin"];
const SEVERITY_COLUMNS: [&str; 2] = ["nivel de riesgo", "nivel"];
const PHENOMENON_COLUMNS: [&str; 2] = ["fenomeno", "fenomenos"];

const ZONE_SEPARATORS: [&str; 3] = [" - ", " – ", " — "];

const DATETIME_FORMATS: [&str; 10] = [
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M",
];
const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Column roles found in a table header.
#[derive(Debug, Default)]
struct Layout {
    kept: Vec<usize>,
    zone: Option<usize>,
    start: Option<usize>,
    end: Option<usize>,
    severity: Option<usize>,
    phenomenon: Option<usize>,
}

impl Layout {
    fn from_headers(headers: &[String]) -> Self {
        let names: Vec<String> = headers.iter().map(|h| normalize_name(h)).collect();
        let kept: Vec<usize> = (0..names.len())
            .filter(|&i| !DROPPED_COLUMNS.contains(&names[i].as_str()))
            .collect();

        let find = |candidates: &[&str]| {
            kept.iter()
                .copied()
                .find(|&i| candidates.contains(&names[i].as_str()))
        };

        Layout {
            zone: find(&ZONE_COLUMNS[..]),
            start: find(&START_COLUMNS[..]),
            end: find(&END_COLUMNS[..]),
            severity: find(&SEVERITY_COLUMNS[..]),
            phenomenon: find(&PHENOMENON_COLUMNS[..]),
            kept,
        }
    }
}

/// Normalizes every row of a scraped table.
///
/// Irrelevant columns are dropped, the zone column is split into zone and
/// region, and start/end times are coerced to `HH:MM` (or `""`).
pub fn normalize_rows(table: &RawTable) -> Vec<WarningRow> {
    let layout = Layout::from_headers(&table.headers);

    table
        .rows
        .iter()
        .map(|row| normalize_row(&table.headers, row, &layout))
        .collect()
}

/// Column names of the normalized rows, `zone` and `region` first.
///
/// Depends only on the table header, so it is known even without rows.
pub fn normalized_headers(table: &RawTable) -> Vec<String> {
    let layout = Layout::from_headers(&table.headers);

    let mut headers = vec![ZONE_COLUMN.to_string(), REGION_COLUMN.to_string()];
    headers.extend(
        layout
            .kept
            .iter()
            .filter(|&&i| Some(i) != layout.zone)
            .map(|&i| table.headers[i].clone()),
    );

    headers
}

fn normalize_row(headers: &[String], row: &[String], layout: &Layout) -> WarningRow {
    let cell = |index: Option<usize>| {
        index
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .unwrap_or_default()
    };

    let (zone, region) = split_zone(cell(layout.zone));
    let start_time = normalize_time(cell(layout.start));
    let end_time = normalize_time(cell(layout.end));

    let columns = layout
        .kept
        .iter()
        .filter(|&&i| Some(i) != layout.zone)
        .map(|&i| {
            let value = if Some(i) == layout.start {
                start_time.clone()
            } else if Some(i) == layout.end {
                end_time.clone()
            } else {
                row.get(i).cloned().unwrap_or_default()
            };
            (headers[i].clone(), value)
        })
        .collect();

    WarningRow {
        zone,
        region,
        start_time,
        end_time,
        severity: Severity::from_label(cell(layout.severity)),
        phenomenon: cell(layout.phenomenon).to_string(),
        columns,
    }
}

/// Splits `"Alicante – Comunidad Valenciana"` into zone and region.
///
/// The split happens at the first spaced hyphen, en dash or em dash; without one the
/// whole text is the zone and the region is empty.
pub fn split_zone(text: &str) -> (String, String) {
    let split = ZONE_SEPARATORS
        .iter()
        .filter_map(|sep| text.find(sep).map(|at| (at, sep.len())))
        .min_by_key(|(at, _)| *at);

    match split {
        Some((at, len)) => (
            text[..at].trim().to_string(),
            text[at + len..].trim().to_string(),
        ),
        None => (text.trim().to_string(), String::new()),
    }
}

/// Coerces free text to `HH:MM`, or `""` when no time can be found.
pub fn normalize_time(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    if let Some(time) = parse_day_first(text) {
        return format!("{:02}:{:02}", time.hour(), time.minute());
    }

    time_in_text(text).unwrap_or_default()
}

fn parse_day_first(text: &str) -> Option<NaiveTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.time());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .map(|dt| dt.time())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .and_then(|_| NaiveTime::from_hms_opt(0, 0, 0))
        })
        .or_else(|| {
            TIME_FORMATS
                .iter()
                .find_map(|f| NaiveTime::parse_from_str(text, f).ok())
        })
}

fn time_in_text(text: &str) -> Option<String> {
    static TIME: OnceLock<Regex> = OnceLock::new();
    let re = TIME.get_or_init(|| Regex::new(r"(\d{1,2}):(\d{2})").expect("valid time pattern"));

    let caps = re.captures(text)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)?;

    Some(format!("{:02}:{:02}", hour, minute))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn table_fixture() -> RawTable {
        let headers = [
            "Zona de avisos",
            "Fenómeno",
            "Nivel de riesgo",
            "Probabilidad",
            "Hora de comienzo",
            "Hora de finalización",
            "Comentario",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let rows = vec![
            vec![
                "Alicante – Comunidad Valenciana",
                "Lluvias",
                "Riesgo",
                "40%-70%",
                "16/10/2026 14:30",
                "jueves 16, 23:59 h",
                "Acumulados de 80 mm",
            ],
            vec![
                "Madrid - Comunidad de Madrid",
                "Tormentas",
                "Riesgo importante",
                "",
                "9:05",
                "sin hora",
                "",
            ],
        ]
        .into_iter()
        .map(|r| r.into_iter().map(String::from).collect())
        .collect();

        RawTable::from_cells(headers, rows)
    }

    #[test]
    fn should_split_zone_and_region() {
        assert_eq!(
            split_zone("Alicante – Comunidad Valenciana"),
            ("Alicante".to_string(), "Comunidad Valenciana".to_string())
        );
        assert_eq!(
            split_zone("Albacete - Castilla-La Mancha"),
            ("Albacete".to_string(), "Castilla-La Mancha".to_string())
        );
        assert_eq!(
            split_zone("Cádiz — Andalucía"),
            ("Cádiz".to_string(), "Andalucía".to_string())
        );
        assert_eq!(split_zone(" Menorca "), ("Menorca".to_string(), String::new()));
    }

    #[test]
    fn should_normalize_times() {
        assert_eq!(normalize_time("16/10/2026 14:30"), "14:30");
        assert_eq!(normalize_time("2026-10-16T08:00:00+02:00"), "08:00");
        assert_eq!(normalize_time("jueves 16, 23:59 h"), "23:59");
        assert_eq!(normalize_time("desde las 7:05"), "07:05");
        assert_eq!(normalize_time("16/10/2026"), "00:00");
        assert_eq!(normalize_time("sin hora"), "");
        assert_eq!(normalize_time(""), "");
    }

    #[test]
    fn should_be_idempotent_on_times() {
        for input in ["14:30", "16/10/2026 09:15", "a las 7:05", "nada"] {
            let once = normalize_time(input);
            assert_eq!(normalize_time(&once), once);
        }
        assert_eq!(normalize_time("14:30"), "14:30");
    }

    #[test]
    fn should_normalize_rows() {
        let rows = normalize_rows(&table_fixture());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].zone, "Alicante");
        assert_eq!(rows[0].region, "Comunidad Valenciana");
        assert_eq!(rows[0].start_time, "14:30");
        assert_eq!(rows[0].end_time, "23:59");
        assert_eq!(rows[0].severity, Severity::Riesgo);
        assert_eq!(rows[0].phenomenon, "Lluvias");

        assert_eq!(rows[1].start_time, "09:05");
        assert_eq!(rows[1].end_time, "");
        assert_eq!(rows[1].severity, Severity::RiesgoImportante);
    }

    #[test]
    fn should_drop_irrelevant_columns() {
        let rows = normalize_rows(&table_fixture());
        let names: Vec<&str> = rows[0].columns.iter().map(|(k, _)| k.as_str()).collect();

        assert_eq!(
            names,
            vec!["Fenómeno", "Nivel de riesgo", "Hora de comienzo", "Hora de finalización"]
        );
    }

    #[test]
    fn should_put_zone_and_region_first() {
        let rows = normalize_rows(&table_fixture());
        let properties = rows[0].properties();

        assert_eq!(properties[0], ("zone".to_string(), "Alicante".to_string()));
        assert_eq!(properties[1], ("region".to_string(), "Comunidad Valenciana".to_string()));
        assert_eq!(properties[4], ("Hora de comienzo".to_string(), "14:30".to_string()));
    }

    #[test]
    fn should_derive_headers_without_rows() {
        let mut table = table_fixture();
        table.rows.clear();

        assert_eq!(
            normalized_headers(&table),
            vec![
                "zone",
                "region",
                "Fenómeno",
                "Nivel de riesgo",
                "Hora de comienzo",
                "Hora de finalización",
            ]
        );
    }

    #[test]
    fn should_match_row_properties_to_headers() {
        let table = table_fixture();
        let keys: Vec<String> = normalize_rows(&table)[0]
            .properties()
            .into_iter()
            .map(|(k, _)| k)
            .collect();

        assert_eq!(keys, normalized_headers(&table));
    }

    #[test]
    fn should_keep_columns_of_synthesised_tables() {
        let table = RawTable::from_cells(vec![], vec![vec!["x".to_string(), "y".to_string()]]);
        let rows = normalize_rows(&table);

        assert_eq!(rows[0].zone, "");
        assert_eq!(rows[0].columns.len(), 2);
    }
}
