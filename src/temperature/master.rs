//! Joins the latest daily readings onto the station master table and derives
//! the columns the temperature map reads.

use std::collections::HashMap;

use anyhow::{bail, Result};

use super::{DailyReading, STATION_COLUMN};
use crate::{
    format::{decimal_comma, title_case},
    output::TextTable,
};

const LEFTOVER_COLUMNS: [&str; 3] = ["Unnamed: 0.1", "Unnamed: 0", "indsinop"];

const HISTORIC_SOURCE: &str = "tm_max_media";
const HISTORIC: &str = "media_maxima_historica";
const TMAX: &str = "tmax";
const CATEGORY: &str = "categoria";

const DERIVED: [&str; 5] = [
    "diferencia",
    "tmax_txt",
    "media_maxima_historica_txt",
    "diferencia_txt",
    CATEGORY,
];

const COLUMN_ORDER: [&str; 17] = [
    "indicativo",
    "nombre",
    "provincia",
    "altitud",
    "año_inicio",
    "año_fin",
    HISTORIC,
    "fecha",
    "fecha_txt",
    TMAX,
    "latitud",
    "longitud",
    "tmax_txt",
    "media_maxima_historica_txt",
    "diferencia",
    "diferencia_txt",
    CATEGORY,
];

/// Difference bins, exclusive below and inclusive above.
const CATEGORIES: [(f64, f64, &str); 5] = [
    (-10.0, -6.0, "Muy baja"),
    (-6.0, -2.0, "Baja"),
    (-2.0, 2.0, "Similar"),
    (2.0, 6.0, "Alta"),
    (6.0, 10.0, "Muy alta"),
];

/// Writes `fecha`, `tmax` and `fecha_txt` of each station's last reading onto
/// its master row. Rows of stations without a reading get empty cells.
pub fn merge_with_master(mut master: TextTable, readings: &[DailyReading]) -> Result<TextTable> {
    let Some(key) = column(&master, STATION_COLUMN) else {
        bail!("The master table has no `{}` column", STATION_COLUMN);
    };
    if readings.is_empty() {
        return Ok(master);
    }

    let mut latest: HashMap<String, &DailyReading> = HashMap::new();
    for reading in readings {
        latest.insert(reading.station.trim().to_uppercase(), reading);
    }

    pad(&mut master);
    let targets: Vec<usize> = DailyReading::COLUMNS
        .iter()
        .map(|name| column_or_insert(&mut master, name))
        .collect();

    for row in &mut master.rows {
        let values = latest
            .get(&row[key].trim().to_uppercase())
            .map(|reading| reading.values())
            .unwrap_or_default();
        for (&target, value) in targets.iter().zip(values) {
            row[target] = value.to_string();
        }
    }

    Ok(master)
}

/// Cleans the merged master table into the map table.
///
/// Rows whose `tmax` is not a number are dropped. When the historic mean is
/// present the difference, its texts and its category are added, plus one
/// empty row per category no station falls in so the map legend stays whole.
pub fn transform_master(mut table: TextTable) -> TextTable {
    pad(&mut table);
    drop_columns(&mut table, &LEFTOVER_COLUMNS);

    if let Some(i) = column(&table, HISTORIC_SOURCE) {
        if column(&table, HISTORIC).is_none() {
            table.headers[i] = HISTORIC.to_string();
        }
    }
    if let Some(i) = column(&table, "nombre") {
        for row in &mut table.rows {
            row[i] = title_case(&invert_comma(&row[i]));
        }
    }
    if let Some(i) = column(&table, "provincia") {
        for row in &mut table.rows {
            row[i] = title_case(&row[i]);
        }
    }

    if let Some(t) = column(&table, TMAX) {
        table.rows.retain(|row| parse_number(&row[t]).is_some());
        for row in &mut table.rows {
            if let Some(value) = parse_number(&row[t]) {
                row[t] = value.to_string();
            }
        }

        if let Some(h) = column(&table, HISTORIC) {
            add_differences(&mut table, t, h);
        }
    }

    reorder(table)
}

fn add_differences(table: &mut TextTable, tmax: usize, historic: usize) {
    let [diff_col, tmax_txt, historic_txt, diff_txt, category_col] =
        DERIVED.map(|name| column_or_insert(table, name));

    for row in &mut table.rows {
        let t = parse_number(&row[tmax]);
        let h = parse_number(&row[historic]);
        let diff = t.zip(h).map(|(t, h)| t - h);

        row[diff_col] = diff.map(|d| format!("{:.1}", d)).unwrap_or_default();
        row[tmax_txt] = t.map(|t| decimal_comma(t, 1)).unwrap_or_default();
        row[historic_txt] = h.map(|h| decimal_comma(h, 1)).unwrap_or_default();
        row[diff_txt] = diff.map(signed_decimal).unwrap_or_default();
        row[category_col] = diff.and_then(category).unwrap_or_default().to_string();
    }

    add_legend_rows(table, category_col);
}

/// Category of a temperature difference, `None` outside (-10, 10].
pub fn category(diff: f64) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(low, high, _)| diff > *low && diff <= *high)
        .map(|(_, _, label)| *label)
}

fn signed_decimal(diff: f64) -> String {
    if diff > 0.0 {
        format!("+{}", decimal_comma(diff, 1))
    } else if diff < 0.0 {
        format!("-{}", decimal_comma(-diff, 1))
    } else {
        decimal_comma(0.0, 1)
    }
}

fn add_legend_rows(table: &mut TextTable, category_col: usize) {
    let coordinates: Vec<(usize, String)> = ["latitud", "longitud"]
        .iter()
        .filter_map(|name| column(table, name))
        .filter_map(|i| table.rows.last().map(|row| (i, row[i].clone())))
        .collect();

    for (_, _, label) in CATEGORIES {
        if table.rows.iter().any(|row| row[category_col] == label) {
            continue;
        }
        let mut row = vec![String::new(); table.headers.len()];
        row[category_col] = label.to_string();
        for (i, value) in &coordinates {
            row[*i] = value.clone();
        }
        table.rows.push(row);
    }
}

/// "MADRID, RETIRO" becomes "RETIRO MADRID".
fn invert_comma(name: &str) -> String {
    match name.split_once(',') {
        Some((head, tail)) => format!("{} {}", tail.trim(), head.trim()),
        None => name.to_string(),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

fn column(table: &TextTable, name: &str) -> Option<usize> {
    table.headers.iter().position(|h| h == name)
}

fn column_or_insert(table: &mut TextTable, name: &str) -> usize {
    if let Some(i) = column(table, name) {
        return i;
    }
    table.headers.push(name.to_string());
    for row in &mut table.rows {
        row.push(String::new());
    }
    table.headers.len() - 1
}

fn pad(table: &mut TextTable) {
    let width = table.headers.len();
    for row in &mut table.rows {
        row.resize(width, String::new());
    }
}

fn drop_columns(table: &mut TextTable, names: &[&str]) {
    let keep: Vec<usize> = (0..table.headers.len())
        .filter(|&i| !names.contains(&table.headers[i].as_str()))
        .collect();
    select(table, &keep);
}

fn reorder(mut table: TextTable) -> TextTable {
    let mut order: Vec<usize> =
        COLUMN_ORDER.iter().filter_map(|name| column(&table, name)).collect();
    let rest: Vec<usize> = (0..table.headers.len()).filter(|i| !order.contains(i)).collect();
    order.extend(rest);
    select(&mut table, &order);
    table
}

fn select(table: &mut TextTable, columns: &[usize]) {
    table.headers = columns.iter().map(|&i| table.headers[i].clone()).collect();
    for row in &mut table.rows {
        *row = columns.iter().map(|&i| row[i].clone()).collect();
    }
}

// -- Tests -------------------------------------------------------------------
