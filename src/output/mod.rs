//! Writers for everything a run produces besides parquet tables.

pub mod features;
pub mod sheets;

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq)]
/// A header plus string rows, as published to parquet and Sheets.
pub struct TextTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TextTable {
    /// Builds a table from rows of `(column, value)` pairs.
    ///
    /// Columns are taken in order of first appearance; missing cells are empty.
    pub fn from_records(records: &[Vec<(String, String)>]) -> Self {
        TextTable::with_headers(Vec::new(), records)
    }

    /// Like [`TextTable::from_records`], starting from a fixed header.
    ///
    /// The header survives when there are no records. Columns a record has
    /// beyond it are appended.
    pub fn with_headers(mut headers: Vec<String>, records: &[Vec<(String, String)>]) -> Self {
        for record in records {
            for (column, _) in record {
                if !headers.contains(column) {
                    headers.push(column.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| {
                        record
                            .iter()
                            .find(|(column, _)| column == h)
                            .map(|(_, value)| value.clone())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        TextTable { headers, rows }
    }
}

/// `avisos.geojson` → `avisos.rejected.json`, in the same directory.
pub fn rejected_path(geojson: &Path) -> PathBuf {
    let stem = geojson
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    geojson.with_file_name(format!("{}.rejected.json", stem))
}

/// Writes `value` as pretty-printed JSON, replacing any previous file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path).with_context(|| format!("Could not create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn should_union_record_columns() {
        let table = TextTable::from_records(&[
            vec![pair("zone", "Menorca"), pair("Fenómeno", "Lluvias")],
            vec![pair("zone", "Mallorca"), pair("Nivel de riesgo", "Riesgo")],
        ]);

        assert_eq!(table.headers, vec!["zone", "Fenómeno", "Nivel de riesgo"]);
        assert_eq!(table.rows[0], vec!["Menorca", "Lluvias", ""]);
        assert_eq!(table.rows[1], vec!["Mallorca", "", "Riesgo"]);
    }

    #[test]
    fn should_keep_fixed_header_without_records() {
        let headers = vec!["zone".to_string(), "region".to_string(), "province".to_string()];

        let empty = TextTable::with_headers(headers.clone(), &[]);
        assert_eq!(empty.headers, headers);
        assert!(empty.rows.is_empty());

        let table = TextTable::with_headers(
            headers,
            &[vec![pair("province", "Madrid"), pair("zone", "Sierra"), pair("extra", "x")]],
        );
        assert_eq!(table.headers, vec!["zone", "region", "province", "extra"]);
        assert_eq!(table.rows[0], vec!["Sierra", "", "Madrid", "x"]);
    }

    #[test]
    fn should_place_rejects_next_to_geojson() {
        let path = rejected_path(Path::new("/tmp/panel/MAPA_AVISOS_AEMET.geojson"));
        assert_eq!(path, PathBuf::from("/tmp/panel/MAPA_AVISOS_AEMET.rejected.json"));
    }

    #[test]
    fn should_write_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("rejected.json");

        write_json(&path, &vec!["Atlántis"]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Atlántis"));
    }
}
