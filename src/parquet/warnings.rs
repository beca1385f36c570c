//! Save the deduplicated warnings to a parquet file.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, StringArray, UInt8Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use geo::ChamberlainDuquetteArea;
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::zones::GeoWarning;

pub fn save_warnings(warnings: &[GeoWarning], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("zone", DataType::Utf8, false),
        Field::new("region", DataType::Utf8, false),
        Field::new("province", DataType::Utf8, false),
        Field::new("start_time", DataType::Utf8, false),
        Field::new("end_time", DataType::Utf8, false),
        Field::new("severity", DataType::Utf8, false),
        Field::new("priority", DataType::UInt8, false),
        Field::new("phenomenon", DataType::Utf8, false),
        Field::new("area_km2", DataType::Float64, false),
    ]));

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let num_rows = warnings.len();

    let mut zones = Vec::with_capacity(num_rows);
    let mut regions = Vec::with_capacity(num_rows);
    let mut provinces = Vec::with_capacity(num_rows);
    let mut start_times = Vec::with_capacity(num_rows);
    let mut end_times = Vec::with_capacity(num_rows);
    let mut severities = Vec::with_capacity(num_rows);
    let mut priorities = Vec::with_capacity(num_rows);
    let mut phenomena = Vec::with_capacity(num_rows);
    let mut areas = Vec::with_capacity(num_rows);

    for w in warnings {
        zones.push(w.warning.zone.as_str());
        regions.push(w.warning.region.as_str());
        provinces.push(w.province.as_str());
        start_times.push(w.warning.start_time.as_str());
        end_times.push(w.warning.end_time.as_str());
        severities.push(w.warning.severity.label());
        priorities.push(w.warning.severity.priority());
        phenomena.push(w.warning.phenomenon.as_str());
        areas.push(w.geometry.chamberlain_duquette_unsigned_area() / 1_000_000.0);
    }

    let columns: Vec<(&str, ArrayRef)> = vec![
        ("zone", Arc::new(StringArray::from(zones))),
        ("region", Arc::new(StringArray::from(regions))),
        ("province", Arc::new(StringArray::from(provinces))),
        ("start_time", Arc::new(StringArray::from(start_times))),
        ("end_time", Arc::new(StringArray::from(end_times))),
        ("severity", Arc::new(StringArray::from(severities))),
        ("priority", Arc::new(UInt8Array::from(priorities))),
        ("phenomenon", Arc::new(StringArray::from(phenomena))),
        ("area_km2", Arc::new(Float64Array::from(areas))),
    ];

    let batch = RecordBatch::try_from_iter(columns)?;

    writer.write(&batch)?;

    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
