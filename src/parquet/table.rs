//! Save a text table to a parquet file, one Utf8 column per header.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, StringBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::output::TextTable;

pub fn save_table(table: &TextTable, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;

    let schema = Arc::new(Schema::new(
        table
            .headers
            .iter()
            .map(|h| Field::new(h.as_str(), DataType::Utf8, false))
            .collect::<Vec<_>>(),
    ));

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .set_dictionary_enabled(true)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let mut builders: Vec<StringBuilder> = table
        .headers
        .iter()
        .map(|_| StringBuilder::with_capacity(table.rows.len(), table.rows.len() * 16))
        .collect();

    for row in &table.rows {
        for (i, builder) in builders.iter_mut().enumerate() {
            builder.append_value(row.get(i).map(String::as_str).unwrap_or_default());
        }
    }

    let columns: Vec<ArrayRef> = builders
        .iter_mut()
        .map(|b| Arc::new(b.finish()) as ArrayRef)
        .collect();

    let batch = RecordBatch::try_new(schema, columns)?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
