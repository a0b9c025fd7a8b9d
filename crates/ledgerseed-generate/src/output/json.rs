use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use ledgerseed_core::{Row, Table};

use crate::errors::GenerationError;

/// Row as a JSON object of rendered strings, with nulls kept as `null`.
pub fn row_to_json(table: &Table, row: &Row) -> JsonValue {
    let object: Map<String, JsonValue> = table
        .columns
        .iter()
        .map(|col| {
            let value = row
                .get(&col.name)
                .and_then(|value| value.render(col.logical_type.scale()))
                .map(JsonValue::String)
                .unwrap_or(JsonValue::Null);
            (col.name.clone(), value)
        })
        .collect();
    JsonValue::Object(object)
}

/// Write a table as a pretty-printed JSON array.
pub fn write_table_json(path: &Path, table: &Table, rows: &[Row]) -> Result<(), GenerationError> {
    let records: Vec<JsonValue> = rows.iter().map(|row| row_to_json(table, row)).collect();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;
    Ok(())
}
