//! Dataset export sinks.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use ledgerseed_core::{DatabaseSchema, Filter, Storage};

use crate::errors::GenerationError;

pub mod csv;
pub mod json;

/// Export every schema table to `<dir>/<table>.json` and `<dir>/<table>.csv`.
///
/// Returns the exported row count per table.
pub fn export_all(
    schema: &DatabaseSchema,
    store: &dyn Storage,
    dir: &Path,
) -> Result<BTreeMap<String, u64>, GenerationError> {
    std::fs::create_dir_all(dir)?;
    let mut counts = BTreeMap::new();

    for table in &schema.tables {
        let rows = store.select(&table.name, &Filter::All)?;
        json::write_table_json(&dir.join(format!("{}.json", table.name)), table, &rows)?;
        let bytes =
            csv::write_table_csv(&dir.join(format!("{}.csv", table.name)), table, &rows)?;
        info!(table = %table.name, rows = rows.len(), csv_bytes = bytes, "table exported");
        counts.insert(table.name.clone(), rows.len() as u64);
    }

    Ok(counts)
}
