//! SHA-256 fingerprint of a persisted dataset.

use ledgerseed_core::{DatabaseSchema, DependencyGraph, Storage};
use sha2::{Digest, Sha256};

use crate::engine::Dataset;
use crate::errors::EvalError;

const FIELD_SEPARATOR: &[u8] = b"\x1f";
const ROW_SEPARATOR: &[u8] = b"\x1e";
const NULL: &[u8] = b"\\N";

/// Hash every table's rows in insertion order.
///
/// Two stores generated from the same seed, targets and anchor date hash to
/// the same value.
pub fn dataset_fingerprint(
    schema: &DatabaseSchema,
    store: &dyn Storage,
) -> Result<String, EvalError> {
    Ok(fingerprint_dataset(schema, &Dataset::load(schema, store)?))
}

pub(crate) fn fingerprint_dataset(schema: &DatabaseSchema, data: &Dataset) -> String {
    let order = DependencyGraph::build(schema)
        .insertion_order()
        .unwrap_or_else(|_| schema.table_names());

    let mut hasher = Sha256::new();
    for name in &order {
        let (Some(table), Some(rows)) = (schema.table(name), data.rows(name)) else {
            continue;
        };
        hasher.update(name.as_bytes());
        hasher.update(ROW_SEPARATOR);
        for row in rows {
            for (index, column) in table.columns.iter().enumerate() {
                if index > 0 {
                    hasher.update(FIELD_SEPARATOR);
                }
                match row
                    .get(&column.name)
                    .and_then(|value| value.render(column.logical_type.scale()))
                {
                    Some(rendered) => hasher.update(rendered.as_bytes()),
                    None => hasher.update(NULL),
                }
            }
            hasher.update(ROW_SEPARATOR);
        }
    }
    hex::encode(hasher.finalize())
}
