use std::collections::BTreeMap;

use ledgerseed_core::{Row, Value};

use crate::errors::GenerationError;

/// Persisted rows of already-generated tables, keyed by table name.
///
/// Foreign key values are only ever drawn from here, so every generated
/// reference points at a row storage has accepted.
#[derive(Debug, Default)]
pub struct ParentPools {
    rows: BTreeMap<String, Vec<Row>>,
}

impl ParentPools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, table: &str, rows: Vec<Row>) {
        self.rows.insert(table.to_string(), rows);
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.rows.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    /// Non-null values of `parent.column`, in insertion order.
    pub fn values(&self, parent: &str, column: &str) -> Vec<Value> {
        self.rows(parent)
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|value| !value.is_null())
            .cloned()
            .collect()
    }

    /// Like [`values`](Self::values), but an empty pool is an error for `table`.
    pub fn require(
        &self,
        table: &str,
        parent: &str,
        column: &str,
    ) -> Result<Vec<Value>, GenerationError> {
        let values = self.values(parent, column);
        if values.is_empty() {
            return Err(GenerationError::EmptyParentPool {
                table: table.to_string(),
                parent: parent.to_string(),
            });
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_names_table_and_parent() {
        let pools = ParentPools::new();
        let err = pools.require("accounts", "branches", "branch_id").unwrap_err();
        match err {
            GenerationError::EmptyParentPool { table, parent } => {
                assert_eq!(table, "accounts");
                assert_eq!(parent, "branches");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn values_skip_nulls() {
        let mut pools = ParentPools::new();
        pools.ingest(
            "employees",
            vec![
                Row::from([("employee_id".to_string(), Value::Int(1))]),
                Row::from([("employee_id".to_string(), Value::Null)]),
            ],
        );
        assert_eq!(pools.values("employees", "employee_id"), vec![Value::Int(1)]);
    }
}
