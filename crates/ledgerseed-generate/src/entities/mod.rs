//! Per-table row generators for the banking schema.

use std::collections::BTreeMap;

use ledgerseed_core::{Row, Table, Value};

use crate::errors::GenerationError;
use crate::model::RowTargets;
use crate::pools::ParentPools;
use crate::values::{ValueProvider, clip};

pub mod accounts;
pub mod cards;
pub mod lending;
pub mod people;
pub mod reference;
pub mod staffing;

/// Inputs handed to a generator for one table.
pub struct EntityContext<'a> {
    pub table: &'a Table,
    /// Requested rows for top-level entities; `None` when sized by parents.
    pub count: Option<usize>,
    pub parents: &'a ParentPools,
    pub values: &'a mut ValueProvider,
}

impl EntityContext<'_> {
    pub fn max_len(&self, column: &str) -> Option<usize> {
        self.table.max_length(column)
    }

    /// Text value clipped to the column's declared length.
    pub fn text(&self, column: &str, value: impl Into<String>) -> Value {
        Value::Text(clip(value.into(), self.max_len(column)))
    }

    /// Parent values required only when this table has rows to emit.
    pub fn require_if(
        &self,
        needed: bool,
        parent: &str,
        column: &str,
    ) -> Result<Vec<Value>, GenerationError> {
        if needed {
            self.parents.require(&self.table.name, parent, column)
        } else {
            Ok(Vec::new())
        }
    }

    /// Weighted owner/branch count: 1 twice as likely as 2.
    pub fn one_or_two(&mut self) -> usize {
        self.values.choose(&[1, 1, 2]).copied().unwrap_or(1)
    }
}

pub trait EntityGenerator: Send + Sync {
    fn table(&self) -> &'static str;

    /// Tables this one must follow even without a foreign key.
    fn generate_after(&self) -> &'static [&'static str] {
        &[]
    }

    /// Row target for top-level entities.
    fn target(&self, _targets: &RowTargets) -> Option<usize> {
        None
    }

    /// Build rows for the table. Auto-increment keys are left to storage.
    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError>;
}

/// Generators keyed by table name.
#[derive(Default)]
pub struct EntityRegistry {
    generators: BTreeMap<&'static str, Box<dyn EntityGenerator>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering every table of the built-in banking schema.
    pub fn banking() -> Self {
        let mut registry = Self::new();
        reference::register(&mut registry);
        people::register(&mut registry);
        accounts::register(&mut registry);
        cards::register(&mut registry);
        lending::register(&mut registry);
        staffing::register(&mut registry);
        registry
    }

    pub fn register_generator(&mut self, generator: Box<dyn EntityGenerator>) {
        self.generators.insert(generator.table(), generator);
    }

    pub fn get(&self, table: &str) -> Option<&dyn EntityGenerator> {
        self.generators.get(table).map(Box::as_ref)
    }

    pub fn tables(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.generators.keys().copied()
    }

    /// `(child, parent)` ordering hints declared by registered generators.
    pub fn hints(&self) -> Vec<(&'static str, &'static str)> {
        self.generators
            .values()
            .flat_map(|generator| {
                generator
                    .generate_after()
                    .iter()
                    .map(move |parent| (generator.table(), *parent))
            })
            .collect()
    }
}

pub(crate) fn row<const N: usize>(pairs: [(&str, Value); N]) -> Row {
    pairs
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerseed_core::banking_schema;

    #[test]
    fn banking_registry_covers_every_table() {
        let registry = EntityRegistry::banking();
        let mut tables: Vec<&str> = registry.tables().collect();
        tables.sort_unstable();

        let mut expected: Vec<String> = banking_schema().table_names();
        expected.sort();
        assert_eq!(tables, expected);
    }

    #[test]
    fn transactions_follow_account_ownership() {
        let registry = EntityRegistry::banking();
        assert!(
            registry
                .hints()
                .contains(&("banking_transactions", "account_customers"))
        );
    }
}
