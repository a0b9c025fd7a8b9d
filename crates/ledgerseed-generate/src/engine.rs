use std::time::Instant;

use tracing::{info, warn};

use ledgerseed_core::{
    DatabaseSchema, DependencyGraph, Filter, ForeignKeyChecksGuard, Storage, in_transaction,
    validate_schema,
};

use crate::enforce::enforce_business_rules;
use crate::entities::{EntityContext, EntityRegistry};
use crate::errors::GenerationError;
use crate::model::{GenerateOptions, GenerationReport, TableReport};
use crate::pools::ParentPools;
use crate::values::ValueProvider;

/// Entry point for populating a store from a schema.
///
/// A run truncates every table, generates rows parents-first and then
/// enforces business rules, all inside one storage transaction.
pub struct GenerationEngine {
    options: GenerateOptions,
    registry: EntityRegistry,
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self::with_registry(options, EntityRegistry::banking())
    }

    pub fn with_registry(options: GenerateOptions, registry: EntityRegistry) -> Self {
        Self { options, registry }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Dependency graph including the registry's ordering hints.
    pub fn dependency_graph(&self, schema: &DatabaseSchema) -> DependencyGraph {
        self.registry
            .hints()
            .into_iter()
            .fold(DependencyGraph::build(schema), |graph, (child, parent)| {
                graph.with_hint(child, parent)
            })
    }

    /// Parents-first table order for `schema`.
    pub fn insertion_order(&self, schema: &DatabaseSchema) -> Result<Vec<String>, GenerationError> {
        validate_schema(schema)?;
        Ok(self.dependency_graph(schema).insertion_order()?)
    }

    pub fn run(
        &self,
        schema: &DatabaseSchema,
        store: &mut dyn Storage,
    ) -> Result<GenerationReport, GenerationError> {
        let start = Instant::now();
        let order = self.insertion_order(schema)?;
        let today = self.options.anchor_date();
        let mut values = ValueProvider::new(self.options.seed, today);
        let mut report = GenerationReport::new(self.options.seed, today);
        report.insertion_order = order.clone();

        info!(
            seed = self.options.seed,
            today = %today,
            tables = order.len(),
            "generation started"
        );

        let outcome = in_transaction(store, |store| -> Result<(), GenerationError> {
            report.rows_deleted = truncate(store, &order)?;
            self.populate(schema, &order, store, &mut values, &mut report)?;
            report.enforcement = enforce_business_rules(schema, store, &mut values)?;
            Ok(())
        });

        report.duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => {
                info!(
                    tables = report.tables.len(),
                    skipped = report.skipped_tables.len(),
                    duration_ms = report.duration_ms,
                    "generation completed"
                );
                Ok(report)
            }
            Err(err) => {
                warn!(error = %err, "generation failed, changes rolled back");
                Err(err)
            }
        }
    }

    fn populate(
        &self,
        schema: &DatabaseSchema,
        order: &[String],
        store: &mut dyn Storage,
        values: &mut ValueProvider,
        report: &mut GenerationReport,
    ) -> Result<(), GenerationError> {
        let mut pools = ParentPools::new();

        for table_name in order {
            let Some(generator) = self.registry.get(table_name) else {
                warn!(table = %table_name, "no generator registered, table left empty");
                report.skipped_tables.push(table_name.clone());
                continue;
            };
            let table = schema.table(table_name).ok_or_else(|| {
                ledgerseed_core::Error::InvalidSchema(format!(
                    "table {table_name} is in the insertion order but not in the schema"
                ))
            })?;
            let table_start = Instant::now();
            let count = generator.target(&self.options.targets);

            let rows = {
                let mut ctx = EntityContext {
                    table,
                    count,
                    parents: &pools,
                    values: &mut *values,
                };
                generator.generate(&mut ctx)?
            };
            let persisted = store.insert(table_name, rows)?;
            let generated = persisted.len() as u64;

            report.tables.push(TableReport {
                table: table_name.clone(),
                rows_requested: count.map(|count| count as u64).unwrap_or(generated),
                rows_generated: generated,
            });
            info!(
                table = %table_name,
                rows_generated = generated,
                duration_ms = table_start.elapsed().as_millis() as u64,
                "table generated"
            );
            pools.ingest(table_name, persisted);
        }

        Ok(())
    }
}

/// Empty every table children-first with foreign key checks suspended.
fn truncate(store: &mut dyn Storage, order: &[String]) -> Result<u64, GenerationError> {
    let mut guard = ForeignKeyChecksGuard::suspend(store)?;
    let mut deleted = 0;
    for table in order.iter().rev() {
        deleted += guard.delete(table, &Filter::All)? as u64;
        guard.reset_sequence(table)?;
    }
    info!(rows_deleted = deleted, "tables truncated");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ledgerseed_core::banking::tables::{ACCOUNTS, BRANCHES};
    use ledgerseed_core::{Error, ForeignKey, MemoryStore, banking_schema};

    use super::*;
    use crate::model::RowTargets;

    fn options(rows: usize) -> GenerateOptions {
        GenerateOptions {
            seed: 42,
            targets: RowTargets::uniform(rows),
            today: NaiveDate::from_ymd_opt(2024, 6, 15),
        }
    }

    #[test]
    fn cycle_is_reported_before_touching_storage() {
        let mut schema = banking_schema();
        let branches = schema
            .tables
            .iter_mut()
            .find(|table| table.name == BRANCHES)
            .unwrap();
        branches.columns.push(ledgerseed_core::Column::new(
            "flagship_account",
            ledgerseed_core::LogicalType::Integer,
        ));
        branches
            .foreign_keys
            .push(ForeignKey::new("flagship_account", ACCOUNTS, "account_id"));

        let mut store = MemoryStore::new(schema.clone());
        let err = GenerationEngine::new(options(1))
            .run(&schema, &mut store)
            .unwrap_err();
        match err {
            GenerationError::Schema(Error::SchemaCycle { tables }) => {
                assert_eq!(tables, vec![ACCOUNTS.to_string(), BRANCHES.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!store.in_transaction());
    }

    #[test]
    fn unknown_tables_are_skipped() {
        let mut schema = banking_schema();
        schema.tables.push(ledgerseed_core::Table {
            name: "audit_log".to_string(),
            columns: vec![ledgerseed_core::Column::text("message", 20)],
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        });

        let mut store = MemoryStore::new(schema.clone());
        let report = GenerationEngine::new(options(3))
            .run(&schema, &mut store)
            .unwrap();
        assert_eq!(report.skipped_tables, vec!["audit_log".to_string()]);
        assert_eq!(store.count("audit_log", &Filter::All).unwrap(), 0);
    }

    #[test]
    fn ordered_table_missing_from_schema_is_invalid_schema() {
        let mut schema = banking_schema();
        schema.tables.retain(|table| table.name != BRANCHES);
        let engine = GenerationEngine::new(options(2));
        let today = engine.options().anchor_date();
        let mut store = MemoryStore::new(schema.clone());
        let mut values = ValueProvider::new(42, today);
        let mut report = GenerationReport::new(42, today);

        let err = engine
            .populate(
                &schema,
                &[BRANCHES.to_string()],
                &mut store,
                &mut values,
                &mut report,
            )
            .unwrap_err();
        match err {
            GenerationError::Schema(Error::InvalidSchema(message)) => {
                assert!(message.contains(BRANCHES));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(report.tables.is_empty());
    }
}
