use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::schema::DatabaseSchema;

/// Validate internal consistency of a database schema.
///
/// This checks:
/// - duplicate tables/columns
/// - primary key columns exist
/// - foreign key columns and referenced targets exist
/// - deferrable foreign keys sit on nullable columns
pub fn validate_schema(schema: &DatabaseSchema) -> Result<()> {
    let mut catalog: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for table in &schema.tables {
        if catalog.contains_key(&table.name) {
            return Err(Error::InvalidSchema(format!(
                "duplicate table name: {}",
                table.name
            )));
        }

        let mut columns = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.clone()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {}.{}",
                    table.name, column.name
                )));
            }
        }

        catalog.insert(table.name.clone(), columns);
    }

    for table in &schema.tables {
        let columns = catalog.get(&table.name).ok_or_else(|| {
            Error::InvalidSchema(format!("missing table in catalog: {}", table.name))
        })?;

        for column in &table.primary_key {
            if !columns.contains(column) {
                return Err(Error::InvalidSchema(format!(
                    "primary key column not found: {}.{}",
                    table.name, column
                )));
            }
        }

        for fk in &table.foreign_keys {
            let column = table.column(&fk.column).ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "foreign key column not found: {}.{}",
                    table.name, fk.column
                ))
            })?;

            let ref_columns = catalog.get(&fk.referenced_table).ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "referenced table not found: {}",
                    fk.referenced_table
                ))
            })?;

            if !ref_columns.contains(&fk.referenced_column) {
                return Err(Error::InvalidSchema(format!(
                    "referenced column not found: {}.{}",
                    fk.referenced_table, fk.referenced_column
                )));
            }

            let deferred = fk.deferrable || table.is_self_referencing(fk);
            if deferred && !column.nullable {
                return Err(Error::InvalidSchema(format!(
                    "deferred foreign key must be nullable: {}.{}",
                    table.name, fk.column
                )));
            }
        }
    }

    Ok(())
}
