//! Storage capability set and the in-memory backend.
//!
//! The generator, enforcer and validator only talk to storage through the
//! [`Storage`] trait. [`MemoryStore`] enforces primary key, unique, NOT NULL,
//! length and foreign key constraints at the boundary the way a relational
//! engine would.

use std::collections::{BTreeMap, HashSet};
use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::schema::{DatabaseSchema, ForeignKey, Table};
use crate::types::Value;

/// A persisted or pending row, keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// Row predicate understood by every backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    IsNull(String),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(column, value) => row.get(column) == Some(value),
            Filter::IsNull(column) => row.get(column).is_none_or(Value::is_null),
        }
    }
}

/// Minimal capability set a backend must expose.
pub trait Storage {
    fn begin(&mut self) -> StorageResult<()>;
    fn commit(&mut self) -> StorageResult<()>;
    fn rollback(&mut self) -> StorageResult<()>;

    /// Insert rows and return them as persisted, with generated ids filled in.
    fn insert(&mut self, table: &str, rows: Vec<Row>) -> StorageResult<Vec<Row>>;
    fn select(&self, table: &str, filter: &Filter) -> StorageResult<Vec<Row>>;
    /// Apply `changes` to every matching row; returns the number of rows updated.
    fn update(&mut self, table: &str, filter: &Filter, changes: &Row) -> StorageResult<usize>;
    fn delete(&mut self, table: &str, filter: &Filter) -> StorageResult<usize>;
    fn count(&self, table: &str, filter: &Filter) -> StorageResult<usize>;

    fn foreign_key_checks(&self) -> bool;
    fn set_foreign_key_checks(&mut self, enabled: bool) -> StorageResult<()>;
    /// Restart the table's auto-increment sequence at 1.
    fn reset_sequence(&mut self, table: &str) -> StorageResult<()>;
}

/// Run `work` inside `begin`/`commit`, rolling back on any error.
pub fn in_transaction<S, T, E, F>(store: &mut S, work: F) -> Result<T, E>
where
    S: Storage + ?Sized,
    E: From<StorageError>,
    F: FnOnce(&mut S) -> Result<T, E>,
{
    store.begin()?;
    match work(store) {
        Ok(value) => {
            store.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = store.rollback() {
                warn!(error = %rollback, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Suspends foreign key enforcement until dropped.
///
/// The previous setting is restored on drop, including when the holder
/// returns early with an error.
pub struct ForeignKeyChecksGuard<'a, S: Storage + ?Sized> {
    store: &'a mut S,
    previous: bool,
}

impl<'a, S: Storage + ?Sized> ForeignKeyChecksGuard<'a, S> {
    pub fn suspend(store: &'a mut S) -> StorageResult<Self> {
        let previous = store.foreign_key_checks();
        store.set_foreign_key_checks(false)?;
        Ok(Self { store, previous })
    }
}

impl<S: Storage + ?Sized> Deref for ForeignKeyChecksGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: Storage + ?Sized> DerefMut for ForeignKeyChecksGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.store
    }
}

impl<S: Storage + ?Sized> Drop for ForeignKeyChecksGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.store.set_foreign_key_checks(self.previous) {
            warn!(error = %err, "failed to restore foreign key checks");
        }
    }
}

#[derive(Debug, Clone)]
struct TableData {
    rows: Vec<Row>,
    next_id: i64,
}

impl Default for TableData {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

type StoreState = BTreeMap<String, TableData>;

/// In-memory relational store for a fixed schema.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    schema: DatabaseSchema,
    state: StoreState,
    snapshot: Option<StoreState>,
    foreign_key_checks: bool,
}

impl MemoryStore {
    pub fn new(schema: DatabaseSchema) -> Self {
        let state = schema
            .tables
            .iter()
            .map(|table| (table.name.clone(), TableData::default()))
            .collect();
        Self {
            schema,
            state,
            snapshot: None,
            foreign_key_checks: true,
        }
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn descriptor(&self, table: &str) -> StorageResult<&Table> {
        self.schema
            .table(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))
    }

    fn data(&self, table: &str) -> StorageResult<&TableData> {
        self.state
            .get(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))
    }

    /// Keys present in `table.column` plus any pending rows of the same table.
    fn key_set(&self, table: &str, column: &str, pending: &[Row]) -> HashSet<String> {
        let existing = self
            .state
            .get(table)
            .map(|data| data.rows.as_slice())
            .unwrap_or_default();
        existing
            .iter()
            .chain(pending)
            .filter_map(|row| row.get(column))
            .filter(|value| !value.is_null())
            .map(Value::key)
            .collect()
    }

    fn check_foreign_keys(
        &self,
        table: &Table,
        rows: &[Row],
        only_columns: Option<&Row>,
    ) -> StorageResult<()> {
        if !self.foreign_key_checks {
            return Ok(());
        }
        for fk in &table.foreign_keys {
            if let Some(changes) = only_columns
                && !changes.contains_key(&fk.column)
            {
                continue;
            }
            let pending: &[Row] = if fk.referenced_table == table.name {
                rows
            } else {
                &[]
            };
            let parents = self.key_set(&fk.referenced_table, &fk.referenced_column, pending);
            for row in rows {
                let Some(value) = row.get(&fk.column) else {
                    continue;
                };
                if value.is_null() {
                    continue;
                }
                if !parents.contains(&value.key()) {
                    return Err(orphan_error(table, fk, value));
                }
            }
        }
        Ok(())
    }
}

fn orphan_error(table: &Table, fk: &ForeignKey, value: &Value) -> StorageError {
    StorageError::Constraint {
        table: table.name.clone(),
        message: format!(
            "{}.{} = {} has no parent in {}.{}",
            table.name, fk.column, value, fk.referenced_table, fk.referenced_column
        ),
    }
}

fn constraint(table: &Table, message: String) -> StorageError {
    StorageError::Constraint {
        table: table.name.clone(),
        message,
    }
}

/// NOT NULL, length and unknown-column checks for a single row.
fn check_row_shape(table: &Table, row: &Row) -> StorageResult<()> {
    for name in row.keys() {
        if table.column(name).is_none() {
            return Err(StorageError::UnknownColumn {
                table: table.name.clone(),
                column: name.clone(),
            });
        }
    }
    for column in &table.columns {
        let value = row.get(&column.name).unwrap_or(&Value::Null);
        if value.is_null() {
            if !column.nullable {
                return Err(constraint(
                    table,
                    format!("column {} cannot be null", column.name),
                ));
            }
            continue;
        }
        if let (Some(limit), Some(len)) = (column.max_length, value.char_len())
            && len > limit as usize
        {
            return Err(constraint(
                table,
                format!("value too long for {} ({len} > {limit})", column.name),
            ));
        }
    }
    Ok(())
}

fn tuple_key(row: &Row, columns: &[String]) -> Option<String> {
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns {
        let value = row.get(column)?;
        if value.is_null() {
            return None;
        }
        parts.push(value.key().replace('|', "\\|"));
    }
    Some(parts.join("|"))
}

/// Primary key and unique-column checks over a complete row set.
fn check_uniqueness(table: &Table, rows: &[Row]) -> StorageResult<()> {
    let mut key_sets: Vec<Vec<String>> = Vec::new();
    if !table.primary_key.is_empty() {
        key_sets.push(table.primary_key.clone());
    }
    for column in table.columns.iter().filter(|column| column.unique) {
        key_sets.push(vec![column.name.clone()]);
    }

    for columns in key_sets {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in rows {
            if let Some(key) = tuple_key(row, &columns)
                && !seen.insert(key.clone())
            {
                return Err(constraint(
                    table,
                    format!("duplicate key ({}) = ({key})", columns.join(", ")),
                ));
            }
        }
    }
    Ok(())
}

impl Storage for MemoryStore {
    fn begin(&mut self) -> StorageResult<()> {
        if self.snapshot.is_some() {
            return Err(StorageError::Transaction(
                "transaction already open".to_string(),
            ));
        }
        self.snapshot = Some(self.state.clone());
        debug!("transaction started");
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.snapshot
            .take()
            .ok_or_else(|| StorageError::Transaction("no open transaction".to_string()))?;
        debug!("transaction committed");
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| StorageError::Transaction("no open transaction".to_string()))?;
        self.state = snapshot;
        debug!("transaction rolled back");
        Ok(())
    }

    fn insert(&mut self, table: &str, rows: Vec<Row>) -> StorageResult<Vec<Row>> {
        let descriptor = self.descriptor(table)?;
        let data = self.data(table)?;
        let auto_column = descriptor
            .auto_increment_column()
            .map(|column| column.name.clone());
        let mut next_id = data.next_id;

        let mut pending = Vec::with_capacity(rows.len());
        for mut row in rows {
            if let Some(auto_column) = &auto_column {
                match row.get(auto_column) {
                    Some(Value::Int(id)) => next_id = next_id.max(id.saturating_add(1)),
                    _ => {
                        row.insert(auto_column.clone(), Value::Int(next_id));
                        next_id = next_id.checked_add(1).ok_or_else(|| StorageError::Constraint {
                            table: table.to_string(),
                            message: format!("{auto_column} sequence exhausted"),
                        })?;
                    }
                }
            }
            for column in &descriptor.columns {
                row.entry(column.name.clone()).or_insert(Value::Null);
            }
            check_row_shape(descriptor, &row)?;
            pending.push(row);
        }

        let mut combined = data.rows.clone();
        combined.extend(pending.iter().cloned());
        check_uniqueness(descriptor, &combined)?;
        self.check_foreign_keys(descriptor, &pending, None)?;

        let data = self
            .state
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;
        data.rows = combined;
        data.next_id = next_id;
        Ok(pending)
    }

    fn select(&self, table: &str, filter: &Filter) -> StorageResult<Vec<Row>> {
        Ok(self
            .data(table)?
            .rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect())
    }

    fn update(&mut self, table: &str, filter: &Filter, changes: &Row) -> StorageResult<usize> {
        let descriptor = self.descriptor(table)?;
        for column in changes.keys() {
            if descriptor.primary_key.contains(column) {
                return Err(constraint(
                    descriptor,
                    format!("primary key column {column} cannot be updated"),
                ));
            }
        }

        let data = self.data(table)?;
        let mut touched: Vec<(usize, Row)> = Vec::new();
        for (index, row) in data.rows.iter().enumerate() {
            if !filter.matches(row) {
                continue;
            }
            let mut updated = row.clone();
            for (column, value) in changes {
                updated.insert(column.clone(), value.clone());
            }
            check_row_shape(descriptor, &updated)?;
            touched.push((index, updated));
        }
        if touched.is_empty() {
            return Ok(0);
        }

        let unique_changed = descriptor
            .columns
            .iter()
            .any(|column| column.unique && changes.contains_key(&column.name));
        if unique_changed {
            let mut rows = data.rows.clone();
            for (index, row) in &touched {
                rows[*index] = row.clone();
            }
            check_uniqueness(descriptor, &rows)?;
        }
        let updated: Vec<Row> = touched.iter().map(|(_, row)| row.clone()).collect();
        self.check_foreign_keys(descriptor, &updated, Some(changes))?;

        let data = self
            .state
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;
        let count = touched.len();
        for (index, row) in touched {
            data.rows[index] = row;
        }
        Ok(count)
    }

    fn delete(&mut self, table: &str, filter: &Filter) -> StorageResult<usize> {
        let descriptor = self.descriptor(table)?;
        let (removed, kept): (Vec<Row>, Vec<Row>) = self
            .data(table)?
            .rows
            .iter()
            .cloned()
            .partition(|row| filter.matches(row));

        if removed.is_empty() {
            return Ok(0);
        }

        if self.foreign_key_checks {
            for child in &self.schema.tables {
                for fk in child.foreign_keys.iter().filter(|fk| fk.referenced_table == table) {
                    let removed_keys: HashSet<String> = removed
                        .iter()
                        .filter_map(|row| row.get(&fk.referenced_column))
                        .map(Value::key)
                        .collect();
                    let remaining: &[Row] = if child.name == table {
                        &kept
                    } else {
                        self.data(&child.name)?.rows.as_slice()
                    };
                    let blocked = remaining.iter().any(|row| {
                        row.get(&fk.column)
                            .is_some_and(|value| !value.is_null() && removed_keys.contains(&value.key()))
                    });
                    if blocked {
                        return Err(constraint(
                            descriptor,
                            format!(
                                "rows still referenced by {}.{}",
                                child.name, fk.column
                            ),
                        ));
                    }
                }
            }
        }

        let count = removed.len();
        let data = self
            .state
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;
        data.rows = kept;
        Ok(count)
    }

    fn count(&self, table: &str, filter: &Filter) -> StorageResult<usize> {
        Ok(self
            .data(table)?
            .rows
            .iter()
            .filter(|row| filter.matches(row))
            .count())
    }

    fn foreign_key_checks(&self) -> bool {
        self.foreign_key_checks
    }

    fn set_foreign_key_checks(&mut self, enabled: bool) -> StorageResult<()> {
        self.foreign_key_checks = enabled;
        debug!(enabled, "foreign key checks toggled");
        Ok(())
    }

    fn reset_sequence(&mut self, table: &str) -> StorageResult<()> {
        let data = self
            .state
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;
        data.next_id = 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use crate::types::LogicalType;

    fn schema() -> DatabaseSchema {
        DatabaseSchema {
            name: "test".to_string(),
            tables: vec![
                Table {
                    name: "users".to_string(),
                    columns: vec![
                        Column::new("id", LogicalType::Integer).auto_increment(),
                        Column::text("email", 8).unique(),
                        Column::new("manager_id", LogicalType::Integer).nullable(),
                    ],
                    primary_key: vec!["id".to_string()],
                    foreign_keys: vec![ForeignKey::new("manager_id", "users", "id")],
                },
                Table {
                    name: "orders".to_string(),
                    columns: vec![
                        Column::new("id", LogicalType::Integer).auto_increment(),
                        Column::new("user_id", LogicalType::Integer),
                    ],
                    primary_key: vec!["id".to_string()],
                    foreign_keys: vec![ForeignKey::new("user_id", "users", "id")],
                },
            ],
        }
    }

    fn user(email: &str) -> Row {
        Row::from([("email".to_string(), Value::from(email))])
    }

    fn order(user_id: i64) -> Row {
        Row::from([("user_id".to_string(), Value::Int(user_id))])
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let mut store = MemoryStore::new(schema());
        let rows = store.insert("users", vec![user("a@x.io"), user("b@x.io")]).unwrap();
        assert_eq!(rows[0]["id"], Value::Int(1));
        assert_eq!(rows[1]["id"], Value::Int(2));
        assert_eq!(rows[1]["manager_id"], Value::Null);
    }

    #[test]
    fn explicit_max_id_exhausts_the_sequence() {
        let mut store = MemoryStore::new(schema());
        let mut explicit = user("a@x.io");
        explicit.insert("id".to_string(), Value::Int(i64::MAX));
        let rows = store.insert("users", vec![explicit]).unwrap();
        assert_eq!(rows[0]["id"], Value::Int(i64::MAX));

        let err = store.insert("users", vec![user("b@x.io")]).unwrap_err();
        assert!(matches!(err, StorageError::Constraint { .. }));
        assert_eq!(store.count("users", &Filter::All).unwrap(), 1);
    }

    #[test]
    fn insert_rejects_orphans_and_is_statement_atomic() {
        let mut store = MemoryStore::new(schema());
        store.insert("users", vec![user("a@x.io")]).unwrap();

        let err = store.insert("orders", vec![order(1), order(9)]).unwrap_err();
        assert!(matches!(err, StorageError::Constraint { .. }));
        assert_eq!(store.count("orders", &Filter::All).unwrap(), 0);
    }

    #[test]
    fn insert_rejects_duplicates_and_overlong_text() {
        let mut store = MemoryStore::new(schema());
        store.insert("users", vec![user("a@x.io")]).unwrap();
        assert!(store.insert("users", vec![user("a@x.io")]).is_err());
        assert!(store.insert("users", vec![user("toolong@x.io")]).is_err());
    }

    #[test]
    fn rollback_restores_previous_state() {
        let mut store = MemoryStore::new(schema());
        store.insert("users", vec![user("a@x.io")]).unwrap();

        let result: Result<(), StorageError> = in_transaction(&mut store, |store| {
            store.insert("users", vec![user("b@x.io")])?;
            store.insert("orders", vec![order(42)])?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(store.count("users", &Filter::All).unwrap(), 1);
        assert!(!store.in_transaction());
    }

    #[test]
    fn delete_of_referenced_parent_needs_suspended_checks() {
        let mut store = MemoryStore::new(schema());
        store.insert("users", vec![user("a@x.io")]).unwrap();
        store.insert("orders", vec![order(1)]).unwrap();

        assert!(store.delete("users", &Filter::All).is_err());
        {
            let mut guard = ForeignKeyChecksGuard::suspend(&mut store).unwrap();
            assert_eq!(guard.delete("users", &Filter::All).unwrap(), 1);
        }
        assert!(store.foreign_key_checks());
    }

    #[test]
    fn guard_restores_checks_on_error_path() {
        let mut store = MemoryStore::new(schema());
        let result: StorageResult<usize> = (|| {
            let mut guard = ForeignKeyChecksGuard::suspend(&mut store)?;
            guard.delete("missing", &Filter::All)
        })();
        assert!(result.is_err());
        assert!(store.foreign_key_checks());
    }

    #[test]
    fn update_validates_self_reference() {
        let mut store = MemoryStore::new(schema());
        store.insert("users", vec![user("a@x.io"), user("b@x.io")]).unwrap();

        let changes = Row::from([("manager_id".to_string(), Value::Int(2))]);
        assert_eq!(store.update("users", &Filter::eq("id", 1), &changes).unwrap(), 1);

        let bad = Row::from([("manager_id".to_string(), Value::Int(7))]);
        assert!(store.update("users", &Filter::eq("id", 1), &bad).is_err());
    }

    #[test]
    fn reset_sequence_restarts_ids() {
        let mut store = MemoryStore::new(schema());
        store.insert("users", vec![user("a@x.io")]).unwrap();
        store.delete("users", &Filter::All).unwrap();
        store.reset_sequence("users").unwrap();
        let rows = store.insert("users", vec![user("b@x.io")]).unwrap();
        assert_eq!(rows[0]["id"], Value::Int(1));
    }
}
