use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::LogicalType;

/// Read-only descriptor set for one database.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseSchema {
    /// Database name, informational only.
    pub name: String,
    pub tables: Vec<Table>,
}

impl DatabaseSchema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.name.clone()).collect()
    }
}

/// Table descriptor: ordered columns, primary key and outgoing foreign keys.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Maximum text length of a column, if it declares one.
    pub fn max_length(&self, column: &str) -> Option<usize> {
        self.column(column)
            .and_then(|column| column.max_length)
            .map(|len| len as usize)
    }

    /// The auto-increment column, if the table has one.
    pub fn auto_increment_column(&self) -> Option<&Column> {
        self.columns.iter().find(|column| column.auto_increment)
    }

    pub fn is_self_referencing(&self, fk: &ForeignKey) -> bool {
        fk.referenced_table == self.name
    }
}

/// Column descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    pub name: String,
    pub logical_type: LogicalType,
    #[serde(default)]
    pub nullable: bool,
    /// Character limit for textual columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Value assigned by storage on insert when absent.
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub unique: bool,
}

impl Column {
    pub fn new(name: &str, logical_type: LogicalType) -> Self {
        Self {
            name: name.to_string(),
            logical_type,
            nullable: false,
            max_length: None,
            auto_increment: false,
            unique: false,
        }
    }

    pub fn text(name: &str, max_length: u32) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::new(name, LogicalType::Text)
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Single-column foreign key edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// Excluded from insertion ordering; the column is inserted null and backfilled.
    #[serde(default)]
    pub deferrable: bool,
}

impl ForeignKey {
    pub fn new(column: &str, referenced_table: &str, referenced_column: &str) -> Self {
        Self {
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
            deferrable: false,
        }
    }
}
