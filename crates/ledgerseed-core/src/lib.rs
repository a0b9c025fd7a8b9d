//! Core contracts for ledgerseed.
//!
//! This crate defines the schema descriptors, the dependency graph that
//! orders tables for insertion, the storage capability set and the
//! cross-table business constraints shared by the generator and validator.

pub mod banking;
pub mod error;
pub mod graph;
pub mod rules;
pub mod schema;
pub mod storage;
pub mod types;
pub mod validation;

pub use banking::banking_schema;
pub use error::{Error, Result, StorageError, StorageResult};
pub use graph::{DeferredEdge, DependencyGraph};
pub use schema::{Column, DatabaseSchema, ForeignKey, Table};
pub use storage::{Filter, ForeignKeyChecksGuard, MemoryStore, Row, Storage, in_transaction};
pub use types::{LogicalType, Value};
pub use validation::validate_schema;
