use thiserror::Error;

/// Core error type shared across ledgerseed crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// The dependency graph cannot be linearized.
    #[error("foreign key cycle between tables: {}", tables.join(", "))]
    SchemaCycle { tables: Vec<String> },
    /// Storage backend failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures raised at the storage boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("unknown column: {table}.{column}")]
    UnknownColumn { table: String, column: String },
    /// A row was rejected by a storage-level constraint.
    #[error("constraint violation on {table}: {message}")]
    Constraint { table: String, message: String },
    #[error("transaction error: {0}")]
    Transaction(String),
}

/// Convenience alias for results returned by ledgerseed crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Result alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
