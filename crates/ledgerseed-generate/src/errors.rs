use thiserror::Error;

use ledgerseed_core::StorageError;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Schema is invalid or its dependency graph has a cycle.
    #[error(transparent)]
    Schema(#[from] ledgerseed_core::Error),
    #[error("cannot generate {table}: parent table {parent} has no rows")]
    EmptyParentPool { table: String, parent: String },
    #[error("no unique value for {scope} after {attempts} attempts")]
    DuplicateConstraintViolation { scope: String, attempts: u32 },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
