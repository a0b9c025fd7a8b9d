use ledgerseed_core::StorageError;
use thiserror::Error;

/// Errors emitted by the validation engine.
///
/// Failed checks are findings, not errors; these cover reading the dataset
/// and writing reports.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("validation failed with {0} failed finding(s)")]
    Failed(u64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
