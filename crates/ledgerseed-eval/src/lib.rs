//! Data quality validation over generated datasets.

pub mod engine;
pub mod errors;
pub mod fingerprint;
pub mod model;
pub mod report;

pub use engine::ValidationEngine;
pub use errors::EvalError;
pub use fingerprint::dataset_fingerprint;
pub use model::{Category, Finding, ReportPaths, ValidateOptions, ValidationReport};
pub use report::render_markdown;
