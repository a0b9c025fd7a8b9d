//! Dependency-ordered synthetic data generation for ledgerseed.
//!
//! This crate fills a [`Storage`](ledgerseed_core::Storage) backend table by
//! table in foreign key order from one seeded RNG, repairs cross-table
//! business rules, and exports the result to CSV and JSON.

pub mod engine;
pub mod enforce;
pub mod entities;
pub mod errors;
pub mod model;
pub mod output;
pub mod pools;
pub mod values;

pub use engine::GenerationEngine;
pub use entities::{EntityContext, EntityGenerator, EntityRegistry};
pub use errors::GenerationError;
pub use model::{EnforcementReport, GenerateOptions, GenerationReport, RowTargets, TableReport};
pub use output::export_all;
pub use values::{MAX_UNIQUE_ATTEMPTS, ValueProvider, clip};
