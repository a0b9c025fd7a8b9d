use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row targets for the top-level entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowTargets {
    pub branches: usize,
    pub customers: usize,
    pub employees: usize,
    pub accounts: usize,
}

impl RowTargets {
    pub const DEFAULT_ROWS: usize = 500;

    /// Same target for every top-level entity.
    pub fn uniform(rows: usize) -> Self {
        Self {
            branches: rows,
            customers: rows,
            employees: rows,
            accounts: rows,
        }
    }
}

impl Default for RowTargets {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT_ROWS)
    }
}

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Seed for the single run-wide RNG.
    pub seed: u64,
    pub targets: RowTargets,
    /// Anchor date for every relative date; the current UTC date when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today: Option<NaiveDate>,
}

impl GenerateOptions {
    pub const DEFAULT_SEED: u64 = 42;

    pub fn anchor_date(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            seed: Self::DEFAULT_SEED,
            targets: RowTargets::default(),
            today: None,
        }
    }
}

/// Summary of a generated table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows_requested: u64,
    pub rows_generated: u64,
}

/// Counts of rows touched by each enforcement repair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementReport {
    pub balances_raised: u64,
    pub transactions_redated: u64,
    pub supervisors_assigned: u64,
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub seed: u64,
    pub today: NaiveDate,
    pub insertion_order: Vec<String>,
    pub tables: Vec<TableReport>,
    /// Tables present in the schema without a registered generator.
    pub skipped_tables: Vec<String>,
    pub rows_deleted: u64,
    pub enforcement: EnforcementReport,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(seed: u64, today: NaiveDate) -> Self {
        Self {
            seed,
            today,
            insertion_order: Vec::new(),
            tables: Vec::new(),
            skipped_tables: Vec::new(),
            rows_deleted: 0,
            enforcement: EnforcementReport::default(),
            duration_ms: 0,
        }
    }

    /// Generated row counts keyed by table.
    pub fn row_counts(&self) -> BTreeMap<String, u64> {
        self.tables
            .iter()
            .map(|table| (table.table.clone(), table.rows_generated))
            .collect()
    }
}
