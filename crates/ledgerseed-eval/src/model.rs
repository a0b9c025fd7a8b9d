use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Options for dataset validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateOptions {
    /// Reference date for age, expiry and "not in the future" checks.
    /// Defaults to the current UTC date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today: Option<NaiveDate>,
    /// Fingerprint a previous run with the same seed produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_fingerprint: Option<String>,
    /// Turn failed findings into [`EvalError::Failed`](crate::EvalError::Failed)
    /// when writing reports.
    #[serde(default)]
    pub strict: bool,
}

impl ValidateOptions {
    pub fn anchor_date(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Validation categories, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Foreign Key Integrity")]
    ForeignKeyIntegrity,
    #[serde(rename = "Column Completeness")]
    ColumnCompleteness,
    #[serde(rename = "Business Logic Validation")]
    BusinessLogic,
    #[serde(rename = "Temporal Consistency")]
    TemporalConsistency,
    #[serde(rename = "Uniqueness Constraints")]
    Uniqueness,
    #[serde(rename = "Realistic Distribution")]
    RealisticDistribution,
    #[serde(rename = "Data Cleanliness")]
    DataCleanliness,
    #[serde(rename = "Reproducibility")]
    Reproducibility,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::ForeignKeyIntegrity,
        Category::ColumnCompleteness,
        Category::BusinessLogic,
        Category::TemporalConsistency,
        Category::Uniqueness,
        Category::RealisticDistribution,
        Category::DataCleanliness,
        Category::Reproducibility,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::ForeignKeyIntegrity => "Foreign Key Integrity",
            Category::ColumnCompleteness => "Column Completeness",
            Category::BusinessLogic => "Business Logic Validation",
            Category::TemporalConsistency => "Temporal Consistency",
            Category::Uniqueness => "Uniqueness Constraints",
            Category::RealisticDistribution => "Realistic Distribution",
            Category::DataCleanliness => "Data Cleanliness",
            Category::Reproducibility => "Reproducibility",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One pass/fail check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: Category,
    pub rule: String,
    pub passed: bool,
    pub detail: String,
}

impl Finding {
    pub fn new(category: Category, rule: impl Into<String>, passed: bool, detail: String) -> Self {
        Self {
            category,
            rule: rule.into(),
            passed,
            detail,
        }
    }

    /// Finding that passes when `violations` is zero.
    pub fn count(
        category: Category,
        rule: impl Into<String>,
        violations: usize,
        detail: String,
    ) -> Self {
        Self::new(category, rule, violations == 0, detail)
    }
}

/// Aggregated validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub today: NaiveDate,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn new(today: NaiveDate, mut findings: Vec<Finding>, fingerprint: Option<String>) -> Self {
        // Stable sort keeps check order within a category.
        findings.sort_by_key(|finding| finding.category);
        let passed = findings.iter().filter(|finding| finding.passed).count() as u64;
        let total = findings.len() as u64;
        Self {
            today,
            total,
            passed,
            failed: total - passed,
            fingerprint,
            findings,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(move |finding| finding.category == category)
    }

    /// True when every finding in `category` passed (vacuously for none).
    pub fn category_passed(&self, category: Category) -> bool {
        self.in_category(category).all(|finding| finding.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|finding| !finding.passed)
    }

    /// Findings grouped by category in report order, empty categories omitted.
    pub fn grouped(&self) -> Vec<(Category, Vec<&Finding>)> {
        Category::ALL
            .iter()
            .filter_map(|category| {
                let findings: Vec<&Finding> = self.in_category(*category).collect();
                (!findings.is_empty()).then_some((*category, findings))
            })
            .collect()
    }
}

/// Files written by [`ValidationEngine::write_report`](crate::ValidationEngine::write_report).
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub report_path: PathBuf,
    pub findings_path: PathBuf,
}
