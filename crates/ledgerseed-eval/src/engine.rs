use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Instant;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{info, warn};

use ledgerseed_core::banking::tables::{
    ACCOUNT_CUSTOMERS, ACCOUNT_TYPE, ACCOUNTS, BANKING_TRANSACTIONS, BRANCH_EMPLOYEES,
    CC_TRANSACTIONS, CREDIT_CARDS, CUSTOMERS, EMPLOYEES, LOAN,
};
use ledgerseed_core::rules::{
    early_transaction_pairs, minimum_balance_violations, transaction_after_open_violations,
};
use ledgerseed_core::{DatabaseSchema, Filter, Row, Storage, Value};

use crate::errors::EvalError;
use crate::fingerprint::fingerprint_dataset;
use crate::model::{Category, Finding, ReportPaths, ValidateOptions, ValidationReport};
use crate::report::render_markdown;

/// Minimum customer age, counted as whole 365-day years.
pub const MIN_CUSTOMER_AGE: i64 = 18;
pub const CREDIT_SCORE_RANGE: (i64, i64) = (300, 850);
pub const TRANSACTION_AMOUNT_RANGE: (f64, f64) = (1.0, 2500.0);
pub const ZIPCODE_RANGE: (i64, i64) = (501, 99950);

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("email pattern compiles")
});

/// Read-only quality checks over a populated store.
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    options: ValidateOptions,
}

impl ValidationEngine {
    pub fn new(options: ValidateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidateOptions {
        &self.options
    }

    pub fn run(
        &self,
        schema: &DatabaseSchema,
        store: &dyn Storage,
    ) -> Result<ValidationReport, EvalError> {
        let start = Instant::now();
        let today = self.options.anchor_date();
        let data = Dataset::load(schema, store)?;

        let mut findings = Vec::new();
        check_foreign_keys(schema, &data, &mut findings);
        check_completeness(schema, &data, &mut findings);
        check_business_logic(store, &data, today, &mut findings)?;
        check_temporal(store, &data, today, &mut findings)?;
        check_uniqueness(schema, &data, &mut findings);
        check_distribution(&data, &mut findings);
        check_cleanliness(&data, &mut findings);
        let fingerprint = check_reproducibility(
            schema,
            &data,
            self.options.expected_fingerprint.as_deref(),
            &mut findings,
        );

        let report = ValidationReport::new(today, findings, Some(fingerprint));
        for failure in report.failures() {
            warn!(
                category = %failure.category,
                rule = %failure.rule,
                detail = %failure.detail,
                "validation check failed"
            );
        }
        info!(
            total = report.total,
            passed = report.passed,
            failed = report.failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "validation finished"
        );
        Ok(report)
    }

    /// Write `validation_report.md` and `findings.json` into `out_dir`.
    ///
    /// In strict mode a report with failed findings is still written, then
    /// reported as [`EvalError::Failed`].
    pub fn write_report(
        &self,
        report: &ValidationReport,
        out_dir: &Path,
    ) -> Result<ReportPaths, EvalError> {
        std::fs::create_dir_all(out_dir)?;

        let report_path = out_dir.join("validation_report.md");
        std::fs::write(&report_path, render_markdown(report).as_bytes())?;

        let findings_path = out_dir.join("findings.json");
        std::fs::write(&findings_path, serde_json::to_vec_pretty(report)?)?;

        if self.options.strict && !report.is_clean() {
            return Err(EvalError::Failed(report.failed));
        }

        Ok(ReportPaths {
            report_path,
            findings_path,
        })
    }
}

/// Every schema table's rows, read once.
pub(crate) struct Dataset {
    tables: BTreeMap<String, Vec<Row>>,
}

impl Dataset {
    pub(crate) fn load(schema: &DatabaseSchema, store: &dyn Storage) -> Result<Self, EvalError> {
        let mut tables = BTreeMap::new();
        for table in &schema.tables {
            tables.insert(table.name.clone(), store.select(&table.name, &Filter::All)?);
        }
        Ok(Self { tables })
    }

    pub(crate) fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    fn has(&self, tables: &[&str]) -> bool {
        tables.iter().all(|table| self.tables.contains_key(*table))
    }
}

fn number(row: &Row, column: &str) -> Option<f64> {
    row.get(column).and_then(Value::as_f64)
}

fn integer(row: &Row, column: &str) -> Option<i64> {
    row.get(column).and_then(Value::as_i64)
}

fn date(row: &Row, column: &str) -> Option<NaiveDate> {
    row.get(column).and_then(Value::as_date)
}

fn text<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str)
}

fn count(rows: &[Row], predicate: impl Fn(&Row) -> bool) -> usize {
    rows.iter().filter(|row| predicate(row)).count()
}

fn distinct(rows: &[Row], column: &str) -> usize {
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_null())
        .map(Value::key)
        .collect::<HashSet<_>>()
        .len()
}

fn out_of_range(value: Option<f64>, (min, max): (f64, f64)) -> bool {
    value.is_some_and(|value| value < min || value > max)
}

fn check_foreign_keys(schema: &DatabaseSchema, data: &Dataset, findings: &mut Vec<Finding>) {
    for table in &schema.tables {
        let Some(rows) = data.rows(&table.name) else {
            continue;
        };
        for fk in &table.foreign_keys {
            let Some(parents) = data.rows(&fk.referenced_table) else {
                continue;
            };
            let keys: HashSet<String> = parents
                .iter()
                .filter_map(|row| row.get(&fk.referenced_column))
                .map(Value::key)
                .collect();
            let orphans = count(rows, |row| {
                row.get(&fk.column)
                    .is_some_and(|value| !value.is_null() && !keys.contains(&value.key()))
            });
            findings.push(Finding::count(
                Category::ForeignKeyIntegrity,
                format!("FK: {}.{}", table.name, fk.column),
                orphans,
                format!(
                    "{}.{} -> {}.{}: {orphans} orphan rows",
                    table.name, fk.column, fk.referenced_table, fk.referenced_column
                ),
            ));
        }
    }
}

fn check_completeness(schema: &DatabaseSchema, data: &Dataset, findings: &mut Vec<Finding>) {
    for table in &schema.tables {
        let Some(rows) = data.rows(&table.name) else {
            continue;
        };
        for column in &table.columns {
            if !column.nullable {
                let nulls = count(rows, |row| row.get(&column.name).is_none_or(Value::is_null));
                findings.push(Finding::count(
                    Category::ColumnCompleteness,
                    format!("NOT NULL: {}.{}", table.name, column.name),
                    nulls,
                    format!(
                        "{}.{}: {nulls} null values in NOT NULL column",
                        table.name, column.name
                    ),
                ));
            }
            if let Some(limit) = column.max_length {
                let longest = rows
                    .iter()
                    .filter_map(|row| row.get(&column.name).and_then(Value::char_len))
                    .max()
                    .unwrap_or(0);
                findings.push(Finding::new(
                    Category::ColumnCompleteness,
                    format!("Length: {}.{}", table.name, column.name),
                    longest <= limit as usize,
                    format!("{}.{}: max length {longest}/{limit}", table.name, column.name),
                ));
            }
        }
    }
}

fn check_business_logic(
    store: &dyn Storage,
    data: &Dataset,
    today: NaiveDate,
    findings: &mut Vec<Finding>,
) -> Result<(), EvalError> {
    let category = Category::BusinessLogic;

    if let Some(customers) = data.rows(CUSTOMERS) {
        let minors = count(customers, |row| {
            date(row, "date_of_birth")
                .is_some_and(|dob| (today - dob).num_days() < MIN_CUSTOMER_AGE * 365)
        });
        findings.push(Finding::count(
            category,
            "Customer Age >= 18",
            minors,
            format!("{minors} customers under 18 years old"),
        ));
    }

    if data.has(&[ACCOUNTS, ACCOUNT_TYPE]) {
        let below = minimum_balance_violations(store)?.len();
        findings.push(Finding::count(
            category,
            "Account Balance >= Minimum",
            below,
            format!("{below} accounts below minimum balance"),
        ));
    }

    if let Some(loans) = data.rows(LOAN) {
        let over = count(loans, |row| {
            match (number(row, "loan_amount_repaid"), number(row, "loan_amount_taken")) {
                (Some(repaid), Some(taken)) => repaid > taken,
                _ => false,
            }
        });
        findings.push(Finding::count(
            category,
            "Loan Repaid <= Taken",
            over,
            format!("{over} loans with repaid > taken"),
        ));
    }

    if let Some(cards) = data.rows(CREDIT_CARDS) {
        let (low, high) = CREDIT_SCORE_RANGE;
        let bad_scores = count(cards, |row| {
            integer(row, "credit_score").is_some_and(|score| score < low || score > high)
        });
        findings.push(Finding::count(
            category,
            "Credit Score Range",
            bad_scores,
            format!("{bad_scores} credit scores outside {low}-{high} range"),
        ));

        let expired = count(cards, |row| {
            date(row, "expiry_date").is_some_and(|expiry| expiry < today)
        });
        findings.push(Finding::count(
            category,
            "Credit Card Not Expired",
            expired,
            format!("{expired} expired credit cards"),
        ));
    }

    for (table, rule, label) in [
        (BANKING_TRANSACTIONS, "Banking Transaction Amount Range", "banking"),
        (CC_TRANSACTIONS, "CC Transaction Amount Range", "CC"),
    ] {
        if let Some(rows) = data.rows(table) {
            let outside = count(rows, |row| {
                out_of_range(number(row, "amount"), TRANSACTION_AMOUNT_RANGE)
            });
            findings.push(Finding::count(
                category,
                rule,
                outside,
                format!("{outside} {label} transactions outside 1-2500 range"),
            ));
        }
    }

    Ok(())
}

fn check_temporal(
    store: &dyn Storage,
    data: &Dataset,
    today: NaiveDate,
    findings: &mut Vec<Finding>,
) -> Result<(), EvalError> {
    let category = Category::TemporalConsistency;

    for (table, rule, label) in [
        (BANKING_TRANSACTIONS, "Banking Transactions Not Future", "banking"),
        (CC_TRANSACTIONS, "CC Transactions Not Future", "CC"),
    ] {
        if let Some(rows) = data.rows(table) {
            let future = count(rows, |row| {
                date(row, "transaction_date").is_some_and(|date| date > today)
            });
            findings.push(Finding::count(
                category,
                rule,
                future,
                format!("{future} {label} transactions in future"),
            ));
        }
    }

    if data.has(&[ACCOUNTS, ACCOUNT_CUSTOMERS, BANKING_TRANSACTIONS]) {
        let early = early_transaction_pairs(&transaction_after_open_violations(store)?);
        findings.push(Finding::count(
            category,
            "Transactions After Account Open",
            early,
            format!("{early} transactions before account opened"),
        ));
    }

    if let Some(assignments) = data.rows(BRANCH_EMPLOYEES) {
        let inverted = count(assignments, |row| {
            match (date(row, "start_date"), date(row, "end_date")) {
                (Some(start), Some(end)) => end < start,
                _ => false,
            }
        });
        findings.push(Finding::count(
            category,
            "Employee End >= Start",
            inverted,
            format!("{inverted} employees with end date before start date"),
        ));
    }

    if let Some(employees) = data.rows(EMPLOYEES) {
        let own = count(employees, |row| {
            match (row.get("supervisor_id"), row.get("employee_id")) {
                (Some(supervisor), Some(employee)) => {
                    !supervisor.is_null() && supervisor == employee
                }
                _ => false,
            }
        });
        findings.push(Finding::count(
            category,
            "No Self Supervision",
            own,
            format!("{own} employees supervising themselves"),
        ));
    }

    Ok(())
}

fn check_uniqueness(schema: &DatabaseSchema, data: &Dataset, findings: &mut Vec<Finding>) {
    let category = Category::Uniqueness;

    for table in &schema.tables {
        let Some(rows) = data.rows(&table.name) else {
            continue;
        };
        if !table.primary_key.is_empty() {
            let tuples: HashSet<String> = rows
                .iter()
                .map(|row| {
                    table
                        .primary_key
                        .iter()
                        .map(|column| row.get(column).map(Value::key).unwrap_or_default())
                        .collect::<Vec<_>>()
                        .join("\u{1f}")
                })
                .collect();
            let key = table.primary_key.join(", ");
            findings.push(Finding::new(
                category,
                format!("PK Unique: {}.{key}", table.name),
                tuples.len() == rows.len(),
                format!(
                    "{}.{key}: {} total, {} distinct",
                    table.name,
                    rows.len(),
                    tuples.len()
                ),
            ));
        }
        for column in table.columns.iter().filter(|column| column.unique) {
            push_distinct(
                findings,
                format!("Unique: {}.{}", table.name, column.name),
                &table.name,
                rows,
                &column.name,
            );
        }
    }

    if let Some(cards) = data.rows(CREDIT_CARDS) {
        push_distinct(
            findings,
            "CC Number Unique".to_string(),
            CREDIT_CARDS,
            cards,
            "cc_number",
        );
    }
}

fn push_distinct(
    findings: &mut Vec<Finding>,
    rule: String,
    table: &str,
    rows: &[Row],
    column: &str,
) {
    let total = count(rows, |row| row.get(column).is_some_and(|value| !value.is_null()));
    let unique = distinct(rows, column);
    findings.push(Finding::new(
        Category::Uniqueness,
        rule,
        total == unique,
        format!("{table}.{column}: {total} total, {unique} distinct"),
    ));
}

fn check_distribution(data: &Dataset, findings: &mut Vec<Finding>) {
    for (table, column, minimum, rule, label) in [
        (ACCOUNTS, "account_type", 3, "Account Type Variety", "account types"),
        (CUSTOMERS, "state", 10, "Customer State Variety", "states"),
        (
            BANKING_TRANSACTIONS,
            "transaction_type",
            2,
            "Transaction Type Variety",
            "transaction types",
        ),
    ] {
        if let Some(rows) = data.rows(table) {
            let seen = distinct(rows, column);
            findings.push(Finding::new(
                Category::RealisticDistribution,
                rule,
                seen >= minimum,
                format!("{seen} distinct {label}"),
            ));
        }
    }
}

fn check_cleanliness(data: &Dataset, findings: &mut Vec<Finding>) {
    let category = Category::DataCleanliness;
    let Some(customers) = data.rows(CUSTOMERS) else {
        return;
    };

    let untrimmed = count(customers, |row| {
        text(row, "email").is_some_and(|email| email.trim() != email)
    });
    findings.push(Finding::count(
        category,
        "Email Trimmed",
        untrimmed,
        format!("{untrimmed} emails with leading/trailing spaces"),
    ));

    let malformed = count(customers, |row| {
        text(row, "email").is_some_and(|email| !EMAIL.is_match(email))
    });
    findings.push(Finding::count(
        category,
        "Email Format",
        malformed,
        format!("{malformed} malformed emails"),
    ));

    let (low, high) = ZIPCODE_RANGE;
    let invalid = count(customers, |row| {
        integer(row, "zipcode").is_some_and(|zip| zip < low || zip > high)
    });
    findings.push(Finding::count(
        category,
        "Valid Zipcodes",
        invalid,
        format!("{invalid} invalid zipcodes"),
    ));
}

fn check_reproducibility(
    schema: &DatabaseSchema,
    data: &Dataset,
    expected: Option<&str>,
    findings: &mut Vec<Finding>,
) -> String {
    let category = Category::Reproducibility;

    let empty: BTreeSet<&str> = schema
        .tables
        .iter()
        .filter(|table| data.rows(&table.name).is_none_or(<[Row]>::is_empty))
        .map(|table| table.name.as_str())
        .collect();
    let detail = if empty.is_empty() {
        "All tables populated with seed-based generation".to_string()
    } else {
        format!(
            "{} empty tables: {}",
            empty.len(),
            empty.iter().copied().collect::<Vec<_>>().join(", ")
        )
    };
    findings.push(Finding::new(
        category,
        "Seed-based Generation",
        empty.is_empty(),
        detail,
    ));

    let fingerprint = fingerprint_dataset(schema, data);
    let (passed, detail) = match expected {
        Some(expected) if expected == fingerprint => {
            (true, format!("sha256 {fingerprint} matches expected"))
        }
        Some(expected) => (false, format!("sha256 {fingerprint}, expected {expected}")),
        None => (true, format!("sha256 {fingerprint}")),
    };
    findings.push(Finding::new(category, "Dataset Fingerprint", passed, detail));

    fingerprint
}

#[cfg(test)]
mod tests {
    use ledgerseed_core::{MemoryStore, banking_schema};

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn engine() -> ValidationEngine {
        ValidationEngine::new(ValidateOptions {
            today: Some(today()),
            ..ValidateOptions::default()
        })
    }

    fn customer(email: &str, dob: NaiveDate, zipcode: i64) -> Row {
        [
            ("first_name", Value::from("Ada")),
            ("last_name", Value::from("Byron")),
            ("date_of_birth", Value::Date(dob)),
            ("street_address", Value::from("12 Elm St")),
            ("city", Value::from("Salem")),
            ("state", Value::from("OR")),
            ("zipcode", Value::Int(zipcode)),
            ("email", Value::from(email)),
            ("sex", Value::from("F")),
        ]
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .collect()
    }

    fn finding<'a>(report: &'a ValidationReport, rule: &str) -> &'a Finding {
        report
            .findings
            .iter()
            .find(|finding| finding.rule == rule)
            .unwrap_or_else(|| panic!("missing finding {rule}"))
    }

    #[test]
    fn empty_store_reports_unpopulated_tables() {
        let schema = banking_schema();
        let store = MemoryStore::new(schema.clone());
        let report = engine().run(&schema, &store).unwrap();

        let seeded = finding(&report, "Seed-based Generation");
        assert!(!seeded.passed);
        assert!(seeded.detail.starts_with("11 empty tables"));
        assert!(report.category_passed(Category::ForeignKeyIntegrity));
        assert_eq!(report.total, report.passed + report.failed);
    }

    #[test]
    fn customer_checks_count_offending_rows() {
        let schema = banking_schema();
        let mut store = MemoryStore::new(schema.clone());
        let adult = NaiveDate::from_ymd_opt(1980, 1, 1).unwrap();
        let minor = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        store
            .insert(
                CUSTOMERS,
                vec![
                    customer("ada@example.com", adult, 97301),
                    customer("kid@example.com", minor, 97301),
                    customer(" pad@example.com", adult, 42),
                    customer("not-an-email", adult, 97301),
                ],
            )
            .unwrap();

        let report = engine().run(&schema, &store).unwrap();
        assert_eq!(
            finding(&report, "Customer Age >= 18").detail,
            "1 customers under 18 years old"
        );
        assert_eq!(
            finding(&report, "Email Trimmed").detail,
            "1 emails with leading/trailing spaces"
        );
        assert_eq!(finding(&report, "Email Format").detail, "2 malformed emails");
        assert_eq!(finding(&report, "Valid Zipcodes").detail, "1 invalid zipcodes");
        assert!(finding(&report, "Unique: customers.email").passed);
    }

    #[test]
    fn missing_tables_skip_their_checks() {
        let mut schema = banking_schema();
        schema.tables.retain(|table| table.name == CUSTOMERS);
        let store = MemoryStore::new(schema.clone());
        let report = engine().run(&schema, &store).unwrap();

        assert!(report.in_category(Category::ForeignKeyIntegrity).next().is_none());
        assert!(
            report
                .findings
                .iter()
                .all(|finding| finding.rule != "Account Balance >= Minimum")
        );
        assert!(
            report
                .findings
                .iter()
                .any(|finding| finding.rule == "Customer State Variety")
        );
        let format = finding(&report, "Email Format");
        assert!(format.passed);
        assert_eq!(format.detail, "0 malformed emails");
    }

    #[test]
    fn findings_follow_category_order() {
        let schema = banking_schema();
        let store = MemoryStore::new(schema.clone());
        let report = engine().run(&schema, &store).unwrap();

        let order: Vec<Category> = report
            .grouped()
            .into_iter()
            .map(|(category, _)| category)
            .collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
        assert_eq!(order.first(), Some(&Category::ForeignKeyIntegrity));
        assert_eq!(order.last(), Some(&Category::Reproducibility));
    }
}
