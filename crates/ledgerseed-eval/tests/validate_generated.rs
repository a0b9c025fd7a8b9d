use std::fs;

use chrono::NaiveDate;

use ledgerseed_core::banking::tables::ACCOUNTS;
use ledgerseed_core::{DatabaseSchema, Filter, MemoryStore, Row, Storage, Value, banking_schema};
use ledgerseed_eval::{
    Category, EvalError, ValidateOptions, ValidationEngine, ValidationReport, dataset_fingerprint,
};
use ledgerseed_generate::{GenerateOptions, GenerationEngine, RowTargets};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn generate(seed: u64, rows: usize) -> (DatabaseSchema, MemoryStore) {
    let schema = banking_schema();
    let mut store = MemoryStore::new(schema.clone());
    GenerationEngine::new(GenerateOptions {
        seed,
        targets: RowTargets::uniform(rows),
        today: Some(today()),
    })
    .run(&schema, &mut store)
    .expect("generation succeeds");
    (schema, store)
}

fn validate(
    schema: &DatabaseSchema,
    store: &MemoryStore,
    expected: Option<String>,
) -> ValidationReport {
    ValidationEngine::new(ValidateOptions {
        today: Some(today()),
        expected_fingerprint: expected,
        strict: false,
    })
    .run(schema, store)
    .expect("validation runs")
}

#[test]
fn fresh_dataset_passes_integrity_and_business_checks() {
    let (schema, store) = generate(42, 60);
    let report = validate(&schema, &store, None);

    for category in [
        Category::ForeignKeyIntegrity,
        Category::ColumnCompleteness,
        Category::BusinessLogic,
        Category::TemporalConsistency,
        Category::Uniqueness,
    ] {
        let failed: Vec<_> = report
            .in_category(category)
            .filter(|finding| !finding.passed)
            .collect();
        assert!(failed.is_empty(), "{category}: {failed:?}");
        assert!(report.in_category(category).next().is_some(), "{category} ran");
    }
    // One FK finding per foreign key edge in the schema.
    let edges: usize = schema.tables.iter().map(|table| table.foreign_keys.len()).sum();
    assert_eq!(report.in_category(Category::ForeignKeyIntegrity).count(), edges);
}

#[test]
fn one_corrupted_balance_fails_exactly_one_business_finding() {
    let (schema, mut store) = generate(42, 40);
    let account_id = store.select(ACCOUNTS, &Filter::All).unwrap()[0]["account_id"].clone();
    let changes = Row::from([("account_balance".to_string(), Value::Decimal(-1.0))]);
    let updated = store
        .update(ACCOUNTS, &Filter::Eq("account_id".to_string(), account_id), &changes)
        .unwrap();
    assert_eq!(updated, 1);

    let report = validate(&schema, &store, None);
    let failed: Vec<_> = report
        .in_category(Category::BusinessLogic)
        .filter(|finding| !finding.passed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].rule, "Account Balance >= Minimum");
    assert_eq!(failed[0].detail, "1 accounts below minimum balance");
}

#[test]
fn fingerprint_tracks_seed_and_expected_value() {
    let (schema, store_a) = generate(42, 20);
    let (_, store_b) = generate(42, 20);
    let (_, store_c) = generate(43, 20);

    let first = dataset_fingerprint(&schema, &store_a).unwrap();
    assert_eq!(first.len(), 64);
    assert_eq!(first, dataset_fingerprint(&schema, &store_b).unwrap());
    assert_ne!(first, dataset_fingerprint(&schema, &store_c).unwrap());

    let matching = validate(&schema, &store_b, Some(first.clone()));
    assert!(matching.category_passed(Category::Reproducibility));
    assert_eq!(matching.fingerprint.as_deref(), Some(first.as_str()));

    let drifted = validate(&schema, &store_c, Some(first));
    let failures: Vec<_> = drifted
        .in_category(Category::Reproducibility)
        .filter(|finding| !finding.passed)
        .map(|finding| finding.rule.as_str())
        .collect();
    assert_eq!(failures, vec!["Dataset Fingerprint"]);
}

#[test]
fn reports_are_written_and_strict_mode_fails_on_findings() {
    let schema = banking_schema();
    let store = MemoryStore::new(schema.clone());
    let mut dir = std::env::temp_dir();
    dir.push(format!("ledgerseed_eval_{}", uuid::Uuid::new_v4()));

    let engine = ValidationEngine::new(ValidateOptions {
        today: Some(today()),
        expected_fingerprint: None,
        strict: true,
    });
    let report = engine.run(&schema, &store).unwrap();
    assert!(!report.is_clean());

    let err = engine.write_report(&report, &dir).unwrap_err();
    assert!(matches!(err, EvalError::Failed(count) if count == report.failed));

    let markdown = fs::read_to_string(dir.join("validation_report.md")).unwrap();
    assert!(markdown.starts_with("# Data Quality Validation Report"));
    let parsed: ValidationReport =
        serde_json::from_str(&fs::read_to_string(dir.join("findings.json")).unwrap()).unwrap();
    assert_eq!(parsed, report);
}
