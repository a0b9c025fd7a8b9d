use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use ledgerseed_core::banking::tables::{
    ACCOUNT_CUSTOMERS, ACCOUNTS, CC_TRANSACTIONS, CREDIT_CARDS, CUSTOMERS, EMPLOYEES, LOAN,
};
use ledgerseed_core::rules::{minimum_balance_violations, transaction_after_open_violations};
use ledgerseed_core::{DatabaseSchema, Filter, MemoryStore, Row, Storage, Value, banking_schema};
use ledgerseed_generate::{GenerateOptions, GenerationEngine, GenerationReport, RowTargets};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn options(seed: u64, rows: usize) -> GenerateOptions {
    GenerateOptions {
        seed,
        targets: RowTargets::uniform(rows),
        today: Some(today()),
    }
}

fn generate(seed: u64, rows: usize) -> (DatabaseSchema, MemoryStore, GenerationReport) {
    let schema = banking_schema();
    let mut store = MemoryStore::new(schema.clone());
    let report = GenerationEngine::new(options(seed, rows))
        .run(&schema, &mut store)
        .expect("generation succeeds");
    (schema, store, report)
}

fn dump(schema: &DatabaseSchema, store: &MemoryStore) -> BTreeMap<String, Vec<Row>> {
    schema
        .tables
        .iter()
        .map(|table| {
            let rows = store.select(&table.name, &Filter::All).expect("select");
            (table.name.clone(), rows)
        })
        .collect()
}

#[test]
fn same_seed_produces_identical_rows() {
    let (schema, store_a, _) = generate(42, 25);
    let (_, store_b, _) = generate(42, 25);
    assert_eq!(dump(&schema, &store_a), dump(&schema, &store_b));

    let (_, store_c, _) = generate(7, 25);
    assert_ne!(
        store_a.select(CUSTOMERS, &Filter::All).unwrap(),
        store_c.select(CUSTOMERS, &Filter::All).unwrap()
    );
}

#[test]
fn rerun_on_populated_store_is_reproducible() {
    let (schema, mut store, _) = generate(42, 15);
    let first = dump(&schema, &store);

    GenerationEngine::new(options(42, 15))
        .run(&schema, &mut store)
        .expect("second run");
    assert_eq!(dump(&schema, &store), first);
}

#[test]
fn every_foreign_key_resolves() {
    let (schema, store, _) = generate(42, 40);

    for table in &schema.tables {
        let rows = store.select(&table.name, &Filter::All).unwrap();
        for fk in &table.foreign_keys {
            let parents: HashSet<String> = store
                .select(&fk.referenced_table, &Filter::All)
                .unwrap()
                .iter()
                .filter_map(|row| row.get(&fk.referenced_column))
                .map(Value::key)
                .collect();
            for row in &rows {
                let value = &row[&fk.column];
                if !value.is_null() {
                    assert!(
                        parents.contains(&value.key()),
                        "{}.{} = {value} is an orphan",
                        table.name,
                        fk.column
                    );
                }
            }
        }
    }
}

#[test]
fn business_rules_hold_after_enforcement() {
    let (_, store, _) = generate(42, 60);

    assert!(minimum_balance_violations(&store).unwrap().is_empty());
    assert!(transaction_after_open_violations(&store).unwrap().is_empty());

    for card in store.select(CREDIT_CARDS, &Filter::All).unwrap() {
        let score = card["credit_score"].as_i64().unwrap();
        assert!((300..=850).contains(&score));
        assert!(card["expiry_date"].as_date().unwrap() > today());
        assert_eq!(card["cc_number"].char_len(), Some(16));
    }

    for loan in store.select(LOAN, &Filter::All).unwrap() {
        let taken = loan["loan_amount_taken"].as_f64().unwrap();
        let repaid = loan["loan_amount_repaid"].as_f64().unwrap();
        assert!(repaid <= taken);
    }

    let expiries: BTreeMap<String, NaiveDate> = store
        .select(CREDIT_CARDS, &Filter::All)
        .unwrap()
        .iter()
        .map(|card| (card["cc_number"].key(), card["expiry_date"].as_date().unwrap()))
        .collect();
    for tx in store.select(CC_TRANSACTIONS, &Filter::All).unwrap() {
        let date = tx["transaction_date"].as_date().unwrap();
        assert!(date <= expiries[&tx["cc_number"].key()]);
        assert!(date <= today());
    }
}

#[test]
fn nobody_supervises_themself() {
    let (_, store, report) = generate(42, 50);
    assert!(report.enforcement.supervisors_assigned > 0);

    for employee in store.select(EMPLOYEES, &Filter::All).unwrap() {
        assert_ne!(employee["supervisor_id"], employee["employee_id"]);
    }
}

#[test]
fn account_counts_match_targets() {
    for rows in [0, 1, 500] {
        let (_, store, report) = generate(42, rows);
        assert_eq!(store.count(ACCOUNTS, &Filter::All).unwrap(), rows);
        assert_eq!(report.row_counts()[ACCOUNTS], rows as u64);

        // Every account has at least one owner.
        let owned: HashSet<String> = store
            .select(ACCOUNT_CUSTOMERS, &Filter::All)
            .unwrap()
            .iter()
            .map(|row| row["account_id"].key())
            .collect();
        assert_eq!(owned.len(), rows);
    }
}

type CustomerTuple = (String, String, String, String);

fn customer_tuples(store: &MemoryStore) -> Vec<CustomerTuple> {
    store
        .select(CUSTOMERS, &Filter::All)
        .unwrap()
        .iter()
        .map(|row| {
            (
                row["first_name"].to_string(),
                row["last_name"].to_string(),
                row["date_of_birth"].to_string(),
                row["email"].to_string(),
            )
        })
        .collect()
}

#[test]
fn seed_42_with_ten_customers_repeats_exactly() {
    let (_, store_a, _) = generate(42, 10);
    let (_, store_b, _) = generate(42, 10);
    let tuples = customer_tuples(&store_a);
    assert_eq!(tuples.len(), 10);
    assert_eq!(tuples, customer_tuples(&store_b));

    let (_, other_seed, _) = generate(43, 10);
    assert_ne!(tuples, customer_tuples(&other_seed));
}

#[test]
fn seed_42_customers_have_distinct_emails() {
    let (_, store, _) = generate(42, 100);
    let tuples = customer_tuples(&store);
    let emails: HashSet<&String> = tuples.iter().map(|(_, _, _, email)| email).collect();
    assert_eq!(emails.len(), 100);
}

#[test]
fn text_respects_column_lengths() {
    let (schema, store, _) = generate(3, 30);
    for table in &schema.tables {
        for row in store.select(&table.name, &Filter::All).unwrap() {
            for column in &table.columns {
                if let (Some(limit), Some(len)) = (column.max_length, row[&column.name].char_len()) {
                    assert!(len <= limit as usize, "{}.{}", table.name, column.name);
                }
            }
        }
    }
}
