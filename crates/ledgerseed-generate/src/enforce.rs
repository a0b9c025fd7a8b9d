//! Post-generation repair of cross-table business rules.
//!
//! Repairs run in a fixed order against persisted rows, so every step sees
//! the effect of the ones before it.

use tracing::info;

use ledgerseed_core::banking::tables::{
    ACCOUNT_CUSTOMERS, ACCOUNT_TYPE, ACCOUNTS, BANKING_TRANSACTIONS, EMPLOYEES,
};
use ledgerseed_core::rules::{minimum_balance_violations, transaction_after_open_violations};
use ledgerseed_core::{DatabaseSchema, Filter, Row, Storage, Value};

use crate::errors::GenerationError;
use crate::model::EnforcementReport;
use crate::values::ValueProvider;

/// Probability that an employee gets a supervisor.
pub const SUPERVISOR_PROBABILITY: f64 = 0.6;

pub fn enforce_business_rules(
    schema: &DatabaseSchema,
    store: &mut dyn Storage,
    values: &mut ValueProvider,
) -> Result<EnforcementReport, GenerationError> {
    let has = |tables: &[&str]| tables.iter().all(|table| schema.has_table(table));
    let mut report = EnforcementReport::default();

    if has(&[ACCOUNT_TYPE, ACCOUNTS]) {
        report.balances_raised = raise_minimum_balances(store, values)?;
    }
    if has(&[ACCOUNTS, ACCOUNT_CUSTOMERS, BANKING_TRANSACTIONS]) {
        report.transactions_redated = redate_early_transactions(store, values)?;
    }
    if has(&[EMPLOYEES]) {
        report.supervisors_assigned = assign_supervisors(store, values)?;
    }

    info!(
        balances_raised = report.balances_raised,
        transactions_redated = report.transactions_redated,
        supervisors_assigned = report.supervisors_assigned,
        "enforcement finished"
    );
    Ok(report)
}

fn change(column: &str, value: Value) -> Row {
    Row::from([(column.to_string(), value)])
}

fn raise_minimum_balances(
    store: &mut dyn Storage,
    values: &mut ValueProvider,
) -> Result<u64, GenerationError> {
    let violations = minimum_balance_violations(&*store)?;
    for violation in &violations {
        let minimum = violation.minimum;
        let balance = values.money(minimum, (minimum + 1000.0).max(minimum + 1.0));
        store.update(
            ACCOUNTS,
            &Filter::Eq("account_id".to_string(), violation.account_id.clone()),
            &change("account_balance", Value::Decimal(balance)),
        )?;
    }
    Ok(violations.len() as u64)
}

/// Move transactions dated before an owned account opened into
/// `[latest open date, today]`.
fn redate_early_transactions(
    store: &mut dyn Storage,
    values: &mut ValueProvider,
) -> Result<u64, GenerationError> {
    let violations = transaction_after_open_violations(&*store)?;
    let today = values.today();
    for violation in &violations {
        let date = values.between(violation.latest_open, today.max(violation.latest_open));
        store.update(
            BANKING_TRANSACTIONS,
            &Filter::Eq(
                "transaction_id".to_string(),
                violation.transaction_id.clone(),
            ),
            &change("transaction_date", Value::Date(date)),
        )?;
    }
    Ok(violations.len() as u64)
}

/// Each employee, once, gets a supervisor drawn from the other employees.
fn assign_supervisors(
    store: &mut dyn Storage,
    values: &mut ValueProvider,
) -> Result<u64, GenerationError> {
    let employees: Vec<Value> = store
        .select(EMPLOYEES, &Filter::All)?
        .into_iter()
        .filter_map(|row| row.get("employee_id").cloned())
        .collect();
    if employees.len() < 2 {
        return Ok(0);
    }

    let mut assigned = 0;
    for (position, employee_id) in employees.iter().enumerate() {
        if !values.chance(SUPERVISOR_PROBABILITY) {
            continue;
        }
        // Uniform over every index except our own.
        let mut pick = values.uniform_i64(0, employees.len() as i64 - 2) as usize;
        if pick >= position {
            pick += 1;
        }
        store.update(
            EMPLOYEES,
            &Filter::Eq("employee_id".to_string(), employee_id.clone()),
            &change("supervisor_id", employees[pick].clone()),
        )?;
        assigned += 1;
    }
    Ok(assigned)
}
