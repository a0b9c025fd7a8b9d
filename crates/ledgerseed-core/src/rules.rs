//! Cross-table business constraints over persisted rows.
//!
//! Each function returns the rows that currently violate its rule. The
//! enforcer repairs exactly these rows and the validator counts them.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::banking::tables::{ACCOUNTS, ACCOUNT_CUSTOMERS, ACCOUNT_TYPE, BANKING_TRANSACTIONS};
use crate::error::StorageResult;
use crate::storage::{Filter, Storage};
use crate::types::Value;

/// Account whose balance is below its type's minimum.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceViolation {
    pub account_id: Value,
    pub account_type: String,
    pub balance: f64,
    pub minimum: f64,
}

/// Banking transaction dated before one of its customer's accounts opened.
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyTransaction {
    pub transaction_id: Value,
    pub customer_id: Value,
    pub transaction_date: NaiveDate,
    /// Opening date of the customer's most recently opened account.
    pub latest_open: NaiveDate,
    /// Owned accounts opened after `transaction_date`, one per
    /// (transaction, account) pair in breach.
    pub later_accounts: usize,
}

/// Minimum balance per account type name.
pub fn minimum_balances(store: &dyn Storage) -> StorageResult<BTreeMap<String, f64>> {
    Ok(store
        .select(ACCOUNT_TYPE, &Filter::All)?
        .into_iter()
        .filter_map(|row| {
            let name = row.get("account_type")?.as_str()?.to_string();
            let minimum = row.get("minimum_balance_restriction")?.as_f64()?;
            Some((name, minimum))
        })
        .collect())
}

pub fn minimum_balance_violations(store: &dyn Storage) -> StorageResult<Vec<BalanceViolation>> {
    let minimums = minimum_balances(store)?;
    let mut violations = Vec::new();

    for row in store.select(ACCOUNTS, &Filter::All)? {
        let Some(account_type) = row.get("account_type").and_then(Value::as_str) else {
            continue;
        };
        let Some(minimum) = minimums.get(account_type).copied() else {
            continue;
        };
        let Some(balance) = row.get("account_balance").and_then(Value::as_f64) else {
            continue;
        };
        if balance < minimum {
            violations.push(BalanceViolation {
                account_id: row.get("account_id").cloned().unwrap_or(Value::Null),
                account_type: account_type.to_string(),
                balance,
                minimum,
            });
        }
    }

    Ok(violations)
}

/// Opening dates of every owned account per customer key, ascending.
fn open_dates_by_customer(
    store: &dyn Storage,
) -> StorageResult<BTreeMap<String, Vec<NaiveDate>>> {
    let opened: BTreeMap<String, NaiveDate> = store
        .select(ACCOUNTS, &Filter::All)?
        .into_iter()
        .filter_map(|row| {
            let id = row.get("account_id")?.key();
            let date = row.get("date_opened")?.as_date()?;
            Some((id, date))
        })
        .collect();

    let mut owned: BTreeMap<String, Vec<NaiveDate>> = BTreeMap::new();
    for link in store.select(ACCOUNT_CUSTOMERS, &Filter::All)? {
        let (Some(account), Some(customer)) = (link.get("account_id"), link.get("customer_id"))
        else {
            continue;
        };
        let Some(date) = opened.get(&account.key()).copied() else {
            continue;
        };
        owned.entry(customer.key()).or_default().push(date);
    }
    for dates in owned.values_mut() {
        dates.sort_unstable();
    }

    Ok(owned)
}

pub fn transaction_after_open_violations(
    store: &dyn Storage,
) -> StorageResult<Vec<EarlyTransaction>> {
    let owned = open_dates_by_customer(store)?;
    let mut violations = Vec::new();

    for row in store.select(BANKING_TRANSACTIONS, &Filter::All)? {
        let Some(customer_id) = row.get("customer_id") else {
            continue;
        };
        let Some(dates) = owned.get(&customer_id.key()) else {
            continue;
        };
        let Some(transaction_date) = row.get("transaction_date").and_then(Value::as_date) else {
            continue;
        };
        let later_accounts = dates.len() - dates.partition_point(|open| *open <= transaction_date);
        if let Some(latest_open) = dates.last().copied()
            && later_accounts > 0
        {
            violations.push(EarlyTransaction {
                transaction_id: row.get("transaction_id").cloned().unwrap_or(Value::Null),
                customer_id: customer_id.clone(),
                transaction_date,
                latest_open,
                later_accounts,
            });
        }
    }

    Ok(violations)
}

/// Number of (transaction, owned account) pairs where the transaction
/// predates the account's opening.
pub fn early_transaction_pairs(violations: &[EarlyTransaction]) -> usize {
    violations.iter().map(|violation| violation.later_accounts).sum()
}
