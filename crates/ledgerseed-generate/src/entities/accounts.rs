use std::collections::HashSet;

use rand::seq::index;

use ledgerseed_core::banking::tables::{
    ACCOUNT_CUSTOMERS, ACCOUNT_TYPE, ACCOUNTS, BANKING_TRANSACTIONS, BRANCHES, CUSTOMERS,
};
use ledgerseed_core::{Row, Value};

use crate::entities::{EntityContext, EntityGenerator, EntityRegistry, row};
use crate::errors::GenerationError;
use crate::model::RowTargets;

pub const TRANSACTION_TYPES: &[&str] = &["Deposit", "Withdrawal", "Transfer", "Payment"];

pub fn register(registry: &mut EntityRegistry) {
    registry.register_generator(Box::new(AccountGenerator));
    registry.register_generator(Box::new(AccountOwnerGenerator));
    registry.register_generator(Box::new(BankingTransactionGenerator));
}

struct AccountGenerator;

impl EntityGenerator for AccountGenerator {
    fn table(&self) -> &'static str {
        ACCOUNTS
    }

    fn target(&self, targets: &RowTargets) -> Option<usize> {
        Some(targets.accounts)
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        let count = ctx.count.unwrap_or_default();
        let account_types = ctx.require_if(count > 0, ACCOUNT_TYPE, "account_type")?;
        let branches = ctx.require_if(count > 0, BRANCHES, "branch_id")?;
        let mut rows = Vec::with_capacity(count);

        for _ in 0..count {
            let account_type = ctx.values.choose(&account_types).cloned().unwrap_or(Value::Null);
            let branch_id = ctx.values.choose(&branches).cloned().unwrap_or(Value::Null);
            let date_opened = ctx.values.past_years(0, 20);
            let balance = ctx.values.money(0.0, 50_000.0);
            rows.push(row([
                ("account_balance", Value::Decimal(balance)),
                ("branch_id", branch_id),
                ("date_opened", Value::Date(date_opened)),
                ("account_type", account_type),
            ]));
        }

        Ok(rows)
    }
}

/// One or two distinct owners per account.
struct AccountOwnerGenerator;

impl EntityGenerator for AccountOwnerGenerator {
    fn table(&self) -> &'static str {
        ACCOUNT_CUSTOMERS
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        let accounts = ctx.parents.values(ACCOUNTS, "account_id");
        let customers = ctx.require_if(!accounts.is_empty(), CUSTOMERS, "customer_id")?;
        let mut rows = Vec::with_capacity(accounts.len());

        for account_id in accounts {
            let owners = ctx.one_or_two().min(customers.len());
            for picked in index::sample(ctx.values.rng(), customers.len(), owners) {
                rows.push(row([
                    ("account_id", account_id.clone()),
                    ("customer_id", customers[picked].clone()),
                ]));
            }
        }

        Ok(rows)
    }
}

/// Transactions for every customer that owns at least one account.
struct BankingTransactionGenerator;

impl EntityGenerator for BankingTransactionGenerator {
    fn table(&self) -> &'static str {
        BANKING_TRANSACTIONS
    }

    fn generate_after(&self) -> &'static [&'static str] {
        &[ACCOUNT_CUSTOMERS]
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        let owners: HashSet<String> = ctx
            .parents
            .values(ACCOUNT_CUSTOMERS, "customer_id")
            .iter()
            .map(Value::key)
            .collect();
        let customers: Vec<Value> = ctx
            .parents
            .values(CUSTOMERS, "customer_id")
            .into_iter()
            .filter(|customer| owners.contains(&customer.key()))
            .collect();

        let table = ctx.table;
        let mut rows = Vec::new();
        for customer_id in customers {
            let transactions = ctx.values.uniform_i64(5, 20);
            for _ in 0..transactions {
                let kind = ctx.values.choose(TRANSACTION_TYPES).copied().unwrap_or("Deposit");
                let description = ctx.values.sentence(table.max_length("description"));
                let amount = ctx.values.money(1.0, 2500.0);
                let date = ctx.values.past_years(0, 10);
                rows.push(row([
                    ("transaction_type", ctx.text("transaction_type", kind)),
                    ("description", Value::Text(description)),
                    ("amount", Value::Decimal(amount)),
                    ("transaction_date", Value::Date(date)),
                    ("customer_id", customer_id.clone()),
                ]));
            }
        }

        Ok(rows)
    }
}
