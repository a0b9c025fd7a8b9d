use ledgerseed_core::Row;
use ledgerseed_core::Value;
use ledgerseed_core::banking::tables::{ACCOUNT_TYPE, BRANCHES};

use crate::entities::{EntityContext, EntityGenerator, EntityRegistry, row};
use crate::errors::GenerationError;
use crate::model::RowTargets;

/// Account types and their minimum balance restriction.
pub const ACCOUNT_TYPES: &[(&str, f64)] = &[
    ("Checking", 0.0),
    ("Savings", 100.0),
    ("Business", 1000.0),
    ("Student", 25.0),
    ("Money Market", 2500.0),
];

pub fn register(registry: &mut EntityRegistry) {
    registry.register_generator(Box::new(AccountTypeGenerator));
    registry.register_generator(Box::new(BranchGenerator));
}

struct AccountTypeGenerator;

impl EntityGenerator for AccountTypeGenerator {
    fn table(&self) -> &'static str {
        ACCOUNT_TYPE
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        Ok(ACCOUNT_TYPES
            .iter()
            .map(|(name, minimum)| {
                row([
                    ("account_type", ctx.text("account_type", *name)),
                    ("minimum_balance_restriction", Value::Decimal(*minimum)),
                ])
            })
            .collect())
    }
}

struct BranchGenerator;

impl EntityGenerator for BranchGenerator {
    fn table(&self) -> &'static str {
        BRANCHES
    }

    fn target(&self, targets: &RowTargets) -> Option<usize> {
        Some(targets.branches)
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        let count = ctx.count.unwrap_or_default();
        let table = ctx.table;
        let limit = |column: &str| table.max_length(column);
        let mut rows = Vec::with_capacity(count);
        for _ in 0..count {
            let street = ctx.values.street_address(limit("street_address"));
            let city = ctx.values.city(limit("city"));
            let state = ctx.values.state(limit("state"));
            let phone = ctx.values.phone(limit("phone_number"));
            let zipcode = ctx.values.zipcode();
            rows.push(row([
                ("branch_name", ctx.text("branch_name", format!("{city} Branch"))),
                ("street_address", Value::Text(street)),
                ("city", Value::Text(city)),
                ("state", Value::Text(state)),
                ("zipcode", Value::Int(zipcode)),
                ("phone_number", Value::Text(phone)),
            ]));
        }
        Ok(rows)
    }
}
