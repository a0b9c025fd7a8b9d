use ledgerseed_core::banking::tables::{CUSTOMERS, LOAN};
use ledgerseed_core::{Row, Value};

use crate::entities::{EntityContext, EntityGenerator, EntityRegistry, row};
use crate::errors::GenerationError;

pub const LOAN_TYPES: &[&str] = &["Home", "Auto", "Personal", "Student"];
/// Probability that a customer has a loan.
pub const LOAN_PROBABILITY: f64 = 0.35;

pub fn register(registry: &mut EntityRegistry) {
    registry.register_generator(Box::new(LoanGenerator));
}

struct LoanGenerator;

impl EntityGenerator for LoanGenerator {
    fn table(&self) -> &'static str {
        LOAN
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        let customers = ctx.parents.values(CUSTOMERS, "customer_id");
        let mut rows = Vec::new();

        for customer_id in customers {
            if !ctx.values.chance(LOAN_PROBABILITY) {
                continue;
            }
            let taken = ctx.values.money(2000.0, 100_000.0);
            let repaid = ctx.values.money(0.0, taken);
            let duration = ctx.values.money(0.5, 30.0);
            let start = ctx.values.past_years(0, 15);
            let rate = ctx.values.money(2.5, 18.0);
            let kind = ctx.values.choose(LOAN_TYPES).copied().unwrap_or("Personal");
            rows.push(row([
                ("duration_in_years", Value::Decimal(duration)),
                ("loan_start_date", Value::Date(start)),
                ("interest_rate", Value::Decimal(rate)),
                ("loan_amount_taken", Value::Decimal(taken)),
                ("loan_amount_repaid", Value::Decimal(repaid)),
                ("loan_type", ctx.text("loan_type", kind)),
                ("customer_id", customer_id),
            ]));
        }

        Ok(rows)
    }
}
