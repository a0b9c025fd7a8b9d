use chrono::TimeDelta;

use ledgerseed_core::banking::tables::{CC_TRANSACTIONS, CREDIT_CARDS, CUSTOMERS};
use ledgerseed_core::{Row, Value};

use crate::entities::{EntityContext, EntityGenerator, EntityRegistry, row};
use crate::errors::GenerationError;

/// Probability that a customer holds a credit card.
pub const CARD_PROBABILITY: f64 = 0.6;
pub const CREDIT_SCORE_MIN: i64 = 300;
pub const CREDIT_SCORE_MAX: i64 = 850;

pub fn register(registry: &mut EntityRegistry) {
    registry.register_generator(Box::new(CreditCardGenerator));
    registry.register_generator(Box::new(CardTransactionGenerator));
}

struct CreditCardGenerator;

impl EntityGenerator for CreditCardGenerator {
    fn table(&self) -> &'static str {
        CREDIT_CARDS
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        let customers = ctx.parents.values(CUSTOMERS, "customer_id");
        let max_len = ctx.max_len("cc_number");
        let mut rows = Vec::new();

        for customer_id in customers {
            if !ctx.values.chance(CARD_PROBABILITY) {
                continue;
            }
            let number = ctx
                .values
                .unique("cc_number", max_len, |values| values.card_number(None))?;
            let limit = ctx.values.money(1000.0, 20_000.0);
            let expiry = ctx.values.future(1, 5);
            let score = ctx.values.uniform_i64(CREDIT_SCORE_MIN, CREDIT_SCORE_MAX);
            rows.push(row([
                ("cc_number", Value::Text(number)),
                ("maximum_limit", Value::Decimal(limit)),
                ("expiry_date", Value::Date(expiry)),
                ("credit_score", Value::Int(score)),
                ("customer_id", customer_id),
            ]));
        }

        Ok(rows)
    }
}

/// Card transactions dated no later than the card's expiry.
struct CardTransactionGenerator;

impl EntityGenerator for CardTransactionGenerator {
    fn table(&self) -> &'static str {
        CC_TRANSACTIONS
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        let cards: Vec<(Value, Option<chrono::NaiveDate>)> = ctx
            .parents
            .rows(CREDIT_CARDS)
            .iter()
            .filter_map(|card| {
                let number = card.get("cc_number")?.clone();
                let expiry = card.get("expiry_date").and_then(Value::as_date);
                Some((number, expiry))
            })
            .collect();

        let table = ctx.table;
        let mut rows = Vec::new();
        for (number, expiry) in cards {
            let transactions = ctx.values.uniform_i64(5, 30);
            for _ in 0..transactions {
                let mut date = ctx.values.past_years(0, 5);
                if let Some(expiry) = expiry
                    && date > expiry
                {
                    let back = ctx.values.uniform_i64(1, 365);
                    date = expiry - TimeDelta::days(back);
                }
                let amount = ctx.values.money(1.0, 2500.0);
                let merchant = ctx.values.company(table.max_length("merchant_details"));
                rows.push(row([
                    ("cc_number", number.clone()),
                    ("transaction_date", Value::Date(date)),
                    ("amount", Value::Decimal(amount)),
                    ("merchant_details", Value::Text(merchant)),
                ]));
            }
        }

        Ok(rows)
    }
}
