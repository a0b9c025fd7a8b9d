use std::collections::HashSet;

use chrono::TimeDelta;

use ledgerseed_core::banking::tables::{BRANCH_EMPLOYEES, BRANCHES, EMPLOYEES};
use ledgerseed_core::{Row, Value};

use crate::entities::{EntityContext, EntityGenerator, EntityRegistry, row};
use crate::errors::GenerationError;

/// Probability that an assignment has already ended.
pub const ENDED_PROBABILITY: f64 = 0.7;

pub fn register(registry: &mut EntityRegistry) {
    registry.register_generator(Box::new(BranchAssignmentGenerator));
}

/// One or two branch assignments per employee.
struct BranchAssignmentGenerator;

impl EntityGenerator for BranchAssignmentGenerator {
    fn table(&self) -> &'static str {
        BRANCH_EMPLOYEES
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        let employees = ctx.parents.values(EMPLOYEES, "employee_id");
        let branches = ctx.require_if(!employees.is_empty(), BRANCHES, "branch_id")?;
        let today = ctx.values.today();
        let mut pairs = HashSet::new();
        let mut rows = Vec::new();

        for employee_id in employees {
            for _ in 0..ctx.one_or_two() {
                let Some(branch_id) = ctx.values.choose(&branches).cloned() else {
                    continue;
                };
                if !pairs.insert((branch_id.key(), employee_id.key())) {
                    continue;
                }
                let start = ctx.values.past_years(0, 10);
                let end = if ctx.values.chance(ENDED_PROBABILITY) {
                    let days = ctx.values.uniform_i64(30, 2000);
                    Some(start + TimeDelta::days(days)).filter(|end| *end <= today)
                } else {
                    None
                };
                rows.push(row([
                    ("branch_id", branch_id),
                    ("employee_id", employee_id.clone()),
                    ("start_date", Value::Date(start)),
                    ("end_date", Value::from(end)),
                ]));
            }
        }

        Ok(rows)
    }
}
