use ledgerseed_core::banking::tables::{CUSTOMERS, EMPLOYEES};
use ledgerseed_core::{Row, Table, Value};

use crate::entities::{EntityContext, EntityGenerator, EntityRegistry, row};
use crate::errors::GenerationError;
use crate::model::RowTargets;
use crate::values::ValueProvider;

pub const ACCESS_LEVELS: &[&str] = &["Teller", "Manager", "Analyst", "Clerk"];

pub fn register(registry: &mut EntityRegistry) {
    registry.register_generator(Box::new(CustomerGenerator));
    registry.register_generator(Box::new(EmployeeGenerator));
}

/// Postal address columns shared by customers and employees.
fn push_address(row: &mut Row, table: &Table, values: &mut ValueProvider) {
    let street = values.street_address(table.max_length("street_address"));
    let city = values.city(table.max_length("city"));
    let state = values.state(table.max_length("state"));
    row.insert("street_address".to_string(), Value::Text(street));
    row.insert("city".to_string(), Value::Text(city));
    row.insert("state".to_string(), Value::Text(state));
    row.insert("zipcode".to_string(), Value::Int(values.zipcode()));
}

struct CustomerGenerator;

impl EntityGenerator for CustomerGenerator {
    fn table(&self) -> &'static str {
        CUSTOMERS
    }

    fn target(&self, targets: &RowTargets) -> Option<usize> {
        Some(targets.customers)
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        let count = ctx.count.unwrap_or_default();
        let table = ctx.table;
        let values = &mut *ctx.values;
        let mut rows = Vec::with_capacity(count);

        for _ in 0..count {
            let first_name = values.first_name(table.max_length("first_name"));
            let last_name = values.last_name(table.max_length("last_name"));
            let date_of_birth = values.birthdate_for_age(18, 90);
            let email = values.unique_email(table.max_length("email"))?;

            let mut customer = row([
                ("first_name", Value::Text(first_name)),
                ("last_name", Value::Text(last_name)),
                ("date_of_birth", Value::Date(date_of_birth)),
            ]);
            push_address(&mut customer, table, values);
            customer.insert("email".to_string(), Value::Text(email));
            customer.insert(
                "sex".to_string(),
                Value::Text(values.sex(table.max_length("sex"))),
            );
            rows.push(customer);
        }

        Ok(rows)
    }
}

struct EmployeeGenerator;

impl EntityGenerator for EmployeeGenerator {
    fn table(&self) -> &'static str {
        EMPLOYEES
    }

    fn target(&self, targets: &RowTargets) -> Option<usize> {
        Some(targets.employees)
    }

    fn generate(&self, ctx: &mut EntityContext<'_>) -> Result<Vec<Row>, GenerationError> {
        let count = ctx.count.unwrap_or_default();
        let table = ctx.table;
        let mut rows = Vec::with_capacity(count);

        for _ in 0..count {
            let first_name = ctx.values.first_name(table.max_length("first_name"));
            let last_name = ctx.values.last_name(table.max_length("last_name"));
            let level = ctx.values.choose(ACCESS_LEVELS).copied().unwrap_or("Teller");
            let date_of_birth = ctx.values.birthdate_for_age(21, 70);

            // Supervisors are backfilled once every employee exists.
            let mut employee = row([
                ("first_name", Value::Text(first_name)),
                ("last_name", Value::Text(last_name)),
                ("supervisor_id", Value::Null),
                ("level_of_access", ctx.text("level_of_access", level)),
                ("date_of_birth", Value::Date(date_of_birth)),
            ]);
            push_address(&mut employee, table, ctx.values);
            employee.insert(
                "sex".to_string(),
                Value::Text(ctx.values.sex(table.max_length("sex"))),
            );
            rows.push(employee);
        }

        Ok(rows)
    }
}
