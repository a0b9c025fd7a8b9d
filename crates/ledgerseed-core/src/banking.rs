//! Built-in retail banking schema.
//!
//! This is the descriptor set the generators and business rules are written
//! against. Alternative schemas can be loaded from JSON, but only tables with
//! a registered generator are populated.

use crate::schema::{Column, DatabaseSchema, ForeignKey, Table};
use crate::types::LogicalType;

/// Table names of the banking schema.
pub mod tables {
    pub const ACCOUNT_TYPE: &str = "account_type";
    pub const BRANCHES: &str = "branches";
    pub const CUSTOMERS: &str = "customers";
    pub const EMPLOYEES: &str = "employees";
    pub const ACCOUNTS: &str = "accounts";
    pub const ACCOUNT_CUSTOMERS: &str = "account_customers";
    pub const BANKING_TRANSACTIONS: &str = "banking_transactions";
    pub const CREDIT_CARDS: &str = "credit_cards";
    pub const CC_TRANSACTIONS: &str = "cc_transactions";
    pub const LOAN: &str = "loan";
    pub const BRANCH_EMPLOYEES: &str = "branch_employees";
}

use tables::*;

const MONEY: LogicalType = LogicalType::Decimal {
    precision: 12,
    scale: 2,
};
const AMOUNT: LogicalType = LogicalType::Decimal {
    precision: 10,
    scale: 2,
};
const RATE: LogicalType = LogicalType::Decimal {
    precision: 5,
    scale: 2,
};

pub fn banking_schema() -> DatabaseSchema {
    DatabaseSchema {
        name: "citi_db".to_string(),
        tables: vec![
            account_type(),
            branches(),
            customers(),
            employees(),
            accounts(),
            account_customers(),
            banking_transactions(),
            credit_cards(),
            cc_transactions(),
            loan(),
            branch_employees(),
        ],
    }
}

fn id(name: &str) -> Column {
    Column::new(name, LogicalType::Integer).auto_increment()
}

fn int(name: &str) -> Column {
    Column::new(name, LogicalType::Integer)
}

fn date(name: &str) -> Column {
    Column::new(name, LogicalType::Date)
}

fn address_columns() -> Vec<Column> {
    vec![
        Column::text("street_address", 100),
        Column::text("city", 50),
        Column::text("state", 2),
        int("zipcode"),
    ]
}

fn account_type() -> Table {
    Table {
        name: ACCOUNT_TYPE.to_string(),
        columns: vec![
            Column::text("account_type", 20),
            Column::new("minimum_balance_restriction", AMOUNT),
        ],
        primary_key: vec!["account_type".to_string()],
        foreign_keys: Vec::new(),
    }
}

fn branches() -> Table {
    let mut columns = vec![id("branch_id"), Column::text("branch_name", 50)];
    columns.extend(address_columns());
    columns.push(Column::text("phone_number", 15));
    Table {
        name: BRANCHES.to_string(),
        columns,
        primary_key: vec!["branch_id".to_string()],
        foreign_keys: Vec::new(),
    }
}

fn customers() -> Table {
    let mut columns = vec![
        id("customer_id"),
        Column::text("first_name", 30),
        Column::text("last_name", 30),
        date("date_of_birth"),
    ];
    columns.extend(address_columns());
    columns.push(Column::text("email", 50).unique());
    columns.push(Column::text("sex", 1));
    Table {
        name: CUSTOMERS.to_string(),
        columns,
        primary_key: vec!["customer_id".to_string()],
        foreign_keys: Vec::new(),
    }
}

fn employees() -> Table {
    let mut columns = vec![
        id("employee_id"),
        Column::text("first_name", 30),
        Column::text("last_name", 30),
        int("supervisor_id").nullable(),
        Column::text("level_of_access", 20),
        date("date_of_birth"),
    ];
    columns.extend(address_columns());
    columns.push(Column::text("sex", 1));
    Table {
        name: EMPLOYEES.to_string(),
        columns,
        primary_key: vec!["employee_id".to_string()],
        foreign_keys: vec![ForeignKey::new("supervisor_id", EMPLOYEES, "employee_id")],
    }
}

fn accounts() -> Table {
    Table {
        name: ACCOUNTS.to_string(),
        columns: vec![
            id("account_id"),
            Column::new("account_balance", MONEY),
            int("branch_id"),
            date("date_opened"),
            Column::text("account_type", 20),
        ],
        primary_key: vec!["account_id".to_string()],
        foreign_keys: vec![
            ForeignKey::new("branch_id", BRANCHES, "branch_id"),
            ForeignKey::new("account_type", ACCOUNT_TYPE, "account_type"),
        ],
    }
}

fn account_customers() -> Table {
    Table {
        name: ACCOUNT_CUSTOMERS.to_string(),
        columns: vec![int("account_id"), int("customer_id")],
        primary_key: vec!["account_id".to_string(), "customer_id".to_string()],
        foreign_keys: vec![
            ForeignKey::new("account_id", ACCOUNTS, "account_id"),
            ForeignKey::new("customer_id", CUSTOMERS, "customer_id"),
        ],
    }
}

fn banking_transactions() -> Table {
    Table {
        name: BANKING_TRANSACTIONS.to_string(),
        columns: vec![
            id("transaction_id"),
            Column::text("transaction_type", 20),
            Column::text("description", 100),
            Column::new("amount", AMOUNT),
            date("transaction_date"),
            int("customer_id"),
        ],
        primary_key: vec!["transaction_id".to_string()],
        foreign_keys: vec![ForeignKey::new("customer_id", CUSTOMERS, "customer_id")],
    }
}

fn credit_cards() -> Table {
    Table {
        name: CREDIT_CARDS.to_string(),
        columns: vec![
            Column::text("cc_number", 16),
            Column::new("maximum_limit", AMOUNT),
            date("expiry_date"),
            int("credit_score"),
            int("customer_id"),
        ],
        primary_key: vec!["cc_number".to_string()],
        foreign_keys: vec![ForeignKey::new("customer_id", CUSTOMERS, "customer_id")],
    }
}

fn cc_transactions() -> Table {
    Table {
        name: CC_TRANSACTIONS.to_string(),
        columns: vec![
            id("transaction_id"),
            Column::text("cc_number", 16),
            date("transaction_date"),
            Column::new("amount", AMOUNT),
            Column::text("merchant_details", 100),
        ],
        primary_key: vec!["transaction_id".to_string()],
        foreign_keys: vec![ForeignKey::new("cc_number", CREDIT_CARDS, "cc_number")],
    }
}

fn loan() -> Table {
    Table {
        name: LOAN.to_string(),
        columns: vec![
            id("loan_id"),
            Column::new("duration_in_years", RATE),
            date("loan_start_date"),
            Column::new("interest_rate", RATE),
            Column::new("loan_amount_taken", MONEY),
            Column::new("loan_amount_repaid", MONEY),
            Column::text("loan_type", 20),
            int("customer_id"),
        ],
        primary_key: vec!["loan_id".to_string()],
        foreign_keys: vec![ForeignKey::new("customer_id", CUSTOMERS, "customer_id")],
    }
}

fn branch_employees() -> Table {
    Table {
        name: BRANCH_EMPLOYEES.to_string(),
        columns: vec![
            int("branch_id"),
            int("employee_id"),
            date("start_date"),
            date("end_date").nullable(),
        ],
        primary_key: vec!["branch_id".to_string(), "employee_id".to_string()],
        foreign_keys: vec![
            ForeignKey::new("branch_id", BRANCHES, "branch_id"),
            ForeignKey::new("employee_id", EMPLOYEES, "employee_id"),
        ],
    }
}
