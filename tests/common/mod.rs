//! Record fixtures shared by the integration tests.
#![allow(dead_code)]

use sieve::prelude::*;
use sqlparser::dialect::{DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

pub struct User;
pub struct Address;
pub struct Pet;
pub struct Toy;
pub struct Category;
pub struct Ledger;
pub struct Invoice;

impl Record for User {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("User")
            .field(FieldDescriptor::column::<i64>("Id").primary_key())
            .field(FieldDescriptor::column::<String>("Name"))
            .field(FieldDescriptor::column::<String>("Email"))
            .field(FieldDescriptor::column::<String>("Password"))
            .field(FieldDescriptor::column::<i32>("Age"))
            .field(FieldDescriptor::column::<bool>("Active"))
            .field(FieldDescriptor::scalar("CreatedAt", DataType::TIME))
            .field(FieldDescriptor::column::<Vec<String>>("Tags"))
            .field(FieldDescriptor::column::<serde_json::Value>("Metadata"))
            .field(
                FieldDescriptor::column::<String>("Shout").computed("upper(~~~ct~~~.name)"),
            )
            .field(FieldDescriptor::embedded::<Address>("Address", Some("address_")))
            .field(FieldDescriptor::column::<String>("Cache").ignore())
            .field(FieldDescriptor::to_many::<Pet>("Pets").foreign_key(&["owner_id"]))
            .field(FieldDescriptor::to_many::<Ledger>("Ledgers"))
    }
}

impl Record for Address {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Address")
            .field(FieldDescriptor::column::<String>("Street"))
            .field(FieldDescriptor::column::<String>("City"))
    }
}

impl Record for Pet {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Pet")
            .field(FieldDescriptor::column::<i64>("Id").primary_key())
            .field(FieldDescriptor::column::<String>("Name"))
            .field(FieldDescriptor::scalar(
                "Species",
                DataType::Scalar(ScalarType::Enum),
            ))
            .field(FieldDescriptor::column::<i64>("OwnerId"))
            .field(FieldDescriptor::to_one::<User>("Owner"))
            .field(FieldDescriptor::to_many::<Toy>("Toys"))
    }
}

impl Record for Toy {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Toy")
            .field(FieldDescriptor::column::<i64>("Id").primary_key())
            .field(FieldDescriptor::column::<String>("Name"))
            .field(FieldDescriptor::column::<f64>("Price"))
            .field(FieldDescriptor::column::<i64>("PetId"))
            .field(FieldDescriptor::to_one::<Pet>("Pet"))
    }
}

impl Record for Category {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Category")
            .field(FieldDescriptor::column::<i64>("Id").primary_key())
            .field(FieldDescriptor::column::<String>("Name"))
            .field(FieldDescriptor::column::<Option<i64>>("ParentId"))
            .field(FieldDescriptor::to_one::<Category>("Parent"))
            .field(FieldDescriptor::to_many::<Category>("Children").foreign_key(&["parent_id"]))
    }
}

/// A record without a primary key.
impl Record for Ledger {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Ledger")
            .field(FieldDescriptor::column::<String>("Code"))
            .field(FieldDescriptor::column::<f64>("Amount"))
            .field(FieldDescriptor::column::<i64>("UserId"))
            .field(FieldDescriptor::to_one::<User>("User"))
    }
}

/// Belongs to a record without a primary key.
impl Record for Invoice {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("Invoice")
            .field(FieldDescriptor::column::<i64>("Id").primary_key())
            .field(FieldDescriptor::column::<String>("Number"))
            .field(FieldDescriptor::column::<i64>("LedgerId"))
            .field(FieldDescriptor::to_one::<Ledger>("Ledger"))
    }
}

/// Parse `sql` with sqlparser for `dialect`.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
    };

    Parser::parse_sql(&*parser_dialect, sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql))
}
