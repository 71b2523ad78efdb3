#[path = "../common/mod.rs"]
mod common;

use common::{validate_sql, Invoice, Pet, User};
use sieve::blacklist::Blacklist;
use sieve::dsl::Join;
use sieve::error::CompileError;
use sieve::planner::JoinPlanner;
use sieve::schema::SchemaRegistry;
use sieve::sql::expr::{table_col, ExprExt};
use sieve::sql::{Dialect, Query, TableRef};

fn users() -> Query {
    Query::new()
        .add_select(table_col("users", "id"))
        .from(TableRef::new("users"))
}

#[test]
fn test_resolve_nested_column() {
    let schema = SchemaRegistry::new().schema::<User>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "users");

    let resolved = planner.resolve_column("Pets.Toys.name").unwrap();
    let aliases: Vec<_> = resolved.hops.iter().map(|h| h.alias.as_str()).collect();
    assert_eq!(aliases, vec!["Pets", "Pets__Toys"]);
    assert_eq!(resolved.hops[1].path, "Pets.Toys");

    let (query, column) = planner.column_expr(users(), &resolved);
    assert_eq!(column.to_sql(Dialect::Postgres), "\"Pets__Toys\".\"name\"");
    assert_eq!(query.joins.len(), 2);
    assert_eq!(planner.scope_of(&resolved.hops), "Pets__Toys");
    assert_eq!(planner.scope_of(&[]), "users");

    assert!(planner.resolve_column("Pets.Toys.color").is_none());
    assert!(planner.resolve_column("Pets.Fleas.name").is_none());
    assert!(planner.resolve_column("metadata").is_none());
}

#[test]
fn test_blacklist_stops_at_first_forbidden_level() {
    let schema = SchemaRegistry::new().schema::<User>();
    let blacklist = Blacklist::new()
        .with_fields(&["password"])
        .with_nested(
            "Pets",
            Blacklist::new()
                .with_fields(&["species"])
                .with_nested("Owner", Blacklist::new().final_level()),
        );
    let planner = JoinPlanner::new(&schema, &blacklist, "users");

    assert!(planner.resolve_column("password").is_none());
    assert!(planner.resolve_column("Pets.name").is_some());
    assert!(planner.resolve_column("Pets.species").is_none());
    // The nested level only hides its own fields.
    assert!(planner.resolve_column("Pets.Owner.password").is_some());
    assert!(planner.resolve_column("Pets.Owner.Pets.name").is_none());

    let blacklist = Blacklist::new().final_level();
    let planner = JoinPlanner::new(&schema, &blacklist, "users");
    assert!(planner.resolve_column("name").is_some());
    assert!(planner.resolve_column("Pets.name").is_none());

    let blacklist = Blacklist::new().with_relations(&["Pets"]);
    let planner = JoinPlanner::new(&schema, &blacklist, "users");
    assert!(planner.resolve_path(&["Pets"]).is_none());
    assert!(planner.resolve_path(&["Ledgers"]).is_some());
}

#[test]
fn test_each_path_joins_once() {
    let schema = SchemaRegistry::new().schema::<User>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "users");

    let mut query = users();
    for field in ["Pets.name", "Pets.Toys.name", "Pets.Toys.price", "Pets.id"] {
        let resolved = planner.resolve_column(field).unwrap();
        query = planner.ensure_joins(query, &resolved.hops);
    }

    let aliases: Vec<_> = query.joins.iter().map(|j| j.name_in_scope()).collect();
    assert_eq!(aliases, vec!["Pets", "Pets__Toys"]);

    insta::assert_snapshot!(query.to_sql(Dialect::Postgres), @r#"
    SELECT
      "users"."id"
    FROM "users"
    LEFT JOIN "pets" AS "Pets" ON "Pets"."owner_id" = "users"."id"
    LEFT JOIN "toys" AS "Pets__Toys" ON "Pets__Toys"."pet_id" = "Pets"."id"
    "#);
}

#[test]
fn test_caller_join_is_merged() {
    let schema = SchemaRegistry::new().schema::<User>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "users");

    let query = users().inner_join(
        TableRef::new("pets").with_alias("Pets"),
        table_col("Pets", "name").ne("Rex"),
    );
    let resolved = planner.resolve_column("Pets.name").unwrap();
    let query = planner.ensure_joins(query, &resolved.hops);
    let query = planner.ensure_joins(query, &resolved.hops);

    assert_eq!(query.joins.len(), 1);
    assert_eq!(
        query.joins[0].on.to_sql(Dialect::Postgres),
        "\"Pets\".\"owner_id\" = \"users\".\"id\" AND (\"Pets\".\"name\" <> 'Rex')"
    );
}

#[test]
fn test_caller_join_on_other_table_keeps_its_alias() {
    let schema = SchemaRegistry::new().schema::<User>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "users");

    let query = users().inner_join(
        TableRef::new("toys").with_alias("Pets"),
        table_col("Pets", "price").gt(10.0),
    );
    let resolved = planner.resolve_column("Pets.name").unwrap();
    let (query, column) = planner.column_expr(query, &resolved);

    assert_eq!(query.joins.len(), 2);
    assert_eq!(
        query.joins[0].on.to_sql(Dialect::Postgres),
        "\"Pets\".\"price\" > 10.0"
    );
    assert_eq!(column.to_sql(Dialect::Postgres), "\"Pets_1\".\"name\"");

    let sql = query.to_sql(Dialect::Postgres);
    assert!(sql.contains(r#"LEFT JOIN "pets" AS "Pets_1" ON "Pets_1"."owner_id" = "users"."id""#), "{sql}");
    validate_sql(&sql, Dialect::Postgres).unwrap();
}

#[test]
fn test_unaliased_caller_join_is_reused() {
    let schema = SchemaRegistry::new().schema::<User>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "users");

    let query = users().left_join(
        TableRef::new("pets"),
        table_col("pets", "name").ne("Rex"),
    );
    let resolved = planner.resolve_column("Pets.Toys.name").unwrap();
    let (query, column) = planner.column_expr(query, &resolved);
    let resolved = planner.resolve_column("Pets.name").unwrap();
    let (query, pet_name) = planner.column_expr(query, &resolved);

    let aliases: Vec<_> = query.joins.iter().map(|j| j.name_in_scope()).collect();
    assert_eq!(aliases, vec!["pets", "Pets__Toys"]);
    assert_eq!(
        query.joins[0].on.to_sql(Dialect::Postgres),
        "\"pets\".\"owner_id\" = \"users\".\"id\" AND (\"pets\".\"name\" <> 'Rex')"
    );
    assert_eq!(
        query.joins[1].on.to_sql(Dialect::Postgres),
        "\"Pets__Toys\".\"pet_id\" = \"pets\".\"id\""
    );
    assert_eq!(column.to_sql(Dialect::Postgres), "\"Pets__Toys\".\"name\"");
    assert_eq!(pet_name.to_sql(Dialect::Postgres), "\"pets\".\"name\"");
}

#[test]
fn test_reused_caller_join_scopes_computed_columns() {
    let schema = SchemaRegistry::new().schema::<Pet>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "pets");

    let query = Query::new().from(TableRef::new("pets")).inner_join(
        TableRef::new("users"),
        table_col("users", "active").eq(true),
    );
    let query = planner
        .select_join(query, &Join::new("Owner").with_fields(&["shout"]))
        .unwrap();
    assert_eq!(query.joins.len(), 1);

    let query = Query {
        select: planner.into_selection(),
        ..query
    };
    let sql = query.to_sql(Dialect::Postgres);
    assert!(sql.contains(r#""users"."id" AS "Owner.id""#), "{sql}");
    assert!(sql.contains(r#"upper("users".name) AS "Owner.shout""#), "{sql}");
    assert!(sql.contains(r#"INNER JOIN "users" ON "users"."id" = "pets"."owner_id" AND ("users"."active" = true)"#), "{sql}");
}

#[test]
fn test_select_join_adds_keys() {
    let schema = SchemaRegistry::new().schema::<User>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "users");

    let query = planner
        .select_join(users(), &Join::new("Pets.Toys").with_fields(&["price", "color"]))
        .unwrap();
    assert_eq!(query.joins.len(), 2);
    assert_eq!(planner.root_keys(), ["id".to_string()]);

    let selection = planner.into_selection();
    let labels: Vec<_> = selection
        .iter()
        .filter_map(|s| s.alias.as_deref())
        .collect();
    assert_eq!(
        labels,
        vec!["Pets.id", "Pets.owner_id", "Pets.Toys.id", "Pets.Toys.price", "Pets.Toys.pet_id"]
    );

    let query = Query {
        select: selection,
        ..query
    };
    validate_sql(&query.to_sql(Dialect::Postgres), Dialect::Postgres).unwrap();
}

#[test]
fn test_select_join_key_only_and_auto_select() {
    let schema = SchemaRegistry::new().schema::<Pet>();
    let blacklist = Blacklist::new().with_nested("Owner", Blacklist::new().with_fields(&["password", "id"]));
    let mut planner = JoinPlanner::new(&schema, &blacklist, "pets");

    let query = planner
        .select_join(Query::new().from(TableRef::new("pets")), &Join::new("Owner").with_fields(&[]))
        .unwrap();
    let labels: Vec<_> = planner
        .into_selection()
        .into_iter()
        .filter_map(|s| s.alias)
        .collect();
    // Blacklisting a primary key does not stop it being selected for reassembly.
    assert_eq!(labels, vec!["Owner.id"]);
    assert_eq!(query.joins.len(), 1);

    let mut planner = JoinPlanner::new(&schema, &blacklist, "pets");
    let query = planner
        .select_join(Query::new().from(TableRef::new("pets")), &Join::new("Owner"))
        .unwrap();
    assert_eq!(query.joins.len(), 1);
    assert_eq!(planner.root_keys(), ["owner_id".to_string()]);
    let labels: Vec<_> = planner
        .into_selection()
        .into_iter()
        .filter_map(|s| s.alias)
        .collect();
    assert!(labels.contains(&"Owner.id".to_string()));
    assert!(labels.contains(&"Owner.name".to_string()));
    assert!(!labels.contains(&"Owner.password".to_string()));
    // Unsupported columns cannot be filtered on but are still fetched.
    assert!(labels.contains(&"Owner.metadata".to_string()));
}

#[test]
fn test_computed_column_uses_join_alias() {
    let schema = SchemaRegistry::new().schema::<Pet>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "p");

    let query = Query::new().from(TableRef::new("pets").with_alias("p"));
    let query = planner
        .select_join(query, &Join::new("Owner").with_fields(&["shout"]))
        .unwrap();
    let query = Query {
        select: planner.into_selection(),
        ..query
    };
    let sql = query.to_sql(Dialect::Postgres);

    assert!(sql.contains(r#"upper("Owner".name) AS "Owner.shout""#), "{sql}");
    assert!(sql.contains(r#"ON "Owner"."id" = "p"."owner_id""#), "{sql}");
}

#[test]
fn test_join_without_primary_key_is_fatal() {
    let schema = SchemaRegistry::new().schema::<User>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "users");

    let err = planner.select_join(users(), &Join::new("Ledgers")).unwrap_err();
    assert_eq!(
        err,
        CompileError::MissingPrimaryKey {
            record: "Ledger".into(),
            table: "ledgers".into(),
        }
    );
}

#[test]
fn test_belongs_to_keyless_record_is_fatal() {
    let schema = SchemaRegistry::new().schema::<Invoice>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "invoices");

    let query = Query::new().from(TableRef::new("invoices"));
    let err = planner.select_join(query, &Join::new("Ledger")).unwrap_err();
    assert_eq!(
        err,
        CompileError::MissingPrimaryKey {
            record: "Ledger".into(),
            table: "ledgers".into(),
        }
    );

    // Without a key to join on, filtering through the relation is dropped.
    assert!(planner.resolve_path(&["Ledger"]).is_some());
    assert!(planner.resolve_column("Ledger.code").is_none());
}

#[test]
fn test_unknown_join_is_dropped() {
    let schema = SchemaRegistry::new().schema::<User>();
    let mut planner = JoinPlanner::new(&schema, Blacklist::empty(), "users");

    let query = planner.select_join(users(), &Join::new("Friends")).unwrap();
    assert!(query.joins.is_empty());
    assert!(!planner.has_selection());
}
