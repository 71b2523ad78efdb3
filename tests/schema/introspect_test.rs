#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::thread;

use common::{Category, Invoice, Ledger, Pet, Toy, User};
use sieve::schema::{RelationKind, Schema, SchemaRegistry};
use sieve::types::{DataType, ScalarType};

fn column_names(schema: &Schema) -> Vec<&str> {
    schema
        .root_table()
        .columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect()
}

#[test]
fn test_columns_follow_declaration_order() {
    let registry = SchemaRegistry::new();
    let schema = registry.schema::<User>();
    let table = schema.root_table();

    assert_eq!(table.name, "users");
    assert_eq!(table.record, "User");
    assert_eq!(
        column_names(&schema),
        vec![
            "id",
            "name",
            "email",
            "password",
            "age",
            "active",
            "created_at",
            "tags",
            "metadata",
            "shout",
            "address_street",
            "address_city",
        ]
    );
    assert!(!table.has_column("cache"));
}

#[test]
fn test_column_types() {
    let registry = SchemaRegistry::new();
    let schema = registry.schema::<User>();
    let table = schema.root_table();
    let data_type = |name: &str| table.column(name).map(|c| c.data_type);

    assert_eq!(data_type("age"), Some(DataType::Scalar(ScalarType::Int32)));
    assert_eq!(data_type("created_at"), Some(DataType::TIME));
    assert_eq!(data_type("tags"), Some(DataType::Array(ScalarType::Text)));
    assert_eq!(data_type("metadata"), Some(DataType::Unsupported));

    let metadata = table.column("metadata").unwrap();
    assert!(!metadata.is_queryable());
    let shout = table.column("shout").unwrap();
    assert_eq!(shout.computed.as_deref(), Some("upper(~~~ct~~~.name)"));
}

#[test]
fn test_primary_keys() {
    let registry = SchemaRegistry::new();
    let user = registry.schema::<User>();
    let keys: Vec<_> = user.root_table().primary_keys().map(|c| c.name.as_str()).collect();
    assert_eq!(keys, vec!["id"]);

    let ledger = registry.schema::<Ledger>();
    assert!(!ledger.root_table().has_primary_key());
}

#[test]
fn test_relation_kinds_and_keys() {
    let registry = SchemaRegistry::new();
    let pet = registry.schema::<Pet>();

    let owner = pet.relation(pet.root(), "Owner").unwrap();
    assert_eq!(owner.relation.kind, RelationKind::BelongsTo);
    assert_eq!(owner.relation.foreign_keys, vec!["owner_id".to_string()]);
    assert_eq!(owner.relation.references, vec!["id".to_string()]);
    assert_eq!(pet.table(owner.target).name, "users");

    let toys = pet.relation(pet.root(), "Toys").unwrap();
    assert_eq!(toys.relation.kind, RelationKind::HasMany);
    assert_eq!(toys.relation.foreign_keys, vec!["pet_id".to_string()]);

    let pets = pet.relation(owner.target, "Pets").unwrap();
    assert_eq!(pets.relation.kind, RelationKind::HasMany);
    assert_eq!(pets.target, pet.root());
}

#[test]
fn test_relation_to_keyless_record_is_kept() {
    let registry = SchemaRegistry::new();
    let invoice = registry.schema::<Invoice>();

    let ledger = invoice.relation(invoice.root(), "Ledger").unwrap();
    assert_eq!(ledger.relation.kind, RelationKind::BelongsTo);
    assert_eq!(ledger.relation.foreign_keys, vec!["ledger_id".to_string()]);
    assert!(ledger.relation.references.is_empty());
    assert!(!ledger.relation.is_keyed());
    assert!(!invoice.table(ledger.target).has_primary_key());
}

#[test]
fn test_self_reference_points_at_same_node() {
    let registry = SchemaRegistry::new();
    let schema = registry.schema::<Category>();

    let parent = schema.relation(schema.root(), "Parent").unwrap();
    let children = schema.relation(schema.root(), "Children").unwrap();
    assert_eq!(parent.target, schema.root());
    assert_eq!(children.target, schema.root());
    assert_eq!(parent.relation.kind, RelationKind::BelongsTo);
    assert_eq!(children.relation.foreign_keys, vec!["parent_id".to_string()]);
    assert_eq!(schema.graph().table_count(), 1);
}

#[test]
fn test_mutual_references_share_nodes() {
    let registry = SchemaRegistry::new();
    let pet = registry.schema::<Pet>();
    let toy = registry.schema::<Toy>();

    // Toy was reached from Pet and is not introspected again.
    assert_eq!(registry.snapshot().table_count(), 4);
    let back = toy.relation(toy.root(), "Pet").unwrap();
    assert_eq!(back.target, pet.root());
}

#[test]
fn test_cached_per_type() {
    let registry = SchemaRegistry::new();
    let first = registry.schema::<User>();
    let count = registry.snapshot().table_count();
    let second = registry.schema::<User>();

    assert_eq!(first.root(), second.root());
    assert_eq!(registry.snapshot().table_count(), count);
}

#[test]
fn test_concurrent_first_use() {
    let registry = Arc::new(SchemaRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                if i % 2 == 0 {
                    registry.schema::<User>().root()
                } else {
                    let pet = registry.schema::<Pet>();
                    pet.relation(pet.root(), "Owner").unwrap().target
                }
            })
        })
        .collect();

    let roots: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(roots.windows(2).all(|w| w[0] == w[1]));
    // users, pets, toys, ledgers
    assert_eq!(registry.snapshot().table_count(), 4);
}

#[test]
fn test_global_registry() {
    let schema = Schema::of::<Category>();
    assert_eq!(schema.root_table().name, "categories");
}
