#[path = "../common/mod.rs"]
mod common;

use std::fs;

use common::User;
use sieve::config::{Settings, SettingsError};
use sieve::prelude::*;
use sieve::schema::SchemaRegistry;

const SETTINGS: &str = r#"
disable_sort = true
search_fields = ["name", "Pets.name"]
search_operator = "$starts"
default_sort = ["name,DESC"]
default_page_size = 5

[blacklist]
fields = ["password", "email"]

[blacklist.nested.Pets]
fields = ["species"]
is_final = true
"#;

#[test]
fn test_load_from_file() {
    let dir = std::env::temp_dir().join(format!("sieve-settings-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("sieve.toml");
    fs::write(&path, SETTINGS).unwrap();

    let settings = Settings::from_file(&path).unwrap();
    fs::remove_dir_all(&dir).unwrap();

    assert!(settings.disable_sort);
    assert_eq!(settings.default_sort, vec![Sort::desc("name")]);
    assert_eq!(settings.default_page_size, 5);
    assert!(settings.blacklist.descend("Pets").is_final);
    settings.validate(OperatorRegistry::standard()).unwrap();
}

#[test]
fn test_toml_and_json_agree() {
    let from_toml = Settings::from_toml_str(SETTINGS).unwrap();
    let json = serde_json::to_string(&from_toml).unwrap();
    let from_json = Settings::from_json_str(&json).unwrap();
    assert_eq!(from_toml, from_json);
}

#[test]
fn test_settings_drive_compilation() {
    let settings = Settings::from_toml_str(SETTINGS).unwrap();
    let request = Request::new()
        .with_sort(Sort::asc("age"))
        .with_filter(Filter::new("Pets.Toys.name", "$eq", &["ball"]))
        .with_search("re")
        .with_page(2, 3);
    let schema = SchemaRegistry::new().schema::<User>();
    let (query, pagination) = Scope::new(schema, &settings)
        .apply_paginated(&request, Query::new())
        .unwrap();
    let sql = query.to_sql(Dialect::Postgres);

    // Request sorts are disabled; the default sort applies.
    assert!(sql.contains(r#"ORDER BY "users"."name" DESC"#), "{sql}");
    // Traversal stops at the final Pets level.
    assert!(!sql.contains("Pets__Toys"), "{sql}");
    assert!(sql.contains(r#""users"."name" LIKE 're%' ESCAPE '\' OR "Pets"."name" LIKE 're%' ESCAPE '\'"#), "{sql}");
    assert!(!sql.contains("email") && !sql.contains("password"), "{sql}");
    assert_eq!(pagination.offset(), 3);
}

#[test]
fn test_default_page_size_applies() {
    let settings = Settings::from_toml_str(SETTINGS).unwrap();
    let schema = SchemaRegistry::new().schema::<User>();
    let (query, pagination) = Scope::new(schema, &settings)
        .apply_paginated(&Request::new(), Query::new())
        .unwrap();
    assert_eq!(pagination, Pagination::new(1, 5));
    assert!(query.to_sql(Dialect::Postgres).ends_with("LIMIT 5 OFFSET 0"));
}

#[test]
fn test_invalid_settings() {
    assert!(matches!(
        Settings::from_toml_str("disable_sort = \"yes\""),
        Err(SettingsError::ParseError(_))
    ));
    assert!(matches!(
        Settings::from_json_str("{\"blacklist\": 5}"),
        Err(SettingsError::JsonError(_))
    ));
    assert!(matches!(
        Settings::from_file("/definitely/not/here.toml"),
        Err(SettingsError::FileNotFound(_))
    ));
}
