use ledgerseed_core::{DatabaseSchema, DependencyGraph, banking_schema, validate_schema};
use schemars::schema_for;

#[test]
fn banking_schema_survives_json_round_trip() {
    let schema = banking_schema();
    let json = serde_json::to_string_pretty(&schema).expect("serialize schema");
    let loaded: DatabaseSchema = serde_json::from_str(&json).expect("parse schema");

    validate_schema(&loaded).expect("loaded schema validates");
    assert_eq!(loaded.table_names(), schema.table_names());
    assert_eq!(
        DependencyGraph::build(&loaded).insertion_order().unwrap(),
        DependencyGraph::build(&schema).insertion_order().unwrap()
    );
}

#[test]
fn minimal_schema_file_uses_defaults() {
    let json = r#"{
  "name": "shop",
  "tables": [
    {
      "name": "users",
      "columns": [
        { "name": "id", "logical_type": { "kind": "integer" }, "auto_increment": true },
        { "name": "email", "logical_type": { "kind": "text" }, "max_length": 40, "unique": true }
      ],
      "primary_key": ["id"]
    }
  ]
}"#;
    let schema: DatabaseSchema = serde_json::from_str(json).expect("parse schema");
    let users = schema.table("users").expect("users table");

    assert!(users.foreign_keys.is_empty());
    assert_eq!(users.max_length("email"), Some(40));
    assert!(!users.column("email").unwrap().nullable);
    validate_schema(&schema).expect("valid");
}

#[test]
fn json_schema_describes_tables() {
    let generated = schema_for!(DatabaseSchema);
    let json = serde_json::to_value(&generated).expect("serialize generated schema");

    assert_eq!(json["title"], "DatabaseSchema");
    assert!(json["properties"]["tables"].is_object());
    assert!(json["definitions"]["ForeignKey"].is_object());
}
