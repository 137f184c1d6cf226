//! DDL, raw statements and readable interpolation.

use quarry_core::{Dialect, QuarryError, Raw, ScalarKind, Value};
use serde_json::json;

use super::{assert_param, sqlite, v};
use crate::Compiler;

#[test]
fn test_create_with_typed_columns() {
    let compiled = sqlite()
        .create("t", &v(json!({"id": ["INT", "PRIMARY KEY"]})), None)
        .unwrap();
    assert_eq!(compiled.sql, "CREATE TABLE IF NOT EXISTS \"t\" (\"id\" INT PRIMARY KEY)");
    assert_eq!(sqlite().interpolate(&compiled), compiled.sql);
}

#[test]
fn test_create_without_if_not_exists() {
    let compiled = Compiler::new(Dialect::MsSql)
        .create("t", &v(json!({"id": "INT", "name": ["VARCHAR(30)", "NOT NULL"]})), None)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "CREATE TABLE \"t\" (\"id\" INT, \"name\" VARCHAR(30) NOT NULL)"
    );
}

#[test]
fn test_create_with_definitions_and_options() {
    let compiled = Compiler::new(Dialect::MySql)
        .create(
            "t",
            &v(json!(["<id> INT NOT NULL", "PRIMARY KEY (<id>)"])),
            Some(&v(json!({"ENGINE": "InnoDB", "AUTO_INCREMENT": 200}))),
        )
        .unwrap();
    assert_eq!(
        compiled.sql,
        "CREATE TABLE IF NOT EXISTS \"t\" (\"id\" INT NOT NULL, PRIMARY KEY (\"id\")) ENGINE = InnoDB, AUTO_INCREMENT = 200"
    );

    let compiled = sqlite()
        .create("t", &v(json!({"id": "INT"})), Some(&Value::from("WITHOUT ROWID")))
        .unwrap();
    assert_eq!(compiled.sql, "CREATE TABLE IF NOT EXISTS \"t\" (\"id\" INT) WITHOUT ROWID");
}

#[test]
fn test_create_rejects_bad_shapes() {
    let result = sqlite().create("t", &Value::from("id INT"), None);
    assert!(matches!(result, Err(QuarryError::Compile { .. })), "got {:?}", result);

    let result = sqlite().create("bad name", &v(json!({"id": "INT"})), None);
    assert!(matches!(result, Err(QuarryError::Validation { .. })), "got {:?}", result);
}

#[test]
fn test_raw_statement_keeps_bindings() {
    let raw = Raw::new("SELECT <id> FROM <account> WHERE <account.age> > :age").arg("age", 21);
    let compiled = Compiler::new(Dialect::Sqlite)
        .with_prefix("p_")
        .raw(&raw)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT \"id\" FROM \"p_account\" WHERE \"p_account\".\"age\" > :age"
    );
    assert_param(&compiled, ":age", 21, ScalarKind::Int);
}

#[test]
fn test_raw_statement_rejects_malformed_marker() {
    let result = sqlite().raw(&Raw::new("SELECT <a..b> FROM t"));
    assert!(matches!(result, Err(QuarryError::Validation { .. })), "got {:?}", result);
}

#[test]
fn test_interpolated_dry_run_text() {
    let c = Compiler::new(Dialect::MySql);
    let compiled = c
        .delete("t", Some(&v(json!({"name": "O'Neil", "age[>]": 3, "gone": null}))))
        .unwrap();
    assert_eq!(
        c.interpolate(&compiled),
        "DELETE FROM `t` WHERE `name` = 'O\\'Neil' AND `age` > 3 AND `gone` IS NULL"
    );
}
