//! Shared helpers for the proxy suite.

#![allow(dead_code)]

use quarry::{connect, ConnectOptions, Connection, Value};
use tempfile::TempDir;

pub fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

/// Blog schema: `account` and `post`, with a few rows.
pub async fn seed_blog(conn: &Connection) {
    conn.create(
        "account",
        v(serde_json::json!({
            "user_id": ["INTEGER", "PRIMARY KEY"],
            "name": ["TEXT", "NOT NULL"],
            "profile": "TEXT"
        })),
        None,
    )
    .await
    .unwrap();
    conn.create(
        "post",
        v(serde_json::json!({
            "id": ["INTEGER", "PRIMARY KEY"],
            "author_id": "INTEGER",
            "title": "TEXT",
            "score": "REAL"
        })),
        None,
    )
    .await
    .unwrap();

    conn.insert(
        "account",
        v(serde_json::json!([
            {"user_id": 1, "name": "ann", "profile": "{\"lang\":\"en\"}"},
            {"user_id": 2, "name": "bob", "profile": "{\"lang\":\"fr\"}"}
        ])),
    )
    .await
    .unwrap();
    conn.insert(
        "post",
        v(serde_json::json!([
            {"author_id": 1, "title": "hello", "score": 4.5},
            {"author_id": 1, "title": "again", "score": 3.0},
            {"author_id": 2, "title": "bonjour", "score": 5.0}
        ])),
    )
    .await
    .unwrap();
}

/// Connected blog database in memory.
pub async fn blog() -> Connection {
    let conn = connect(ConnectOptions::sqlite(":memory:")).await.unwrap();
    seed_blog(&conn).await;
    conn
}

/// Options for a SQLite file inside `dir`.
pub fn file_options(dir: &TempDir, name: &str) -> ConnectOptions {
    ConnectOptions::sqlite(dir.path().join(name).to_string_lossy().into_owned())
}
