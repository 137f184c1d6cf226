//! Test modules for the executor crate.


use quarry_compiler::Query;
use quarry_core::Value;
use quarry_engine::{ConnectOptions, Database};

use crate::{Command, Output, Session};

/// Create a test session over a fresh in-memory SQLite database with a
/// seeded `people` table.
pub(crate) fn create_test_session() -> Session {
    let db = Database::open(ConnectOptions::sqlite(":memory:")).unwrap();
    let mut session = Session::new(db);
    session
        .execute(Command::Create {
            table: "people".into(),
            columns: v(serde_json::json!({
                "id": ["INTEGER", "PRIMARY KEY"],
                "name": "TEXT",
                "age": "INTEGER"
            })),
            options: None,
        })
        .unwrap();
    session
        .execute(Command::Insert {
            table: "people".into(),
            rows: v(serde_json::json!([
                {"name": "ann", "age": 31},
                {"name": "bob", "age": 17}
            ])),
        })
        .unwrap();
    session
}

pub(crate) fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

pub(crate) fn count_people(session: &mut Session) -> i64 {
    match session.execute(Command::Aggregate {
        function: quarry_compiler::Aggregate::Count,
        query: Query::table("people"),
    }) {
        Ok(Output::Maybe(Some(value))) => value.to_i64().unwrap(),
        other => panic!("unexpected {other:?}"),
    }
}
