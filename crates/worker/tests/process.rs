//! Process isolation: connections whose host is a `quarry-worker` child.

use std::path::PathBuf;
use std::time::Duration;

use quarry_compiler::Query;
use quarry_core::Value;
use quarry_engine::{ConnectOptions, Isolation};
use quarry_executor::Error;
use quarry_proxy::{Connection, ConnectionState, ProcessTransport, Shutdown, Transport};

fn worker() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_quarry-worker"))
}

fn process_options() -> ConnectOptions {
    ConnectOptions::sqlite(":memory:").isolation(Isolation::Process {
        worker: Some(worker()),
    })
}

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

#[tokio::test]
async fn test_round_trip_through_worker() {
    let conn = Connection::connect(process_options()).await.unwrap();
    assert_eq!(conn.state(), ConnectionState::Connected);

    conn.create(
        "item",
        v(serde_json::json!({"id": ["INTEGER", "PRIMARY KEY"], "label": "TEXT"})),
        None,
    )
    .await
    .unwrap();
    conn.insert(
        "item",
        v(serde_json::json!([{"label": "a"}, {"label": "b"}])),
    )
    .await
    .unwrap();

    assert_eq!(conn.count(Query::table("item")).await.unwrap(), 2);
    assert_eq!(
        conn.select(Query::table("item").columns("label")).await.unwrap(),
        v(serde_json::json!(["a", "b"]))
    );
    assert_eq!(conn.id(None).await.unwrap(), Some(Value::Int(2)));

    conn.close().await.unwrap();
    assert!(!conn.is_alive());
}

#[tokio::test]
async fn test_engine_error_from_worker() {
    let conn = Connection::connect(process_options()).await.unwrap();

    assert!(matches!(
        conn.select(Query::table("missing")).await,
        Err(Error::Engine { .. })
    ));
    assert!(conn.ping().await.is_ok());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_configuration_failure_from_worker() {
    let options = ConnectOptions::new(quarry_core::Dialect::PgSql).isolation(Isolation::Process {
        worker: Some(worker()),
    });
    assert!(matches!(
        Connection::connect(options).await,
        Err(Error::Validation { .. })
    ));
}

#[tokio::test]
async fn test_worker_exits_when_input_closes() {
    let mut transport = ProcessTransport::spawn(&worker()).unwrap();
    assert!(transport.is_alive());

    let outcome = transport.shutdown(Duration::from_secs(10)).await.unwrap();
    assert_eq!(outcome, Shutdown::Graceful);
    assert!(!transport.is_alive());
}
