//! Registry tests: reuse by fingerprint and idle eviction.

use std::time::Duration;

use quarry_compiler::Query;
use quarry_engine::ConnectOptions;

use super::{v, ScriptedTransport};
use crate::{Connection, Registry};

#[tokio::test]
async fn test_same_options_share_a_connection() {
    let registry = Registry::new();

    let a = registry
        .get_or_connect(ConnectOptions::sqlite(":memory:"))
        .await
        .unwrap();
    let b = registry
        .get_or_connect(ConnectOptions::sqlite(":memory:"))
        .await
        .unwrap();
    assert_eq!(registry.len().await, 1);

    a.create("t", v(serde_json::json!({"id": "INTEGER"})), None)
        .await
        .unwrap();
    a.insert("t", v(serde_json::json!({"id": 1}))).await.unwrap();
    assert_eq!(b.count(Query::table("t")).await.unwrap(), 1);

    registry.close_all().await.unwrap();
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_different_options_get_different_connections() {
    let registry = Registry::new();

    registry
        .get_or_connect(ConnectOptions::sqlite(":memory:"))
        .await
        .unwrap();
    registry
        .get_or_connect(ConnectOptions::sqlite(":memory:").prefix("app_"))
        .await
        .unwrap();
    assert_eq!(registry.len().await, 2);

    assert_ne!(
        Registry::fingerprint(&ConnectOptions::sqlite(":memory:")).unwrap(),
        Registry::fingerprint(&ConnectOptions::sqlite(":memory:").prefix("app_")).unwrap()
    );
    registry.close_all().await.unwrap();
}

#[tokio::test]
async fn test_closed_connection_is_replaced() {
    let registry = Registry::new();

    let first = registry
        .get_or_connect(ConnectOptions::sqlite(":memory:"))
        .await
        .unwrap();
    first.close().await.unwrap();

    let second = registry
        .get_or_connect(ConnectOptions::sqlite(":memory:"))
        .await
        .unwrap();
    assert!(second.is_alive());
    assert_eq!(registry.len().await, 1);
    registry.close_all().await.unwrap();
}

#[tokio::test]
async fn test_evict_idle() {
    let registry = Registry::with_idle_timeout(Duration::from_millis(10));
    let conn = registry
        .get_or_connect(ConnectOptions::sqlite(":memory:"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(registry.evict_idle().await.unwrap(), 1);
    assert!(registry.is_empty().await);
    assert!(!conn.is_alive());

    assert_eq!(Registry::new().evict_idle().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_close_does_not_block_replacement() {
    let registry = Registry::new();
    let options = ConnectOptions::sqlite(":memory:");
    let key = Registry::fingerprint(&options).unwrap();

    let (transport, alive) = ScriptedTransport::broken_shutdown();
    let stale = Connection::connect_with(options.clone(), Box::new(transport))
        .await
        .unwrap();
    alive.store(false, std::sync::atomic::Ordering::SeqCst);
    registry.connections.lock().await.insert(key, stale);

    let fresh = registry.get_or_connect(options).await.unwrap();
    assert!(fresh.is_alive());
    assert_eq!(registry.len().await, 1);
    registry.close_all().await.unwrap();
}

#[tokio::test]
async fn test_failed_close_still_evicts() {
    let registry = Registry::with_idle_timeout(Duration::from_millis(10));
    let (transport, _alive) = ScriptedTransport::broken_shutdown();
    let broken = Connection::connect_with(ConnectOptions::sqlite(":memory:"), Box::new(transport))
        .await
        .unwrap();
    registry.connections.lock().await.insert(0, broken);
    registry
        .get_or_connect(ConnectOptions::sqlite(":memory:"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(registry.evict_idle().await.unwrap(), 2);
    assert!(registry.is_empty().await);
}
