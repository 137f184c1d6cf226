//! Several connections, one registry.

use std::time::Duration;

use quarry::{connect, ConnectOptions, Query, Registry};

use crate::common::{blog, file_options, v};

#[tokio::test]
async fn test_memory_databases_are_private() {
    let a = blog().await;
    let b = connect(ConnectOptions::sqlite(":memory:")).await.unwrap();

    assert!(matches!(
        b.count(Query::table("post")).await,
        Err(quarry::Error::Engine { .. })
    ));
    assert_eq!(a.count(Query::table("post")).await.unwrap(), 3);

    a.close().await.unwrap();
    b.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registry_shares_file_connection() {
    let dir = tempfile::TempDir::new().unwrap();
    let registry = Registry::with_idle_timeout(Duration::from_secs(60));

    let conn = registry
        .get_or_connect(file_options(&dir, "shared.db"))
        .await
        .unwrap();
    conn.create("hit", v(serde_json::json!({"n": "INTEGER"})), None)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for n in 0..8 {
        let registry_options = file_options(&dir, "shared.db");
        let conn = registry.get_or_connect(registry_options).await.unwrap();
        tasks.push(tokio::spawn(async move {
            conn.insert("hit", v(serde_json::json!({"n": n}))).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(registry.len().await, 1);
    assert_eq!(conn.count(Query::table("hit")).await.unwrap(), 8);
    assert_eq!(registry.evict_idle().await.unwrap(), 0);

    registry.close_all().await.unwrap();
    assert!(!conn.is_alive());
}
