//! Transactions across the proxy boundary.

use quarry::{Error, Query, Value};

use crate::common::{blog, v};

#[tokio::test]
async fn test_action_commit_rollback_and_error() {
    let conn = blog().await;

    conn.action(|tx| async move {
        tx.insert("post", v(serde_json::json!({"author_id": 2, "title": "encore", "score": 1.0})))
            .await?;
        Ok(Value::from(true))
    })
    .await
    .unwrap();
    assert_eq!(conn.count(Query::table("post")).await.unwrap(), 4);

    conn.action(|tx| async move {
        tx.delete("post", None).await?;
        Ok(Value::Bool(false))
    })
    .await
    .unwrap();
    assert_eq!(conn.count(Query::table("post")).await.unwrap(), 4);

    let err = conn
        .action(|tx| async move {
            tx.delete("post", None).await?;
            tx.insert("nowhere", v(serde_json::json!({"x": 1}))).await?;
            Ok(Value::Null)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Engine { .. }));
    assert_eq!(conn.count(Query::table("post")).await.unwrap(), 4);

    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_manual_transaction_state_errors() {
    let conn = blog().await;

    assert_eq!(conn.commit().await, Err(Error::TransactionNotActive));
    conn.begin().await.unwrap();
    assert_eq!(conn.begin().await, Err(Error::TransactionAlreadyActive));

    conn.delete("account", Some(v(serde_json::json!({"user_id": 2}))))
        .await
        .unwrap();
    conn.rollback().await.unwrap();
    assert_eq!(conn.count(Query::table("account")).await.unwrap(), 2);

    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_close_rolls_back_open_transaction() {
    let dir = tempfile::TempDir::new().unwrap();
    let options = crate::common::file_options(&dir, "tx.db");

    let conn = quarry::connect(options.clone()).await.unwrap();
    conn.create("t", v(serde_json::json!({"n": "INTEGER"})), None)
        .await
        .unwrap();
    conn.begin().await.unwrap();
    conn.insert("t", v(serde_json::json!({"n": 1}))).await.unwrap();
    conn.close().await.unwrap();

    let conn = quarry::connect(options).await.unwrap();
    assert_eq!(conn.count(Query::table("t")).await.unwrap(), 0);
    conn.close().await.unwrap();
}
