//! File-backed databases and `quarry.toml` configuration.

use quarry::{connect, ConnectOptions, Query, CONFIG_FILE_NAME};
use tempfile::TempDir;

use crate::common::{file_options, v};

#[tokio::test]
async fn test_data_survives_reconnect() {
    let dir = TempDir::new().unwrap();

    let conn = connect(file_options(&dir, "app.db")).await.unwrap();
    conn.create("note", v(serde_json::json!({"body": "TEXT"})), None)
        .await
        .unwrap();
    conn.insert("note", v(serde_json::json!({"body": "kept"})))
        .await
        .unwrap();
    conn.close().await.unwrap();

    let conn = connect(file_options(&dir, "app.db")).await.unwrap();
    assert_eq!(
        conn.get(Query::table("note").columns("body")).await.unwrap(),
        quarry::Value::from("kept")
    );
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_connect_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    let db_path = dir.path().join("configured.db");

    std::fs::write(
        &path,
        format!(
            "engine = \"sqlite\"\n\
             database = \"{}\"\n\
             prefix = \"app_\"\n\
             logging = true\n\
             commands = [\"CREATE TABLE IF NOT EXISTS app_seen (n INTEGER)\"]\n",
            db_path.display()
        ),
    )
    .unwrap();

    let options = ConnectOptions::from_file(&path).unwrap();
    let conn = connect(options).await.unwrap();

    conn.insert("seen", v(serde_json::json!({"n": 1}))).await.unwrap();
    conn.insert("seen", v(serde_json::json!({"n": 2}))).await.unwrap();
    assert_eq!(conn.count(Query::table("seen")).await.unwrap(), 2);

    // Logging keeps every statement, rendered with the table prefix.
    let log = conn.log().await.unwrap();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0], "INSERT INTO \"app_seen\" (\"n\") VALUES (1)");
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_default_config_connects() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    ConnectOptions::write_default_if_missing(&path).unwrap();
    let options = ConnectOptions::from_file(&path).unwrap();
    assert_eq!(options, ConnectOptions::sqlite(":memory:"));

    let conn = connect(options).await.unwrap();
    assert!(conn.ping().await.is_ok());
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_engine_aliases_in_config() {
    let options = ConnectOptions::from_toml("engine = \"postgres\"\ndatabase = \"app\"\n").unwrap();
    assert_eq!(options.engine, quarry::Dialect::PgSql);

    // Only SQLite ships a bundled session.
    assert!(matches!(
        connect(options).await,
        Err(quarry::Error::Validation { .. })
    ));
}
