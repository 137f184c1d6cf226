//! Compiler, engine and projector together, through a live connection.

use quarry::{raw, Map, Query, Value};

use crate::common::{blog, v};

#[tokio::test]
async fn test_join_with_typed_projection() {
    let conn = blog().await;

    let rows = conn
        .select(
            Query::table("post")
                .join(v(serde_json::json!({"[>]account": {"author_id": "user_id"}})))
                .columns(v(serde_json::json!([
                    "post.title",
                    "account.name (author)",
                    "post.score [Int]",
                    "account.profile [JSON]"
                ])))
                .filter(v(serde_json::json!({"post.score[>=]": 4, "ORDER": "post.id"}))),
        )
        .await
        .unwrap();

    assert_eq!(
        rows,
        v(serde_json::json!([
            {"title": "hello", "author": "ann", "score": 4, "profile": {"lang": "en"}},
            {"title": "bonjour", "author": "bob", "score": 5, "profile": {"lang": "fr"}}
        ]))
    );
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_grouped_projection() {
    let conn = blog().await;

    let grouped = conn
        .select(Query::table("account").columns(v(serde_json::json!({"user_id": ["name"]}))))
        .await
        .unwrap();
    assert_eq!(
        grouped,
        v(serde_json::json!({"1": {"name": "ann"}, "2": {"name": "bob"}}))
    );
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_conditions_and_aggregates() {
    let conn = blog().await;

    let titles = conn
        .select(
            Query::table("post")
                .columns("title")
                .filter(v(serde_json::json!({
                    "OR": {"title[~]": "bon", "score[<]": 3.5},
                    "ORDER": {"id": "DESC"}
                }))),
        )
        .await
        .unwrap();
    assert_eq!(titles, v(serde_json::json!(["bonjour", "again"])));

    assert_eq!(conn.count(Query::table("post")).await.unwrap(), 3);
    assert_eq!(
        conn.min(Query::table("post").columns("score")).await.unwrap(),
        Some(Value::Float(3.0))
    );
    assert!(!conn
        .has(Query::table("post").filter(v(serde_json::json!({"author_id": 9}))))
        .await
        .unwrap());

    let shuffled = conn.rand(Query::table("post").columns("id")).await.unwrap();
    assert_eq!(shuffled.as_array().map(|ids| ids.len()), Some(3));
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_replace_and_raw_fragments() {
    let conn = blog().await;

    let meta = conn
        .replace(
            "post",
            Map::new().with("title", v(serde_json::json!({"hello": "hi"}))),
            None,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(meta.affected_rows, 3);
    assert_eq!(
        conn.get(Query::table("post").columns("title").filter(v(serde_json::json!({"id": 1}))))
            .await
            .unwrap(),
        Value::from("hi")
    );

    let meta = conn
        .query(raw("SELECT <post.title> FROM <post> WHERE <post.author_id> = :who").arg("who", 2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(meta.rows.len(), 1);
    assert_eq!(meta.rows[0].get("title"), Some(&Value::from("bonjour")));

    // Raw values inside descriptors.
    let meta = conn
        .update(
            "post",
            Map::new().with("score", Value::raw("<score> * 2")),
            Some(v(serde_json::json!({"author_id": 2}))),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(meta.affected_rows, 1);
    assert_eq!(
        conn.max(Query::table("post").columns("score")).await.unwrap(),
        Some(Value::Float(10.0))
    );
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_invalid_descriptors_fail_before_execution() {
    let conn = blog().await;

    assert!(matches!(
        conn.select(Query::table("post; DROP TABLE post")).await,
        Err(quarry::Error::Validation { .. })
    ));
    assert!(matches!(
        conn.delete("post", Some(v(serde_json::json!({"id": []})))).await,
        Err(quarry::Error::Compile { .. })
    ));
    assert_eq!(conn.count(Query::table("post")).await.unwrap(), 3);
    conn.close().await.unwrap();
}
