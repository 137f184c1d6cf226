//! Read statements: select, get, rand, exists, aggregates, joins, clauses.

use quarry_core::{Dialect, Map, QuarryError, Raw, ScalarKind, Value};
use serde_json::json;

use super::{assert_param, sqlite, v};
use crate::{Aggregate, Compiler, Query};

// =============================================================================
// Projection
// =============================================================================

#[test]
fn test_select_columns_with_comparison() {
    let query = Query::table("users")
        .columns(json!(["id", "name"]))
        .filter(json!({"age[>]": 18}));
    let compiled = sqlite().select(&query).unwrap();

    assert_eq!(compiled.sql, "SELECT \"id\",\"name\" FROM \"users\" WHERE \"age\" > :p0");
    assert_eq!(compiled.params.len(), 1);
    assert_param(&compiled, ":p0", 18, ScalarKind::Int);
}

#[test]
fn test_table_star_string_spec() {
    let query = Query::table("post").columns("post.*");
    let compiled = sqlite().select(&query).unwrap();
    assert_eq!(compiled.sql, "SELECT \"post\".* FROM \"post\"");

    let projector = crate::Projector::new(&query.column_spec()).unwrap();
    assert!(projector.is_passthrough());
}

#[test]
fn test_select_star_by_default() {
    let compiled = sqlite().select(&Query::table("users")).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM \"users\"");
    assert!(compiled.params.is_empty());
}

#[test]
fn test_select_is_deterministic() {
    let query = Query::table("users")
        .columns(json!(["id"]))
        .filter(json!({"name": "ann", "age[<>]": [1, 9]}));
    let c = sqlite();
    assert_eq!(c.select(&query).unwrap(), c.select(&query).unwrap());
}

#[test]
fn test_alias_and_type_suffix() {
    let compiled = sqlite()
        .select(&Query::table("users").columns(json!(["id (uid) [Int]", "name"])))
        .unwrap();
    assert_eq!(compiled.sql, "SELECT \"id\" AS \"uid\",\"name\" FROM \"users\"");
}

#[test]
fn test_distinct_moves_to_front() {
    let compiled = sqlite()
        .select(&Query::table("users").columns(json!(["id", "@city", "@name"])))
        .unwrap();
    assert_eq!(compiled.sql, "SELECT DISTINCT \"city\",\"id\",\"name\" FROM \"users\"");
}

#[test]
fn test_grouped_projection_selects_index() {
    let compiled = sqlite()
        .select(&Query::table("users").columns(json!({"user_id": ["name", "email"]})))
        .unwrap();
    assert_eq!(compiled.sql, "SELECT \"user_id\",\"name\",\"email\" FROM \"users\"");
}

#[test]
fn test_raw_column_gets_alias() {
    let columns = Map::new()
        .with("id", Value::from("id"))
        .with("total", Value::raw("COUNT(<id>)"));
    let result = sqlite().select(&Query::table("users").columns(Value::Object(columns)));
    assert!(matches!(result, Err(QuarryError::Compile { .. })), "got {:?}", result);

    let columns = Map::new().with("total [Int]", Value::raw("COUNT(<id>)"));
    let compiled = sqlite()
        .select(&Query::table("users").columns(Value::Object(columns)))
        .unwrap();
    assert_eq!(compiled.sql, "SELECT COUNT(\"id\") AS \"total\" FROM \"users\"");
}

#[test]
fn test_prefix_applies_to_tables_and_qualified_columns() {
    let c = Compiler::new(Dialect::Sqlite).with_prefix("pre_");
    let compiled = c.select(&Query::table("t").columns(json!(["t.id", "name"]))).unwrap();
    assert_eq!(compiled.sql, "SELECT \"pre_t\".\"id\",\"name\" FROM \"pre_t\"");
}

#[test]
fn test_invalid_identifiers_are_rejected() {
    let c = sqlite();
    let result = c.select(&Query::table("users; DROP"));
    assert!(matches!(result, Err(QuarryError::Validation { .. })), "got {:?}", result);

    let result = c.select(&Query::table("users").columns(json!(["id; --"])));
    assert!(matches!(result, Err(QuarryError::Validation { .. })), "got {:?}", result);
}

// =============================================================================
// Joins
// =============================================================================

#[test]
fn test_left_join_on_map() {
    let query = Query::table("post (p)")
        .join(json!({"[>]account": {"author_id": "user_id"}}))
        .columns(json!(["p.title", "account.name"]));
    let compiled = sqlite().select(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT \"p\".\"title\",\"account\".\"name\" FROM \"post\" AS \"p\" \
         LEFT JOIN \"account\" ON \"p\".\"author_id\" = \"account\".\"user_id\""
    );
}

#[test]
fn test_join_kinds_and_using() {
    let query = Query::table("post")
        .join(json!({
            "[<]account (a)": "user_id",
            "[<>]album": ["user_id", "album_id"],
            "[><]photo": {"post.photo_id": "id"}
        }))
        .columns("*");
    let compiled = sqlite().select(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM \"post\" \
         RIGHT JOIN \"account\" AS \"a\" USING (\"user_id\") \
         FULL JOIN \"album\" USING (\"user_id\", \"album_id\") \
         INNER JOIN \"photo\" ON \"post\".\"photo_id\" = \"photo\".\"id\""
    );
}

#[test]
fn test_join_on_with_nested_condition() {
    let query = Query::table("post")
        .join(json!({"[>]account": {"author_id": "user_id", "AND": {"account.active": 1}}}))
        .columns(json!(["post.id"]));
    let compiled = sqlite().select(&query).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT \"post\".\"id\" FROM \"post\" LEFT JOIN \"account\" \
         ON \"post\".\"author_id\" = \"account\".\"user_id\" AND \"account\".\"active\" = :p0"
    );
    assert_param(&compiled, ":p0", 1, ScalarKind::Int);
}

#[test]
fn test_join_with_raw_relation() {
    let join = Map::new().with("[>]account", Value::raw("ON <account.id> = <post.author_id>"));
    let compiled = sqlite()
        .select(&Query::table("post").join(Value::Object(join)).columns(json!(["post.id"])))
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT \"post\".\"id\" FROM \"post\" LEFT JOIN \"account\" ON \"account\".\"id\" = \"post\".\"author_id\""
    );
}

#[test]
fn test_table_star_while_joining_is_rejected() {
    let query = Query::table("post")
        .join(json!({"[>]account": "user_id"}))
        .columns(json!(["account.*"]));
    let result = sqlite().select(&query);
    assert!(matches!(result, Err(QuarryError::Validation { .. })), "got {:?}", result);
}

#[test]
fn test_invalid_join_key_is_rejected() {
    let query = Query::table("post").join(json!({"[?]account": "user_id"}));
    let result = sqlite().select(&query);
    assert!(matches!(result, Err(QuarryError::Validation { .. })), "got {:?}", result);
}

// =============================================================================
// Variants
// =============================================================================

#[test]
fn test_get_adds_limit() {
    let query = Query::table("users").columns("name").filter(json!({"id": 3}));
    let compiled = sqlite().get(&query).unwrap();
    assert_eq!(compiled.sql, "SELECT \"name\" FROM \"users\" WHERE \"id\" = :p0 LIMIT 1");
}

#[test]
fn test_rand_orders_by_dialect_function() {
    let query = Query::table("users");
    assert_eq!(sqlite().rand(&query).unwrap().sql, "SELECT * FROM \"users\" ORDER BY RANDOM()");
    assert_eq!(
        Compiler::new(Dialect::MySql).rand(&query).unwrap().sql,
        "SELECT * FROM \"users\" ORDER BY RAND()"
    );
    assert_eq!(
        Compiler::new(Dialect::MsSql).rand(&query).unwrap().sql,
        "SELECT * FROM \"users\" ORDER BY NEWID()"
    );
}

#[test]
fn test_exists() {
    let query = Query::table("users").filter(json!({"id": 3}));
    assert_eq!(
        sqlite().exists(&query).unwrap().sql,
        "SELECT EXISTS(SELECT 1 FROM \"users\" WHERE \"id\" = :p0)"
    );
    assert_eq!(
        Compiler::new(Dialect::MsSql).exists(&query).unwrap().sql,
        "SELECT TOP 1 1 FROM \"users\" WHERE \"id\" = :p0"
    );
}

#[test]
fn test_aggregates() {
    let c = sqlite();
    assert_eq!(
        c.aggregate(Aggregate::Count, &Query::table("users")).unwrap().sql,
        "SELECT COUNT(*) FROM \"users\""
    );

    let query = Query::table("users").columns("score").filter(json!({"active": true}));
    let compiled = c.aggregate(Aggregate::Sum, &query).unwrap();
    assert_eq!(compiled.sql, "SELECT SUM(\"score\") FROM \"users\" WHERE \"active\" = :p0");
    assert_param(&compiled, ":p0", true, ScalarKind::Bool);

    for (function, name) in [(Aggregate::Avg, "AVG"), (Aggregate::Max, "MAX"), (Aggregate::Min, "MIN")] {
        let sql = c.aggregate(function, &Query::table("users").columns("age")).unwrap().sql;
        assert_eq!(sql, format!("SELECT {name}(\"age\") FROM \"users\""));
    }
}

#[test]
fn test_aggregate_tagged_select() {
    let query = Query::table("users")
        .columns("score")
        .filter(json!({"active": true}))
        .aggregate(Aggregate::Sum);
    let compiled = sqlite().select(&query).unwrap();
    assert_eq!(compiled.sql, "SELECT SUM(\"score\") FROM \"users\" WHERE \"active\" = :p0");
    assert_eq!(compiled, sqlite().aggregate(Aggregate::Sum, &query).unwrap());

    let untagged = sqlite().select(&Query::table("users").columns("score")).unwrap();
    assert_eq!(untagged.sql, "SELECT \"score\" FROM \"users\"");
}

// =============================================================================
// Clauses
// =============================================================================

#[test]
fn test_order_and_limit_offset() {
    let query = Query::table("t").filter(json!({"ORDER": {"id": "DESC"}, "LIMIT": [10, 5]}));
    assert_eq!(
        sqlite().select(&query).unwrap().sql,
        "SELECT * FROM \"t\" ORDER BY \"id\" DESC LIMIT 5 OFFSET 10"
    );
}

#[test]
fn test_fetch_paging_dialects() {
    let query = Query::table("t").filter(json!({"LIMIT": [10, 5]}));
    assert_eq!(
        Compiler::new(Dialect::MsSql).select(&query).unwrap().sql,
        "SELECT * FROM \"t\" ORDER BY (SELECT 0) OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );

    let query = Query::table("t").filter(json!({"ORDER": "id", "LIMIT": 5}));
    assert_eq!(
        Compiler::new(Dialect::Oracle).select(&query).unwrap().sql,
        "SELECT * FROM \"t\" ORDER BY \"id\" OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
    );
}

#[test]
fn test_order_field_list() {
    let query = Query::table("t").filter(json!({"ORDER": {"status": ["b", "a", 3]}}));
    assert_eq!(
        sqlite().select(&query).unwrap().sql,
        "SELECT * FROM \"t\" ORDER BY FIELD(\"status\", 'b','a',3)"
    );
}

#[test]
fn test_order_list_and_invalid_direction() {
    let query = Query::table("t").filter(json!({"ORDER": ["a", "b"]}));
    assert_eq!(sqlite().select(&query).unwrap().sql, "SELECT * FROM \"t\" ORDER BY \"a\",\"b\"");

    let query = Query::table("t").filter(json!({"ORDER": {"a": "SIDEWAYS"}}));
    let result = sqlite().select(&query);
    assert!(matches!(result, Err(QuarryError::Validation { .. })), "got {:?}", result);
}

#[test]
fn test_negative_limit_is_rejected() {
    let query = Query::table("t").filter(json!({"LIMIT": -1}));
    let result = sqlite().select(&query);
    assert!(matches!(result, Err(QuarryError::Compile { .. })), "got {:?}", result);
}

#[test]
fn test_group_and_having() {
    let query = Query::table("t")
        .columns(json!(["type"]))
        .filter(json!({"GROUP": "type", "HAVING": {"total[>]": 5}}));
    let compiled = sqlite().select(&query).unwrap();
    assert_eq!(compiled.sql, "SELECT \"type\" FROM \"t\" GROUP BY \"type\" HAVING \"total\" > :p0");
    assert_param(&compiled, ":p0", 5, ScalarKind::Int);
}

#[test]
fn test_match_is_mysql_only() {
    let filter = json!({
        "id[>]": 0,
        "MATCH": {"columns": ["title", "body"], "keyword": "rust", "mode": "boolean"}
    });
    let compiled = Compiler::new(Dialect::MySql)
        .select(&Query::table("post").filter(filter.clone()))
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM \"post\" WHERE \"id\" > :p0 AND MATCH (\"title\", \"body\") AGAINST (:p1 IN BOOLEAN MODE)"
    );
    assert_param(&compiled, ":p1", "rust", ScalarKind::String);

    let compiled = sqlite().select(&Query::table("post").filter(filter)).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM \"post\" WHERE \"id\" > :p0");
}

#[test]
fn test_raw_condition_tree() {
    let raw = Raw::new("WHERE <age> > :min").arg("min", 3);
    let compiled = sqlite().select(&Query::table("t").filter(Value::Raw(raw))).unwrap();
    assert_eq!(compiled.sql, "SELECT * FROM \"t\" WHERE \"age\" > :min");
    assert_param(&compiled, ":min", 3, ScalarKind::Int);
}

#[test]
fn test_scalar_condition_tree_is_rejected() {
    let result = sqlite().select(&Query::table("t").filter(v(json!(5))));
    assert!(matches!(result, Err(QuarryError::Compile { .. })), "got {:?}", result);
}
