//! Property tests: quoting round-trips, placeholder accounting.

use std::collections::BTreeSet;

use proptest::prelude::*;
use quarry_core::{Dialect, Map, Value};
use regex::Regex;

use crate::{Compiler, Query};

fn identifier() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_@$#-]{0,15}"
}

fn dialect() -> impl Strategy<Value = Dialect> {
    prop_oneof![
        Just(Dialect::MySql),
        Just(Dialect::PgSql),
        Just(Dialect::Sqlite),
        Just(Dialect::MsSql),
        Just(Dialect::Oracle),
        Just(Dialect::Sybase),
    ]
}

/// A condition leaf and the number of placeholders it should consume.
fn leaf() -> impl Strategy<Value = (String, Value, usize)> {
    prop_oneof![
        any::<i64>().prop_map(|i| (String::new(), Value::Int(i), 1)),
        "[a-z]{0,8}".prop_map(|s| (String::new(), Value::String(s), 1)),
        Just((String::new(), Value::Null, 0)),
        prop::collection::vec(any::<i32>(), 1..6)
            .prop_map(|items| {
                let n = items.len();
                (String::new(), Value::Array(items.into_iter().map(Value::from).collect()), n)
            }),
        (any::<i32>(), any::<i32>())
            .prop_map(|(a, b)| ("[<>]".to_string(), Value::Array(vec![a.into(), b.into()]), 2)),
        "[a-z]{1,8}".prop_map(|s| ("[~]".to_string(), Value::String(s), 1)),
    ]
}

proptest! {
    #[test]
    fn prop_table_quoting_round_trips(name in identifier(), prefix in "[a-z_]{0,4}", d in dialect()) {
        let c = Compiler::new(d).with_prefix(prefix);
        let quoted = c.quote_table(&name).unwrap();
        prop_assert_eq!(c.quote_table(&name).unwrap(), quoted.clone());
        prop_assert_eq!(c.unquote_table(&quoted), Some(name));
    }

    #[test]
    fn prop_column_quoting_round_trips(table in identifier(), column in identifier()) {
        let c = Compiler::new(Dialect::Sqlite).with_prefix("x_");
        let dotted = format!("{table}.{column}");
        prop_assert_eq!(c.unquote_column(&c.quote_column(&dotted).unwrap()), Some(dotted));
        prop_assert_eq!(c.unquote_column(&c.quote_column(&column).unwrap()), Some(column));
    }

    #[test]
    fn prop_placeholders_equal_scalar_leaves(leaves in prop::collection::vec(leaf(), 1..8)) {
        let mut tree = Map::new();
        let mut expected = 0;
        for (i, (op, value, count)) in leaves.into_iter().enumerate() {
            tree.insert(format!("c{i}{op}"), value);
            expected += count;
        }
        let query = Query::table("t").filter(Value::Object(tree));
        let compiled = Compiler::new(Dialect::Sqlite).select(&query).unwrap();
        prop_assert_eq!(compiled.params.len(), expected);
        let placeholder = Regex::new(r":p\d+\b").unwrap();
        let found: BTreeSet<&str> = placeholder.find_iter(&compiled.sql).map(|m| m.as_str()).collect();
        let wanted: BTreeSet<String> = (0..expected).map(|n| format!(":p{n}")).collect();
        prop_assert_eq!(
            found.into_iter().map(str::to_string).collect::<BTreeSet<_>>(),
            wanted,
            "placeholders in {}",
            compiled.sql
        );
    }
}
