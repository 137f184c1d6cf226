//! Result projection.
//!
//! Engines return flat rows keyed by column name. The [`Projector`] rebuilds
//! the shape the column spec asked for:
//!
//! | Spec | Result |
//! |------|--------|
//! | `"*"`, `"table.*"`, raw | rows unchanged |
//! | `"col [Int]"` | flat list of cast values |
//! | list / map | one object per row, nested maps become nested objects |
//! | `{"key": spec}` | object keyed by each row's `key` value |
//!
//! Declared types are applied per leaf. Nulls stay null, and raw leaves
//! declared `[Object]` or `[JSON]` are left out.

use quarry_core::{Map, QuarryResult, Value};

use crate::columns::{strip_qualifier, ColumnItem, ColumnType};
use crate::encode;

#[derive(Debug, Clone, PartialEq)]
struct Leaf {
    key: String,
    ty: Option<ColumnType>,
    raw: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(Leaf),
    Group { name: String, children: Vec<Node> },
    Star,
}

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    All,
    Single(Leaf),
    Rows(Vec<Node>),
    Grouped { index: String, children: Vec<Node> },
}

/// Maps flat rows back into the shape of a column spec.
#[derive(Debug, Clone, PartialEq)]
pub struct Projector {
    shape: Shape,
}

impl Projector {
    /// Derive the projection for a column spec.
    pub fn new(columns: &Value) -> QuarryResult<Self> {
        let shape = match columns {
            Value::String(s) if s == "*" || s.ends_with(".*") => Shape::All,
            Value::String(s) => {
                let item = ColumnItem::parse(s)?;
                Shape::Single(Leaf {
                    key: item.result_key().to_string(),
                    ty: item.ty,
                    raw: false,
                })
            }
            Value::Array(_) => Shape::Rows(nodes(columns)?),
            Value::Object(map) => match map.first() {
                Some((key, spec)) if map.len() == 1 && spec.is_container() => Shape::Grouped {
                    index: strip_qualifier(key).to_string(),
                    children: nodes(spec)?,
                },
                _ => Shape::Rows(nodes(columns)?),
            },
            _ => Shape::All,
        };
        Ok(Self { shape })
    }

    /// True when rows pass through untouched.
    pub fn is_passthrough(&self) -> bool {
        matches!(self.shape, Shape::All)
    }

    /// Project every row of a `select`.
    pub fn project_rows(&self, rows: Vec<Map>) -> Value {
        match &self.shape {
            Shape::All => Value::Array(rows.into_iter().map(Value::Object).collect()),
            Shape::Single(leaf) => Value::Array(
                rows.iter()
                    .map(|row| cast(leaf, row.get(&leaf.key).cloned().unwrap_or(Value::Null)).unwrap_or(Value::Null))
                    .collect(),
            ),
            Shape::Rows(nodes) => Value::Array(rows.iter().map(|row| Value::Object(walk(nodes, row))).collect()),
            Shape::Grouped { index, children } => {
                let mut grouped = Map::new();
                for row in &rows {
                    let key = row.get(index).map(Value::to_text).unwrap_or_default();
                    grouped.insert(key, walk(children, row));
                }
                Value::Object(grouped)
            }
        }
    }

    /// Project the single row of a `get`; no row projects to null.
    pub fn project_row(&self, row: Option<Map>) -> Value {
        let Some(row) = row else {
            return Value::Null;
        };
        match &self.shape {
            Shape::All => Value::Object(row),
            Shape::Single(leaf) => cast(leaf, row.get(&leaf.key).cloned().unwrap_or(Value::Null)).unwrap_or(Value::Null),
            Shape::Rows(nodes) => Value::Object(walk(nodes, &row)),
            Shape::Grouped { children, .. } => Value::Object(walk(children, &row)),
        }
    }
}

fn nodes(spec: &Value) -> QuarryResult<Vec<Node>> {
    let mut out = Vec::new();
    match spec {
        Value::String(s) if s.contains('*') => out.push(Node::Star),
        Value::String(s) => {
            let item = ColumnItem::parse(s)?;
            out.push(Node::Leaf(Leaf {
                key: item.result_key().to_string(),
                ty: item.ty,
                raw: false,
            }));
        }
        Value::Array(items) => {
            for item in items {
                out.extend(nodes(item)?);
            }
        }
        Value::Object(map) => {
            for (key, value) in map.iter() {
                match value {
                    Value::Raw(_) => {
                        let item = ColumnItem::parse_key(key)?;
                        out.push(Node::Leaf(Leaf {
                            key: strip_qualifier(&item.column).to_string(),
                            ty: item.ty,
                            raw: true,
                        }));
                    }
                    Value::Array(_) | Value::Object(_) => out.push(Node::Group {
                        name: key.to_string(),
                        children: nodes(value)?,
                    }),
                    _ => {}
                }
            }
        }
        _ => {}
    }
    Ok(out)
}

fn walk(nodes: &[Node], row: &Map) -> Map {
    let mut out = Map::new();
    for node in nodes {
        match node {
            Node::Leaf(leaf) => {
                let item = row.get(&leaf.key).cloned().unwrap_or(Value::Null);
                if let Some(value) = cast(leaf, item) {
                    out.insert(leaf.key.clone(), value);
                }
            }
            Node::Group { name, children } => {
                out.insert(name.clone(), walk(children, row));
            }
            Node::Star => {
                for (key, value) in row.iter() {
                    if !out.contains_key(key) {
                        out.insert(key, value.clone());
                    }
                }
            }
        }
    }
    out
}

/// Apply the declared type. `None` drops the leaf.
fn cast(leaf: &Leaf, item: Value) -> Option<Value> {
    let Some(ty) = leaf.ty else {
        return Some(item);
    };
    if leaf.raw && matches!(ty, ColumnType::Object | ColumnType::Json) {
        return None;
    }
    if item.is_null() {
        return Some(Value::Null);
    }
    Some(match ty {
        ColumnType::String => item,
        ColumnType::Number => Value::Float(item.to_f64().unwrap_or(0.0)),
        ColumnType::Int => Value::Int(
            item.to_i64()
                .or_else(|| item.to_f64().map(|f| f.trunc() as i64))
                .unwrap_or(0),
        ),
        ColumnType::Bool => Value::Bool(item.is_truthy()),
        ColumnType::Object => encode::from_structured(&item.to_text()).unwrap_or(Value::Null),
        ColumnType::Json => encode::from_json(&item.to_text()).unwrap_or(Value::Null),
    })
}
