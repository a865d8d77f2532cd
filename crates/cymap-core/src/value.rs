//! Wire value model shared by the protocol translation layers.
//!
//! Both the REST envelope parser and the Bolt row translator normalize
//! their results into [`GraphValue`] trees before any target-type
//! mapping happens, so the structural deserializer only ever sees one
//! representation.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

/// Property map attached to nodes, relationships and plain map values.
///
/// BTreeMap keeps property iteration deterministic across runs.
pub type Properties = BTreeMap<String, GraphValue>;

/// A single value inside a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<GraphValue>),
    Map(Properties),
    Node(NodeValue),
    Relationship(RelationshipValue),
}

/// A node-shaped wire value: identifier, labels and a property map.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeValue {
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: Properties,
}

/// A relationship-shaped wire value: identifier, endpoint node ids,
/// relationship type and a property map.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipValue {
    pub id: i64,
    pub start: i64,
    pub end: i64,
    pub rel_type: String,
    pub properties: Properties,
}

impl GraphValue {
    /// Human-readable kind name, used in structural mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            GraphValue::Null => "null",
            GraphValue::Bool(_) => "boolean",
            GraphValue::Int(_) => "integer",
            GraphValue::Float(_) => "float",
            GraphValue::String(_) => "string",
            GraphValue::List(_) => "list",
            GraphValue::Map(_) => "map",
            GraphValue::Node(_) => "node",
            GraphValue::Relationship(_) => "relationship",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, GraphValue::Null)
    }

    /// Whether the value can serve a struct/map target directly.
    pub fn is_map_like(&self) -> bool {
        matches!(
            self,
            GraphValue::Map(_) | GraphValue::Node(_) | GraphValue::Relationship(_)
        )
    }

    /// Convert a plain JSON value without any node/relationship
    /// promotion. Objects become maps; the REST layer runs its shape
    /// detection before falling back to this.
    pub fn from_json(value: JsonValue) -> GraphValue {
        match value {
            JsonValue::Null => GraphValue::Null,
            JsonValue::Bool(b) => GraphValue::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    GraphValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    // u64 beyond i64::MAX, or a true float
                    GraphValue::Float(f)
                } else {
                    GraphValue::Null
                }
            }
            JsonValue::String(s) => GraphValue::String(s),
            JsonValue::Array(items) => {
                GraphValue::List(items.into_iter().map(GraphValue::from_json).collect())
            }
            JsonValue::Object(fields) => GraphValue::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, GraphValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<JsonValue> for GraphValue {
    fn from(value: JsonValue) -> Self {
        GraphValue::from_json(value)
    }
}

impl NodeValue {
    pub fn new(id: i64, labels: Vec<String>, properties: Properties) -> Self {
        Self {
            id,
            labels,
            properties,
        }
    }
}

impl RelationshipValue {
    pub fn new(
        id: i64,
        start: i64,
        end: i64,
        rel_type: impl Into<String>,
        properties: Properties,
    ) -> Self {
        Self {
            id,
            start,
            end,
            rel_type: rel_type.into(),
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(GraphValue::from_json(json!(null)), GraphValue::Null);
        assert_eq!(GraphValue::from_json(json!(true)), GraphValue::Bool(true));
        assert_eq!(GraphValue::from_json(json!(42)), GraphValue::Int(42));
        assert_eq!(GraphValue::from_json(json!(1.5)), GraphValue::Float(1.5));
        assert_eq!(
            GraphValue::from_json(json!("hi")),
            GraphValue::String("hi".to_string())
        );
    }

    #[test]
    fn test_from_json_u64_overflow_becomes_float() {
        let big = u64::MAX;
        match GraphValue::from_json(json!(big)) {
            GraphValue::Float(f) => assert!(f > i64::MAX as f64),
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_nested() {
        let value = GraphValue::from_json(json!({"a": [1, 2], "b": {"c": "x"}}));
        match value {
            GraphValue::Map(m) => {
                assert_eq!(
                    m["a"],
                    GraphValue::List(vec![GraphValue::Int(1), GraphValue::Int(2)])
                );
                match &m["b"] {
                    GraphValue::Map(inner) => {
                        assert_eq!(inner["c"], GraphValue::String("x".to_string()))
                    }
                    other => panic!("expected map, got {:?}", other),
                }
            }
            other => panic!("expected map, got {:?}", other),
        }
    }
}
