//! Bolt record translation.
//!
//! `neo4rs` rows expose typed per-column extraction but no column
//! listing, so callers pass the RETURN clause aliases alongside the
//! rows. Each column is tried as a node, a relationship, a list of
//! either, and finally generic JSON, in that order, so graph identity
//! survives wherever the driver preserves it.

use cymap_core::{GraphValue, MapError, NodeValue, Properties, RelationshipValue, ResultSet};
use neo4rs::{Node, Relation, Row};
use serde_json::Value as JsonValue;

/// Convert driver rows into a result set under the given column names.
pub fn rows_to_result_set(rows: &[Row], columns: &[&str]) -> Result<ResultSet, MapError> {
    let column_names = columns.iter().map(|c| c.to_string()).collect();
    let values = rows
        .iter()
        .map(|row| columns.iter().map(|c| column_value(row, c)).collect())
        .collect();
    ResultSet::new(column_names, values)
}

/// Extract one column from a row, preferring typed graph shapes.
///
/// A column the row does not carry, or a value the driver cannot
/// deserialize (unsupported Bolt structure), comes back as null rather
/// than failing the whole row; the mapping layer reports the mismatch
/// against the destination type instead.
pub fn column_value(row: &Row, name: &str) -> GraphValue {
    if let Ok(node) = row.get::<Node>(name) {
        return GraphValue::Node(node_value(&node));
    }
    if let Ok(rel) = row.get::<Relation>(name) {
        return GraphValue::Relationship(relationship_value(&rel));
    }
    if let Ok(nodes) = row.get::<Vec<Node>>(name) {
        return GraphValue::List(
            nodes
                .iter()
                .map(|n| GraphValue::Node(node_value(n)))
                .collect(),
        );
    }
    if let Ok(rels) = row.get::<Vec<Relation>>(name) {
        return GraphValue::List(
            rels.iter()
                .map(|r| GraphValue::Relationship(relationship_value(r)))
                .collect(),
        );
    }
    if let Ok(value) = row.get::<JsonValue>(name) {
        return GraphValue::from_json(value);
    }
    GraphValue::Null
}

/// Convert a driver node into the wire value model.
pub fn node_value(node: &Node) -> NodeValue {
    let properties = collect_properties(node.keys(), |key| node.get::<JsonValue>(key).ok());
    NodeValue::new(
        node.id(),
        node.labels().iter().map(|l| l.to_string()).collect(),
        properties,
    )
}

/// Convert a driver relationship into the wire value model.
pub fn relationship_value(rel: &Relation) -> RelationshipValue {
    let properties = collect_properties(rel.keys(), |key| rel.get::<JsonValue>(key).ok());
    RelationshipValue::new(
        rel.id(),
        rel.start_node_id(),
        rel.end_node_id(),
        rel.typ(),
        properties,
    )
}

fn collect_properties(
    keys: Vec<&str>,
    mut get: impl FnMut(&str) -> Option<JsonValue>,
) -> Properties {
    keys.into_iter()
        .map(|key| {
            let value = get(key)
                .map(GraphValue::from_json)
                .unwrap_or(GraphValue::Null);
            (key.to_string(), value)
        })
        .collect()
}
