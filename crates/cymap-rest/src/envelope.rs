//! Result envelope parsing for the two historical REST formats.
//!
//! The classic cypher endpoint returns `{"columns": [...], "data":
//! [[...]]}` with fully hyperlinked node/relationship objects; the
//! transactional endpoint returns `{"results": [...], "errors": [...]}`
//! with bare property maps plus per-value `meta` entries. Both decode
//! to the same [`ResultSet`] representation.

use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use thiserror::Error;

use cymap_core::{GraphValue, MapError, NodeValue, Properties, RelationshipValue, ResultSet};

/// Errors from REST envelope decoding.
#[derive(Error, Debug)]
pub enum RestError {
    #[error("server error {code}: {message}")]
    Server { code: String, message: String },

    #[error("malformed result envelope: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Map(#[from] MapError),
}

#[derive(Deserialize)]
struct ClassicEnvelope {
    columns: Vec<String>,
    data: Vec<Vec<JsonValue>>,
}

#[derive(Deserialize)]
struct TxEnvelope {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    columns: Vec<String>,
    data: Vec<TxRow>,
}

#[derive(Deserialize)]
struct TxRow {
    row: Vec<JsonValue>,
    #[serde(default)]
    meta: Vec<JsonValue>,
}

#[derive(Deserialize, Debug)]
struct TxError {
    code: String,
    message: String,
}

/// Decode a classic cypher endpoint envelope.
pub fn parse_classic(body: JsonValue) -> Result<ResultSet, RestError> {
    let envelope: ClassicEnvelope = serde_json::from_value(body)?;
    let rows = envelope
        .data
        .into_iter()
        .map(|row| row.into_iter().map(promote).collect())
        .collect();
    Ok(ResultSet::new(envelope.columns, rows)?)
}

/// Decode a transactional endpoint envelope, one [`ResultSet`] per
/// submitted statement. Server-reported errors win over any partial
/// results.
pub fn parse_transactional(body: JsonValue) -> Result<Vec<ResultSet>, RestError> {
    let envelope: TxEnvelope = serde_json::from_value(body)?;
    if let Some(error) = envelope.errors.into_iter().next() {
        return Err(RestError::Server {
            code: error.code,
            message: error.message,
        });
    }
    envelope
        .results
        .into_iter()
        .map(|result| {
            let rows = result
                .data
                .into_iter()
                .map(|TxRow { row, meta }| {
                    row.into_iter()
                        .enumerate()
                        .map(|(i, value)| promote_with_meta(value, meta.get(i)))
                        .collect()
                })
                .collect();
            Ok(ResultSet::new(result.columns, rows)?)
        })
        .collect()
}

/// Convert a JSON value, promoting anything that structurally resembles
/// a node or relationship regardless of how the caller will consume it.
fn promote(value: JsonValue) -> GraphValue {
    match value {
        JsonValue::Object(fields) => {
            if let Some(node) = try_node(&fields) {
                GraphValue::Node(node)
            } else if let Some(rel) = try_relationship(&fields) {
                GraphValue::Relationship(rel)
            } else {
                GraphValue::Map(
                    fields
                        .into_iter()
                        .map(|(k, v)| (k, promote(v)))
                        .collect(),
                )
            }
        }
        JsonValue::Array(items) => GraphValue::List(items.into_iter().map(promote).collect()),
        other => GraphValue::from_json(other),
    }
}

/// Transactional rows carry bare property maps; the aligned `meta`
/// entry recovers node identity. Relationship meta lacks type and
/// endpoints in row format, so those stay plain maps.
fn promote_with_meta(value: JsonValue, meta: Option<&JsonValue>) -> GraphValue {
    if let Some(JsonValue::Object(m)) = meta {
        let id = m.get("id").and_then(JsonValue::as_i64);
        let kind = m.get("type").and_then(JsonValue::as_str);
        if let (Some(id), Some("node"), JsonValue::Object(props)) = (id, kind, &value) {
            return GraphValue::Node(NodeValue::new(id, Vec::new(), promote_object(props)));
        }
    }
    promote(value)
}

fn promote_object(fields: &JsonMap<String, JsonValue>) -> Properties {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), promote(v.clone())))
        .collect()
}

fn try_node(fields: &JsonMap<String, JsonValue>) -> Option<NodeValue> {
    let self_uri = fields.get("self")?.as_str()?;
    if !self_uri.contains("/node/") {
        return None;
    }
    let data = fields.get("data")?.as_object()?;
    let id = metadata_id(fields).or_else(|| uri_tail_id(self_uri))?;
    let labels = fields
        .get("metadata")
        .and_then(|m| m.get("labels"))
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some(NodeValue::new(id, labels, promote_object(data)))
}

fn try_relationship(fields: &JsonMap<String, JsonValue>) -> Option<RelationshipValue> {
    let self_uri = fields.get("self")?.as_str()?;
    if !self_uri.contains("/relationship/") {
        return None;
    }
    let rel_type = fields.get("type")?.as_str()?;
    let start = uri_tail_id(fields.get("start")?.as_str()?)?;
    let end = uri_tail_id(fields.get("end")?.as_str()?)?;
    let id = metadata_id(fields).or_else(|| uri_tail_id(self_uri))?;
    let properties = fields
        .get("data")
        .and_then(JsonValue::as_object)
        .map(promote_object)
        .unwrap_or_default();
    Some(RelationshipValue::new(id, start, end, rel_type, properties))
}

fn metadata_id(fields: &JsonMap<String, JsonValue>) -> Option<i64> {
    fields.get("metadata")?.get("id")?.as_i64()
}

fn uri_tail_id(uri: &str) -> Option<i64> {
    uri.rsplit('/').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classic_node_body() -> JsonValue {
        json!({
            "columns": ["n"],
            "data": [[{
                "self": "http://localhost:7474/db/data/node/42",
                "metadata": {"id": 42, "labels": ["City"]},
                "data": {"name": "Tokyo", "population": 13000000}
            }]]
        })
    }

    #[test]
    fn test_classic_node_promotion() {
        let set = parse_classic(classic_node_body()).unwrap();
        assert_eq!(set.columns(), ["n"]);
        match &set.rows()[0][0] {
            GraphValue::Node(node) => {
                assert_eq!(node.id, 42);
                assert_eq!(node.labels, ["City"]);
                assert_eq!(
                    node.properties["name"],
                    GraphValue::String("Tokyo".to_string())
                );
            }
            other => panic!("expected node, got {:?}", other),
        }
    }

    #[test]
    fn test_classic_relationship_promotion() {
        let body = json!({
            "columns": ["r"],
            "data": [[{
                "self": "http://localhost:7474/db/data/relationship/7",
                "start": "http://localhost:7474/db/data/node/1",
                "end": "http://localhost:7474/db/data/node/2",
                "type": "KNOWS",
                "data": {"since": 2011}
            }]]
        });
        let set = parse_classic(body).unwrap();
        match &set.rows()[0][0] {
            GraphValue::Relationship(rel) => {
                assert_eq!(rel.id, 7);
                assert_eq!(rel.start, 1);
                assert_eq!(rel.end, 2);
                assert_eq!(rel.rel_type, "KNOWS");
                assert_eq!(rel.properties["since"], GraphValue::Int(2011));
            }
            other => panic!("expected relationship, got {:?}", other),
        }
    }

    #[test]
    fn test_object_without_self_stays_a_map() {
        let body = json!({
            "columns": ["stats"],
            "data": [[{"nodes": 10, "relationships": 4}]]
        });
        let set = parse_classic(body).unwrap();
        assert!(matches!(set.rows()[0][0], GraphValue::Map(_)));
    }

    #[test]
    fn test_transactional_node_meta_promotion() {
        let body = json!({
            "results": [{
                "columns": ["n"],
                "data": [{
                    "row": [{"name": "Tokyo", "population": 13000000}],
                    "meta": [{"id": 42, "type": "node", "deleted": false}]
                }]
            }],
            "errors": []
        });
        let sets = parse_transactional(body).unwrap();
        assert_eq!(sets.len(), 1);
        match &sets[0].rows()[0][0] {
            GraphValue::Node(node) => {
                assert_eq!(node.id, 42);
                assert!(node.labels.is_empty());
                assert_eq!(node.properties["population"], GraphValue::Int(13000000));
            }
            other => panic!("expected node, got {:?}", other),
        }
    }

    #[test]
    fn test_transactional_errors_surface_as_typed_errors() {
        let body = json!({
            "results": [],
            "errors": [{"code": "Neo.ClientError.Statement.SyntaxError", "message": "bad query"}]
        });
        let err = parse_transactional(body).unwrap_err();
        match err {
            RestError::Server { code, message } => {
                assert!(code.contains("SyntaxError"));
                assert_eq!(message, "bad query");
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn test_both_variants_agree_on_scalar_rows() {
        let classic = parse_classic(json!({
            "columns": ["name", "population"],
            "data": [["Tokyo", 13000000]]
        }))
        .unwrap();
        let tx = parse_transactional(json!({
            "results": [{
                "columns": ["name", "population"],
                "data": [{"row": ["Tokyo", 13000000]}]
            }],
            "errors": []
        }))
        .unwrap();
        assert_eq!(classic, tx[0]);
    }

    #[test]
    fn test_nested_collection_of_nodes_is_promoted() {
        let body = json!({
            "columns": ["cities"],
            "data": [[[
                {
                    "self": "http://localhost:7474/db/data/node/1",
                    "data": {"name": "Tokyo"}
                },
                {
                    "self": "http://localhost:7474/db/data/node/2",
                    "data": {"name": "Osaka"}
                }
            ]]]
        });
        let set = parse_classic(body).unwrap();
        match &set.rows()[0][0] {
            GraphValue::List(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], GraphValue::Node(_)));
                match &items[1] {
                    GraphValue::Node(node) => assert_eq!(node.id, 2),
                    other => panic!("expected node, got {:?}", other),
                }
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_date_strings_pass_through_untouched() {
        // Date rewriting belongs to the mapping layer's converter chain,
        // not the envelope parser.
        let set = parse_classic(json!({
            "columns": ["at"],
            "data": [["/Date(1315271562384+0200)/"]]
        }))
        .unwrap();
        assert_eq!(
            set.rows()[0][0],
            GraphValue::String("/Date(1315271562384+0200)/".to_string())
        );
    }
}
