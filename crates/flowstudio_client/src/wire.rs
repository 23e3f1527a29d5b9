// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire-format normalization between backend payloads and the internal flow
//! shape.
//!
//! Backend snapshots answered with three materially different shapes for the
//! same resource: bare arrays, `{success, data}` envelopes, and bare objects
//! with drifting field names (`resourceID` vs `uid` vs `workflowId`, the node
//! graph nested as an object, a JSON-encoded string, or a raw template map
//! keyed with the legacy trailing-comma `action_type,`). Everything entering
//! the application is normalized here, in one place; writes always leave in
//! the one canonical request shape produced by [`encode_flow_request`].

use crate::flow::{ExecutionHandle, ExecutionStatus, Flow, FlowStatus};
use chrono::{DateTime, Utc};
use flowstudio_graph::{
    Connection, ConnectionId, FlowGraph, Node, NodeId, NodeKind, Position, TriggerKind,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Error normalizing a backend payload
#[derive(Debug, Error)]
pub enum WireError {
    /// The response body was not valid JSON
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    /// The payload matched no known shape
    #[error("payload shape is not recognized")]
    UnexpectedShape,

    /// A record was present but carried no usable id
    #[error("record is missing an id")]
    MissingId,

    /// Nothing was returned where a record was expected
    #[error("expected a record, found nothing")]
    MissingRecord,
}

/// Strip a `{success, data}` envelope, if present
fn unwrap_envelope(value: &Value) -> &Value {
    static NULL: Value = Value::Null;
    match value {
        Value::Object(map) if map.contains_key("success") => map.get("data").unwrap_or(&NULL),
        other => other,
    }
}

/// Decode a list response.
///
/// Empty and absent collections decode to an empty vec, never an error.
/// Individual records that cannot be normalized become `status: error`
/// placeholders so one bad row does not take down the whole listing.
pub fn decode_flow_list(value: &Value) -> Result<Vec<Flow>, WireError> {
    match unwrap_envelope(value) {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.iter().map(decode_flow_lenient).collect()),
        _ => Err(WireError::UnexpectedShape),
    }
}

/// Decode a single-record response, strictly.
///
/// Fails with [`WireError::MissingRecord`] when the backend returned nothing
/// and [`WireError::MissingId`]/[`WireError::UnexpectedShape`] when the
/// payload cannot be normalized. Missing optional fields inside an otherwise
/// valid record get safe defaults.
pub fn decode_flow(value: &Value) -> Result<Flow, WireError> {
    let inner = unwrap_envelope(value);
    let record = match inner {
        Value::Object(map) => map,
        Value::Null => return Err(WireError::MissingRecord),
        _ => return Err(WireError::UnexpectedShape),
    };
    let id = record_id(record).ok_or(WireError::MissingId)?;
    Ok(decode_record(id, record))
}

/// Decode a record, substituting an error-status placeholder on failure
pub fn decode_flow_lenient(value: &Value) -> Flow {
    decode_flow(value).unwrap_or_else(|_| Flow {
        id: "unknown".to_string(),
        name: "Unknown Flow".to_string(),
        description: String::new(),
        status: FlowStatus::Error,
        trigger_mode: None,
        nodes: Vec::new(),
        connections: Vec::new(),
        created_at: None,
        updated_at: None,
    })
}

/// Decode the body of an execute call
pub fn decode_execution_handle(value: &Value) -> Result<ExecutionHandle, WireError> {
    serde_json::from_value(unwrap_envelope(value).clone())
        .map_err(|_| WireError::UnexpectedShape)
}

/// Decode the body of an execution status poll
pub fn decode_execution_status(value: &Value) -> Result<ExecutionStatus, WireError> {
    serde_json::from_value(unwrap_envelope(value).clone())
        .map_err(|_| WireError::UnexpectedShape)
}

/// Serialize a flow write into the canonical request shape.
///
/// This is the only shape ever sent, regardless of which shape the record
/// was read in: template as a JSON object, `displayName` for the name,
/// node types under `type`.
pub fn encode_flow_request(name: &str, trigger_mode: &str, graph: &FlowGraph) -> Value {
    json!({
        "displayName": name,
        "workflowType": "workflow",
        "triggerMode": trigger_mode,
        "template": {
            "nodes": graph.nodes().map(encode_node).collect::<Vec<_>>(),
            "connections": graph.connections().map(encode_connection).collect::<Vec<_>>(),
        },
    })
}

fn encode_node(node: &Node) -> Value {
    let mut obj = Map::new();
    obj.insert("id".to_string(), json!(node.id.as_str()));
    obj.insert("type".to_string(), json!(node.kind.as_str()));
    if let Some(trigger) = node.trigger {
        obj.insert("triggerType".to_string(), json!(trigger.as_str()));
    }
    obj.insert(
        "position".to_string(),
        json!({ "x": node.position.x, "y": node.position.y }),
    );
    obj.insert("data".to_string(), Value::Object(node.data.clone()));
    Value::Object(obj)
}

fn encode_connection(conn: &Connection) -> Value {
    json!({
        "id": conn.id.as_str(),
        "sourceId": conn.source.as_str(),
        "targetId": conn.target.as_str(),
    })
}

/// Extract an id from any of the keys backends used for it
fn record_id(record: &Map<String, Value>) -> Option<String> {
    ["resourceID", "uid", "workflowId", "id"]
        .iter()
        .find_map(|key| record.get(*key).and_then(id_like))
}

/// Accept both string and numeric ids
fn id_like(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn decode_record(id: String, record: &Map<String, Value>) -> Flow {
    let name = str_field(record, "displayName")
        .or_else(|| str_field(record, "name"))
        .filter(|s| !s.is_empty())
        .unwrap_or("Untitled Flow")
        .to_string();
    let description = str_field(record, "description").unwrap_or("").to_string();
    let status = str_field(record, "status")
        .map(FlowStatus::parse)
        .unwrap_or_default();
    let trigger_mode = record.get("triggerMode").and_then(id_like);
    let (nodes, connections) = decode_template(record.get("template"));

    Flow {
        id,
        name,
        description,
        status,
        trigger_mode,
        nodes,
        connections,
        created_at: timestamp(record.get("createdAt")),
        updated_at: timestamp(record.get("updatedAt")),
    }
}

/// Accept the template as an object or a JSON-encoded string
fn decode_template(value: Option<&Value>) -> (Vec<Node>, Vec<Connection>) {
    let parsed: Option<Value>;
    let template = match value {
        Some(Value::Object(_)) => value,
        Some(Value::String(raw)) => {
            parsed = serde_json::from_str(raw).ok();
            parsed.as_ref()
        }
        _ => None,
    };
    let Some(Value::Object(template)) = template else {
        return (Vec::new(), Vec::new());
    };

    let nodes = template
        .get("nodes")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(decode_node).collect())
        .unwrap_or_default();
    let connections = template
        .get("connections")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(decode_connection).collect())
        .unwrap_or_default();
    (nodes, connections)
}

fn decode_node(value: &Value) -> Option<Node> {
    let record = value.as_object()?;
    let id = record.get("id").and_then(id_like)?;

    // Oldest snapshots keyed the node type as `action_type,` — comma included
    let kind = ["action_type,", "action_type", "type"]
        .iter()
        .find_map(|key| str_field(record, key))
        .map(NodeKind::parse)
        .unwrap_or_else(|| NodeKind::parse("unknown"));

    let trigger = match str_field(record, "triggerType") {
        Some("schedule") => Some(TriggerKind::Schedule),
        Some("webhook") => Some(TriggerKind::Webhook),
        _ => None,
    };

    let position = record
        .get("position")
        .and_then(Value::as_object)
        .map(|p| Position::new(num_field(p, "x"), num_field(p, "y")))
        .unwrap_or_default();

    let data = record
        .get("data")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Some(Node {
        id: NodeId::from(id),
        kind,
        trigger,
        position,
        data,
    })
}

fn decode_connection(value: &Value) -> Option<Connection> {
    let record = value.as_object()?;
    let source = record.get("sourceId").and_then(id_like)?;
    let target = record.get("targetId").and_then(id_like)?;
    let id = record
        .get("id")
        .and_then(id_like)
        .unwrap_or_else(|| format!("{source}-{target}"));

    Some(Connection {
        id: ConnectionId::from(id),
        source: NodeId::from(source),
        target: NodeId::from(target),
    })
}

fn num_field(record: &Map<String, Value>, key: &str) -> f32 {
    record.get(key).and_then(Value::as_f64).unwrap_or(0.0) as f32
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_bare_array() {
        let payload = json!([
            { "uid": "f-1", "displayName": "First" },
            { "uid": "f-2", "displayName": "Second" },
        ]);
        let flows = decode_flow_list(&payload).unwrap();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0].id, "f-1");
        assert_eq!(flows[1].name, "Second");
    }

    #[test]
    fn test_list_enveloped() {
        let payload = json!({
            "success": true,
            "data": [{ "workflowId": 42, "name": "Enveloped" }],
        });
        let flows = decode_flow_list(&payload).unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].id, "42");
        assert_eq!(flows[0].name, "Enveloped");
    }

    #[test]
    fn test_list_empty_and_missing_collections() {
        for payload in [
            json!({ "success": true, "data": null }),
            json!({ "success": true }),
            json!(null),
            json!([]),
        ] {
            let flows = decode_flow_list(&payload).unwrap();
            assert!(flows.is_empty(), "expected empty list for {payload}");
        }
    }

    #[test]
    fn test_list_bad_record_becomes_error_placeholder() {
        let payload = json!([{ "uid": "ok", "displayName": "Fine" }, { "noId": true }]);
        let flows = decode_flow_list(&payload).unwrap();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0].status, FlowStatus::Draft);
        assert_eq!(flows[1].status, FlowStatus::Error);
        assert_eq!(flows[1].id, "unknown");
    }

    #[test]
    fn test_get_strict_failures() {
        assert!(matches!(
            decode_flow(&json!(null)),
            Err(WireError::MissingRecord)
        ));
        assert!(matches!(
            decode_flow(&json!({ "success": true })),
            Err(WireError::MissingRecord)
        ));
        assert!(matches!(
            decode_flow(&json!({ "displayName": "no id here" })),
            Err(WireError::MissingId)
        ));
        assert!(matches!(
            decode_flow(&json!("a string")),
            Err(WireError::UnexpectedShape)
        ));
    }

    #[test]
    fn test_decode_template_as_object_with_legacy_keys() {
        let payload = json!({
            "uid": "abc",
            "resourceID": "res-9",
            "displayName": "Legacy",
            "triggerMode": "1",
            "template": {
                "nodes": [
                    {
                        "id": "1736112000000",
                        "action_type,": "webhook",
                        "triggerType": "webhook",
                        "position": { "x": 100.0, "y": 100.0 },
                        "data": { "method": "POST" }
                    },
                    {
                        "id": "1736112000001",
                        "action_type": "transformer",
                        "position": { "x": 350.0, "y": 250.0 }
                    }
                ],
                "connections": [
                    { "id": "c1", "sourceId": "1736112000000", "targetId": "1736112000001" }
                ]
            }
        });

        let flow = decode_flow(&payload).unwrap();
        // resourceID wins over uid
        assert_eq!(flow.id, "res-9");
        assert_eq!(flow.trigger_mode.as_deref(), Some("1"));
        assert_eq!(flow.nodes.len(), 2);
        assert_eq!(flow.nodes[0].kind, NodeKind::Webhook);
        assert_eq!(flow.nodes[0].trigger, Some(TriggerKind::Webhook));
        assert_eq!(flow.nodes[0].data["method"], "POST");
        assert_eq!(flow.nodes[1].kind, NodeKind::Transformer);
        assert!(flow.nodes[1].data.is_empty());
        assert_eq!(flow.connections.len(), 1);
        assert_eq!(flow.connections[0].source.as_str(), "1736112000000");
    }

    #[test]
    fn test_decode_template_as_json_string() {
        let template = json!({
            "nodes": [{ "id": "n1", "type": "postgresql", "position": { "x": 10, "y": 20 } }],
            "connections": [],
        })
        .to_string();
        let payload = json!({
            "workflowId": 7,
            "name": "Stringly",
            "template": template,
            "createdAt": "2025-06-01T12:00:00Z",
        });

        let flow = decode_flow(&payload).unwrap();
        assert_eq!(flow.id, "7");
        assert_eq!(flow.nodes.len(), 1);
        assert_eq!(flow.nodes[0].kind, NodeKind::Postgresql);
        assert_eq!(flow.nodes[0].position, Position::new(10.0, 20.0));
        assert!(flow.created_at.is_some());
    }

    #[test]
    fn test_decode_defaults_for_missing_fields() {
        let flow = decode_flow(&json!({ "uid": "bare" })).unwrap();
        assert_eq!(flow.name, "Untitled Flow");
        assert_eq!(flow.status, FlowStatus::Draft);
        assert!(flow.nodes.is_empty());
        assert!(flow.connections.is_empty());
        assert!(flow.created_at.is_none());
    }

    #[test]
    fn test_status_from_backend_not_node_count() {
        // A populated graph does not make a flow active
        let payload = json!({
            "uid": "x",
            "status": "draft",
            "template": { "nodes": [{ "id": "n", "type": "webhook" }], "connections": [] },
        });
        assert_eq!(decode_flow(&payload).unwrap().status, FlowStatus::Draft);

        let payload = json!({ "uid": "y", "status": "paused" });
        assert_eq!(decode_flow(&payload).unwrap().status, FlowStatus::Paused);
    }

    #[test]
    fn test_encode_canonical_shape() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(NodeKind::Webhook, Some(TriggerKind::Webhook));
        let b = graph.add_node(NodeKind::Transformer, None);
        graph.connect(&a, &b).unwrap();

        let body = encode_flow_request("My Flow", "webhook", &graph);
        assert_eq!(body["displayName"], "My Flow");
        assert_eq!(body["workflowType"], "workflow");
        assert_eq!(body["triggerMode"], "webhook");
        assert!(body["template"].is_object());
        assert_eq!(body["template"]["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(body["template"]["nodes"][0]["type"], "webhook");
        assert_eq!(body["template"]["nodes"][0]["triggerType"], "webhook");
        // Transformer nodes carry no trigger key at all
        assert!(body["template"]["nodes"][1].get("triggerType").is_none());
        assert_eq!(body["template"]["connections"][0]["sourceId"], a.as_str());
    }

    #[test]
    fn test_round_trip_reproduces_graph() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(NodeKind::Webhook, Some(TriggerKind::Webhook));
        let b = graph.add_node(NodeKind::Transformer, None);
        let c = graph.add_node(NodeKind::Postgresql, None);
        graph.connect(&a, &b).unwrap();
        graph.connect(&b, &c).unwrap();
        let mut patch = Map::new();
        patch.insert("code".to_string(), json!("return input"));
        graph.update_node_data(&b, patch);

        let body = encode_flow_request("Round Trip", "webhook", &graph);
        // The backend echoes the template back inside an envelope
        let echoed = json!({
            "success": true,
            "data": { "uid": "rt-1", "displayName": "Round Trip", "template": body["template"] },
        });

        let flow = decode_flow(&echoed).unwrap();
        let restored = flow.graph();

        assert_eq!(restored.node_count(), graph.node_count());
        assert_eq!(restored.connection_count(), graph.connection_count());
        for node in graph.nodes() {
            assert_eq!(restored.node(&node.id), Some(node));
        }
        for conn in graph.connections() {
            assert_eq!(restored.connection(&conn.id), Some(conn));
        }
    }

    #[test]
    fn test_execution_decoding() {
        let handle =
            decode_execution_handle(&json!({ "success": true, "data": { "executionId": "e-1" } }))
                .unwrap();
        assert_eq!(handle.execution_id, "e-1");

        let status = decode_execution_status(&json!({
            "status": "completed",
            "progress": 1.0,
            "result": { "rows": 3 },
        }))
        .unwrap();
        assert_eq!(status.status, crate::flow::ExecutionState::Completed);
        assert_eq!(status.result.unwrap()["rows"], 3);

        assert!(decode_execution_handle(&json!({ "nope": true })).is_err());
    }
}
