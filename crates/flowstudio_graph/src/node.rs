// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the flow graph.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique identifier for a node.
///
/// Ids are opaque strings. Fresh ids are UUIDv4, but ids decoded from stored
/// flows are accepted verbatim (legacy snapshots used timestamp strings).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Trigger sub-kind, present only on trigger-category nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Fires on a cron-style schedule
    Schedule,
    /// Fires on an incoming HTTP request
    Webhook,
}

impl TriggerKind {
    /// Wire identifier for this trigger kind
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Webhook => "webhook",
        }
    }
}

/// The fixed catalog of node kinds.
///
/// Serialized as the wire identifier string; unknown identifiers round-trip
/// through [`NodeKind::Other`] instead of failing decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    // Triggers
    Schedule,
    Webhook,
    Trigger,
    // Databases
    Postgresql,
    Mysql,
    Mariadb,
    Tidb,
    Neon,
    Mongodb,
    Snowflake,
    Supabase,
    Clickhouse,
    Hydra,
    Mssql,
    Oracle,
    Elasticsearch,
    Firebase,
    Dynamodb,
    Couchdb,
    // APIs
    RestApi,
    Graphql,
    // Storage / messaging
    S3,
    Redis,
    Upstash,
    // Communication
    Smtp,
    WebhookResponse,
    // AI
    AiAgent,
    HuggingFace,
    // External services
    GoogleSheets,
    Airtable,
    Appwrite,
    // Flow control
    Transformer,
    Condition,
    Loop,
    Response,
    ErrorHandler,
    /// Any identifier outside the catalog, preserved verbatim
    Other(String),
}

impl NodeKind {
    /// Wire identifier for this kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::Schedule => "schedule",
            Self::Webhook => "webhook",
            Self::Trigger => "trigger",
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Tidb => "tidb",
            Self::Neon => "neon",
            Self::Mongodb => "mongodb",
            Self::Snowflake => "snowflake",
            Self::Supabase => "supabasedb",
            Self::Clickhouse => "clickhouse",
            Self::Hydra => "hydra",
            Self::Mssql => "mssql",
            Self::Oracle => "oracle",
            Self::Elasticsearch => "elasticsearch",
            Self::Firebase => "firebase",
            Self::Dynamodb => "dynamodb",
            Self::Couchdb => "couchdb",
            Self::RestApi => "rest-api",
            Self::Graphql => "graphql",
            Self::S3 => "s3",
            Self::Redis => "redis",
            Self::Upstash => "upstash",
            Self::Smtp => "smtp",
            Self::WebhookResponse => "webhookresponse",
            Self::AiAgent => "aiagent",
            Self::HuggingFace => "huggingface",
            Self::GoogleSheets => "googlesheets",
            Self::Airtable => "airtable",
            Self::Appwrite => "appwrite",
            Self::Transformer => "transformer",
            Self::Condition => "condition",
            Self::Loop => "loop",
            Self::Response => "response",
            Self::ErrorHandler => "error-handler",
            Self::Other(id) => id,
        }
    }

    /// Parse a wire identifier, falling back to [`NodeKind::Other`]
    pub fn parse(id: &str) -> Self {
        match id {
            "schedule" => Self::Schedule,
            "webhook" => Self::Webhook,
            "trigger" => Self::Trigger,
            "postgresql" => Self::Postgresql,
            "mysql" => Self::Mysql,
            "mariadb" => Self::Mariadb,
            "tidb" => Self::Tidb,
            "neon" => Self::Neon,
            "mongodb" => Self::Mongodb,
            "snowflake" => Self::Snowflake,
            "supabasedb" => Self::Supabase,
            "clickhouse" => Self::Clickhouse,
            "hydra" => Self::Hydra,
            "mssql" => Self::Mssql,
            "oracle" => Self::Oracle,
            "elasticsearch" => Self::Elasticsearch,
            "firebase" => Self::Firebase,
            "dynamodb" => Self::Dynamodb,
            "couchdb" => Self::Couchdb,
            "rest-api" => Self::RestApi,
            "graphql" => Self::Graphql,
            "s3" => Self::S3,
            "redis" => Self::Redis,
            "upstash" => Self::Upstash,
            "smtp" => Self::Smtp,
            "webhookresponse" => Self::WebhookResponse,
            "aiagent" => Self::AiAgent,
            "huggingface" => Self::HuggingFace,
            "googlesheets" => Self::GoogleSheets,
            "airtable" => Self::Airtable,
            "appwrite" => Self::Appwrite,
            "transformer" => Self::Transformer,
            "condition" => Self::Condition,
            "loop" => Self::Loop,
            "response" => Self::Response,
            "error-handler" => Self::ErrorHandler,
            other => Self::Other(other.to_string()),
        }
    }

    /// Human-readable label derived from the identifier: split on `-` and
    /// title-case each segment (`rest-api` becomes `Rest Api`).
    pub fn display_label(&self) -> String {
        self.as_str()
            .split('-')
            .map(|segment| {
                let mut chars = segment.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<String> for NodeKind {
    fn from(id: String) -> Self {
        Self::parse(&id)
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Other(id) => id,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 2D coordinate in canvas space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate, pixels from the canvas origin
    pub x: f32,
    /// Vertical coordinate, pixels from the canvas origin
    pub y: f32,
}

impl Position {
    /// Create a position
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// This position shifted by a delta, clamped to non-negative coordinates
    pub fn translated(self, dx: f32, dy: f32) -> Self {
        Self {
            x: (self.x + dx).max(0.0),
            y: (self.y + dy).max(0.0),
        }
    }
}

/// A placed node in the flow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID, stable for the node's lifetime
    pub id: NodeId,
    /// Node kind, selects icon, color and configuration form
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Trigger sub-kind, only set on trigger-category nodes
    #[serde(rename = "triggerType", default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerKind>,
    /// Position on the canvas
    pub position: Position,
    /// Open, kind-dependent configuration bag
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Node {
    /// Create a node with a fresh id and an empty configuration bag
    pub fn new(kind: NodeKind, trigger: Option<TriggerKind>, position: Position) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            trigger,
            position,
            data: Map::new(),
        }
    }

    /// Shallow-merge a patch into the configuration bag.
    ///
    /// Existing keys not present in the patch are kept; keys in the patch
    /// overwrite. Nested values are replaced wholesale, not merged.
    pub fn merge_data(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.data.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for id in ["rest-api", "postgresql", "error-handler", "webhookresponse"] {
            assert_eq!(NodeKind::parse(id).as_str(), id);
        }
    }

    #[test]
    fn test_unknown_kind_preserved() {
        let kind = NodeKind::parse("quantum-db");
        assert_eq!(kind, NodeKind::Other("quantum-db".to_string()));
        assert_eq!(kind.as_str(), "quantum-db");
    }

    #[test]
    fn test_display_label() {
        assert_eq!(NodeKind::RestApi.display_label(), "Rest Api");
        assert_eq!(NodeKind::ErrorHandler.display_label(), "Error Handler");
        assert_eq!(NodeKind::Postgresql.display_label(), "Postgresql");
    }

    #[test]
    fn test_kind_serde_as_string() {
        let json = serde_json::to_string(&NodeKind::RestApi).unwrap();
        assert_eq!(json, "\"rest-api\"");
        let parsed: NodeKind = serde_json::from_str("\"no-such-kind\"").unwrap();
        assert_eq!(parsed, NodeKind::Other("no-such-kind".to_string()));
    }

    #[test]
    fn test_translated_clamps_to_origin() {
        let pos = Position::new(10.0, 5.0).translated(-30.0, -30.0);
        assert_eq!(pos, Position::new(0.0, 0.0));
    }

    #[test]
    fn test_merge_data_keeps_existing_keys() {
        let mut node = Node::new(NodeKind::Transformer, None, Position::default());
        node.data.insert("code".into(), Value::String("return input".into()));

        let mut patch = Map::new();
        patch.insert("timeout".into(), Value::from(30));
        node.merge_data(patch);

        assert_eq!(node.data.len(), 2);
        assert_eq!(node.data["code"], Value::String("return input".into()));
        assert_eq!(node.data["timeout"], Value::from(30));
    }
}
