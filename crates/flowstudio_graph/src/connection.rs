// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the flow graph.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection.
///
/// Opaque string, UUIDv4 on creation. Ids decoded from stored flows are
/// accepted verbatim, including the legacy `"{source}-{target}"` derived form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source node ID
    #[serde(rename = "sourceId")]
    pub source: NodeId,
    /// Target node ID
    #[serde(rename = "targetId")]
    pub target: NodeId,
}

impl Connection {
    /// Create a new connection with a fresh id
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: ConnectionId::new(),
            source,
            target,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: &NodeId) -> bool {
        self.source == *node_id || self.target == *node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_involves_node() {
        let a = NodeId::from("a");
        let b = NodeId::from("b");
        let c = NodeId::from("c");
        let conn = Connection::new(a.clone(), b.clone());

        assert!(conn.involves_node(&a));
        assert!(conn.involves_node(&b));
        assert!(!conn.involves_node(&c));
    }

    #[test]
    fn test_wire_field_names() {
        let conn = Connection::new(NodeId::from("src"), NodeId::from("dst"));
        let value = serde_json::to_value(&conn).unwrap();
        assert_eq!(value["sourceId"], "src");
        assert_eq!(value["targetId"], "dst");
    }
}
