// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.

use crate::connection::{Connection, ConnectionId};
use crate::node::{Node, NodeId, NodeKind, Position, TriggerKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Horizontal stride between freshly placed nodes
const PLACE_STRIDE_X: f32 = 250.0;
/// Vertical stride within the 3-row placement cycle
const PLACE_STRIDE_Y: f32 = 150.0;
/// Placement origin
const PLACE_ORIGIN: Position = Position { x: 100.0, y: 100.0 };

/// The (nodes, connections) pair being edited.
///
/// Mutations uphold the graph invariants: node ids are unique, connections
/// always reference existing nodes, no self-loops, no duplicate ordered
/// pairs. Operations on missing ids are no-ops; nothing here panics or
/// performs I/O.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowGraph {
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
}

impl FlowGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from decoded wire data.
    ///
    /// Nodes with a duplicate id keep the first occurrence. Connections whose
    /// endpoints are missing, self-referential, or duplicated are dropped so
    /// the invariants hold for any input.
    pub fn from_parts(nodes: Vec<Node>, connections: Vec<Connection>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.nodes.entry(node.id.clone()).or_insert(node);
        }
        for conn in connections {
            let valid = conn.source != conn.target
                && graph.nodes.contains_key(&conn.source)
                && graph.nodes.contains_key(&conn.target)
                && !graph.has_edge(&conn.source, &conn.target);
            if valid {
                graph.connections.insert(conn.id.clone(), conn);
            }
        }
        graph
    }

    /// Add a node of the given kind at the next staggered grid slot.
    ///
    /// Placement walks right one stride per node and cycles through three
    /// rows, matching how the palette fills an empty canvas.
    pub fn add_node(&mut self, kind: NodeKind, trigger: Option<TriggerKind>) -> NodeId {
        let n = self.nodes.len();
        let position = Position::new(
            PLACE_ORIGIN.x + n as f32 * PLACE_STRIDE_X,
            PLACE_ORIGIN.y + (n % 3) as f32 * PLACE_STRIDE_Y,
        );
        let node = Node::new(kind, trigger, position);
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Insert an already-built node, replacing any node with the same id
    pub fn insert_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Shift a node's position by a delta, clamped to non-negative
    /// coordinates. No-op if the id is unknown.
    pub fn move_node(&mut self, id: &NodeId, dx: f32, dy: f32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.position = node.position.translated(dx, dy);
        }
    }

    /// Shallow-merge a patch into a node's configuration bag.
    /// No-op if the id is unknown.
    pub fn update_node_data(&mut self, id: &NodeId, patch: Map<String, Value>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.merge_data(patch);
        }
    }

    /// Remove a node and every connection touching it
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        self.connections.retain(|_, c| !c.involves_node(id));
        self.nodes.shift_remove(id)
    }

    /// Get a node by ID
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Get all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connect two nodes with a directed edge.
    ///
    /// Self-loops, unknown endpoints and duplicate ordered pairs are
    /// rejected. Callers driving UI gestures typically discard the error;
    /// the graph is unchanged either way.
    pub fn connect(
        &mut self,
        source: &NodeId,
        target: &NodeId,
    ) -> Result<ConnectionId, ConnectError> {
        if source == target {
            return Err(ConnectError::SelfLoop);
        }
        if !self.nodes.contains_key(source) {
            return Err(ConnectError::NodeNotFound(source.clone()));
        }
        if !self.nodes.contains_key(target) {
            return Err(ConnectError::NodeNotFound(target.clone()));
        }
        if self.has_edge(source, target) {
            return Err(ConnectError::DuplicateEdge);
        }

        let connection = Connection::new(source.clone(), target.clone());
        let id = connection.id.clone();
        self.connections.insert(id.clone(), connection);
        Ok(id)
    }

    /// Remove a connection by id. No-op if the id is unknown.
    pub fn disconnect(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.shift_remove(id)
    }

    /// Get a connection by ID
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Get all connections in insertion order
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections involving a node
    pub fn connections_for_node<'a>(
        &'a self,
        id: &'a NodeId,
    ) -> impl Iterator<Item = &'a Connection> {
        self.connections.values().filter(move |c| c.involves_node(id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether an edge for this ordered pair already exists
    pub fn has_edge(&self, source: &NodeId, target: &NodeId) -> bool {
        self.connections
            .values()
            .any(|c| c.source == *source && c.target == *target)
    }

    /// True when the graph has no nodes and no connections
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }
}

/// Error when creating a connection
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConnectError {
    /// Source and target are the same node
    #[error("a node cannot connect to itself")]
    SelfLoop,

    /// Endpoint does not exist in the graph
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// An edge for this ordered pair already exists
    #[error("connection already exists")]
    DuplicateEdge,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn two_node_graph() -> (FlowGraph, NodeId, NodeId) {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(NodeKind::Webhook, Some(TriggerKind::Webhook));
        let b = graph.add_node(NodeKind::Transformer, None);
        (graph, a, b)
    }

    #[test]
    fn test_node_ids_distinct() {
        let mut graph = FlowGraph::new();
        let ids: HashSet<_> = (0..50)
            .map(|_| graph.add_node(NodeKind::Transformer, None))
            .collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_staggered_placement() {
        let mut graph = FlowGraph::new();
        let ids: Vec<_> = (0..4)
            .map(|_| graph.add_node(NodeKind::Transformer, None))
            .collect();

        let positions: Vec<_> = ids.iter().map(|id| graph.node(id).unwrap().position).collect();
        assert_eq!(positions[0], Position::new(100.0, 100.0));
        assert_eq!(positions[1], Position::new(350.0, 250.0));
        assert_eq!(positions[2], Position::new(600.0, 400.0));
        // Row cycle wraps after three nodes
        assert_eq!(positions[3], Position::new(850.0, 100.0));
    }

    #[test]
    fn test_self_connect_never_mutates() {
        let (mut graph, a, _) = two_node_graph();
        assert_eq!(graph.connect(&a, &a), Err(ConnectError::SelfLoop));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let (mut graph, a, b) = two_node_graph();
        graph.connect(&a, &b).unwrap();
        assert_eq!(graph.connect(&a, &b), Err(ConnectError::DuplicateEdge));
        assert_eq!(graph.connection_count(), 1);
        // The reverse direction is a different ordered pair
        graph.connect(&b, &a).unwrap();
        assert_eq!(graph.connection_count(), 2);
    }

    #[test]
    fn test_connect_unknown_endpoint() {
        let (mut graph, a, _) = two_node_graph();
        let ghost = NodeId::from("ghost");
        assert!(matches!(
            graph.connect(&a, &ghost),
            Err(ConnectError::NodeNotFound(_))
        ));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_disconnect_removes_exactly_one() {
        let (mut graph, a, b) = two_node_graph();
        let c = graph.add_node(NodeKind::Response, None);
        let ab = graph.connect(&a, &b).unwrap();
        let bc = graph.connect(&b, &c).unwrap();

        assert!(graph.disconnect(&ab).is_some());
        assert!(graph.connection(&ab).is_none());
        assert!(graph.connection(&bc).is_some());
        // Removing again is a no-op
        assert!(graph.disconnect(&ab).is_none());
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn test_move_then_unmove_restores_position() {
        let (mut graph, a, _) = two_node_graph();
        let before = graph.node(&a).unwrap().position;
        graph.move_node(&a, 37.5, 81.25);
        graph.move_node(&a, -37.5, -81.25);
        assert_eq!(graph.node(&a).unwrap().position, before);
    }

    #[test]
    fn test_move_clamps_to_canvas() {
        let (mut graph, a, _) = two_node_graph();
        graph.move_node(&a, -10_000.0, -10_000.0);
        assert_eq!(graph.node(&a).unwrap().position, Position::new(0.0, 0.0));
    }

    #[test]
    fn test_move_unknown_node_is_noop() {
        let (mut graph, _, _) = two_node_graph();
        let before = graph.clone();
        graph.move_node(&NodeId::from("ghost"), 5.0, 5.0);
        assert_eq!(graph.node_count(), before.node_count());
    }

    #[test]
    fn test_remove_node_cascades_connections() {
        let (mut graph, a, b) = two_node_graph();
        let c = graph.add_node(NodeKind::Response, None);
        graph.connect(&a, &b).unwrap();
        graph.connect(&b, &c).unwrap();
        graph.connect(&a, &c).unwrap();

        graph.remove_node(&b);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.connection_count(), 1);
        assert!(graph.has_edge(&a, &c));
    }

    #[test]
    fn test_update_node_data_merges() {
        let (mut graph, a, _) = two_node_graph();
        let mut first = Map::new();
        first.insert("method".into(), Value::String("POST".into()));
        graph.update_node_data(&a, first);

        let mut second = Map::new();
        second.insert("auth".into(), Value::String("none".into()));
        graph.update_node_data(&a, second);

        let data = &graph.node(&a).unwrap().data;
        assert_eq!(data.len(), 2);
        assert_eq!(data["method"], "POST");
    }

    #[test]
    fn test_from_parts_drops_dangling_connections() {
        let a = Node::new(NodeKind::Webhook, Some(TriggerKind::Webhook), Position::default());
        let b = Node::new(NodeKind::Transformer, None, Position::default());
        let ok = Connection::new(a.id.clone(), b.id.clone());
        let dangling = Connection::new(a.id.clone(), NodeId::from("gone"));
        let self_loop = Connection::new(b.id.clone(), b.id.clone());

        let graph = FlowGraph::from_parts(vec![a, b], vec![ok, dangling, self_loop]);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.connection_count(), 1);
    }
}
