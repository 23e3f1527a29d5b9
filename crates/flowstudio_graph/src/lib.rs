// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flow graph model for Flow Studio.
//!
//! This crate provides the in-memory representation of a flow being edited:
//! - Typed nodes with an open configuration bag
//! - Directed connections between nodes
//! - A registry mapping node kinds to display metadata and form kinds
//! - The interactive canvas editor state
//!
//! ## Architecture
//!
//! [`FlowGraph`] is the authoritative graph for an editing session. All
//! mutations go through its operations, which uphold the graph invariants
//! (unique ids, no self-loops, no duplicate edges, no dangling connections).
//! The graph never performs I/O; persistence lives in `flowstudio_client`.

pub mod connection;
pub mod graph;
pub mod node;
pub mod registry;
pub mod ui;

pub use connection::{Connection, ConnectionId};
pub use graph::{ConnectError, FlowGraph};
pub use node::{Node, NodeId, NodeKind, Position, TriggerKind};
pub use registry::{FormKind, NodeCategory, NodeRegistry, NodeSpec};
