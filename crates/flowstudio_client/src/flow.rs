// SPDX-License-Identifier: MIT OR Apache-2.0
//! The persisted flow resource and execution types.

use chrono::{DateTime, Utc};
use flowstudio_graph::{Connection, FlowGraph, Node};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a stored flow.
///
/// Server-authoritative: the value comes from the backend record and is
/// never inferred from graph contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    /// Saved but not published
    #[default]
    Draft,
    /// Published and runnable
    Active,
    /// Published but suspended
    Paused,
    /// The stored record could not be normalized
    Error,
}

impl FlowStatus {
    /// Wire identifier for this status
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Error => "error",
        }
    }

    /// Parse a wire identifier, defaulting to `Draft`
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "paused" => Self::Paused,
            "error" => Self::Error,
            _ => Self::Draft,
        }
    }
}

/// A stored flow: graph plus name, status and audit metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    /// Server-assigned identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Lifecycle status
    pub status: FlowStatus,
    /// How the flow is triggered, as reported by the backend
    pub trigger_mode: Option<String>,
    /// Graph nodes
    pub nodes: Vec<Node>,
    /// Graph connections
    pub connections: Vec<Connection>,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// Last-update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

impl Flow {
    /// Build an editable graph from this flow's stored parts
    pub fn graph(&self) -> FlowGraph {
        FlowGraph::from_parts(self.nodes.clone(), self.connections.clone())
    }
}

/// Input for creating a new flow
#[derive(Debug, Clone)]
pub struct FlowDraft {
    /// Display name, must be non-empty
    pub name: String,
    /// Trigger mode sent to the backend
    pub trigger_mode: String,
}

impl Default for FlowDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            trigger_mode: "webhook".to_string(),
        }
    }
}

/// Handle returned when an execution is started
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionHandle {
    /// Server-assigned execution id, used for status polling
    #[serde(rename = "executionId")]
    pub execution_id: String,
}

/// State of a running or finished execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    /// Still in progress
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Stopped before completion
    Cancelled,
}

impl ExecutionState {
    /// Whether this state is terminal
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One status poll of an execution
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStatus {
    /// Current state
    pub status: ExecutionState,
    /// Completion fraction reported by the backend
    #[serde(default)]
    pub progress: f32,
    /// Result payload, present once completed
    #[serde(default)]
    pub result: Option<Value>,
    /// Error message, present once failed
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_defaults_to_draft() {
        assert_eq!(FlowStatus::parse("active"), FlowStatus::Active);
        assert_eq!(FlowStatus::parse("bogus"), FlowStatus::Draft);
        assert_eq!(FlowStatus::parse(""), FlowStatus::Draft);
    }

    #[test]
    fn test_execution_state_terminal() {
        assert!(!ExecutionState::Running.is_terminal());
        assert!(ExecutionState::Completed.is_terminal());
        assert!(ExecutionState::Failed.is_terminal());
        assert!(ExecutionState::Cancelled.is_terminal());
    }
}
