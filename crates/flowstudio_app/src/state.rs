// SPDX-License-Identifier: MIT OR Apache-2.0
//! Central mutable state consumed by the screens and panels.

use flowstudio_client::{ExecutionStatus, Flow, UserProfile};
use flowstudio_graph::ui::CanvasState;
use flowstudio_graph::{FlowGraph, NodeRegistry};

/// Which screen is on display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Credential entry
    Login,
    /// Flow listing
    Flows,
    /// Canvas editor for one flow
    Editor,
}

/// A dismissible message shown at the top of a screen
#[derive(Debug, Clone)]
pub struct Banner {
    /// Severity
    pub kind: BannerKind,
    /// User-facing text
    pub message: String,
}

/// Banner severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    /// Something failed; the action can be retried
    Error,
    /// Informational
    Info,
}

/// Execution progress shown in the editor header
#[derive(Debug, Clone, Default)]
pub struct ExecutionView {
    /// Set once the backend acknowledged the start
    pub execution_id: Option<String>,
    /// Latest poll result
    pub status: Option<ExecutionStatus>,
    /// Start or poll failure
    pub error: Option<String>,
    /// A start request is in flight
    pub starting: bool,
}

impl ExecutionView {
    /// Whether an execution is running or starting
    pub fn in_progress(&self) -> bool {
        if self.starting {
            return true;
        }
        match &self.status {
            Some(status) => !status.status.is_terminal(),
            None => self.execution_id.is_some() && self.error.is_none(),
        }
    }
}

/// Everything belonging to one open flow in the editor
pub struct EditorSession {
    /// Stored metadata of the flow being edited
    pub flow: Flow,
    /// The graph under edit
    pub graph: FlowGraph,
    /// Canvas interaction state
    pub canvas: CanvasState,
    /// Unsaved edits exist
    pub dirty: bool,
    /// Monotonic edit counter, used to decide whether a finished save
    /// covered the latest edits
    pub edit_counter: u64,
    /// Edit counter captured when the in-flight save was issued
    pub pending_save: Option<u64>,
    /// Execution progress, if a run was started
    pub execution: ExecutionView,
}

impl EditorSession {
    /// Open an editor session on a stored flow
    pub fn new(flow: Flow) -> Self {
        let graph = flow.graph();
        Self {
            flow,
            graph,
            canvas: CanvasState::new(),
            dirty: false,
            edit_counter: 0,
            pending_save: None,
            execution: ExecutionView::default(),
        }
    }

    /// Record a graph mutation
    pub fn mark_edited(&mut self) {
        self.dirty = true;
        self.edit_counter += 1;
    }

    /// A save for the current edit state is in flight
    pub fn save_in_flight(&self) -> bool {
        self.pending_save.is_some()
    }
}

/// Top-level application state
pub struct StudioState {
    /// Current screen
    pub screen: Screen,
    /// Node kind registry shared by palette and canvas
    pub registry: NodeRegistry,
    /// Signed-in user
    pub user: Option<UserProfile>,
    /// Cached flow listing
    pub flows: Vec<Flow>,
    /// A listing request is in flight
    pub flows_loading: bool,
    /// Screen-level banner
    pub banner: Option<Banner>,
    /// Open editor, when on the editor screen
    pub editor: Option<EditorSession>,
}

impl StudioState {
    /// Initial signed-out state
    pub fn new() -> Self {
        Self {
            screen: Screen::Login,
            registry: NodeRegistry::builtin(),
            user: None,
            flows: Vec::new(),
            flows_loading: false,
            banner: None,
            editor: None,
        }
    }

    /// Show an error banner
    pub fn error_banner(&mut self, message: impl Into<String>) {
        self.banner = Some(Banner {
            kind: BannerKind::Error,
            message: message.into(),
        });
    }

    /// Show an info banner
    pub fn info_banner(&mut self, message: impl Into<String>) {
        self.banner = Some(Banner {
            kind: BannerKind::Info,
            message: message.into(),
        });
    }

    /// Drop everything tied to the signed-in user and return to login
    pub fn force_sign_out(&mut self, reason: &str) {
        self.user = None;
        self.flows.clear();
        self.flows_loading = false;
        self.editor = None;
        self.screen = Screen::Login;
        self.error_banner(reason);
    }
}

impl Default for StudioState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowstudio_client::FlowStatus;

    fn stored_flow() -> Flow {
        Flow {
            id: "f-1".to_string(),
            name: "Orders".to_string(),
            description: String::new(),
            status: FlowStatus::Draft,
            trigger_mode: Some("webhook".to_string()),
            nodes: Vec::new(),
            connections: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_editor_session_tracks_edits() {
        let mut session = EditorSession::new(stored_flow());
        assert!(!session.dirty);

        session.mark_edited();
        session.mark_edited();
        assert!(session.dirty);
        assert_eq!(session.edit_counter, 2);
    }

    #[test]
    fn test_force_sign_out_clears_session_state() {
        let mut state = StudioState::new();
        state.screen = Screen::Editor;
        state.editor = Some(EditorSession::new(stored_flow()));
        state.flows.push(stored_flow());

        state.force_sign_out("session expired");

        assert_eq!(state.screen, Screen::Login);
        assert!(state.editor.is_none());
        assert!(state.flows.is_empty());
        assert!(state.banner.is_some());
    }
}
