// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP client for the flow CRUD and execute endpoints.

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::flow::{ExecutionHandle, ExecutionStatus, Flow, FlowDraft};
use crate::session::SessionHandle;
use crate::wire::{self, WireError};
use flowstudio_graph::FlowGraph;
use reqwest::{header, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Client for the backend's flow resource.
///
/// Every call attaches the current bearer token via the [`SessionHandle`];
/// calls fail fast with [`ApiError::Unauthenticated`] instead of hitting the
/// backend with a stale token.
#[derive(Clone)]
pub struct FlowClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionHandle,
}

impl FlowClient {
    /// Create a client for a backend origin
    pub fn new(config: &ClientConfig, session: SessionHandle) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
        })
    }

    /// The session gating this client's calls
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let bearer = self.session.bearer().await?;
        let url = format!("{}{}", self.base_url, path);
        debug!("{method} {url}");

        let mut request = self
            .http
            .request(method, &url)
            .header(header::AUTHORIZATION, bearer);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            // The backend rejected a token the session believed was live
            self.session.invalidate();
            return Err(ApiError::Unauthenticated(
                "backend rejected the access token".to_string(),
            ));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(WireError::InvalidJson(e.to_string())))
    }

    /// List all flows. An empty or absent collection is an empty vec.
    pub async fn list(&self) -> Result<Vec<Flow>, ApiError> {
        let body = self.request(Method::GET, "/flows", None).await?;
        Ok(wire::decode_flow_list(&body)?)
    }

    /// Fetch a single flow
    pub async fn get(&self, id: &str) -> Result<Flow, ApiError> {
        let body = self
            .request(Method::GET, &format!("/flows/{id}"), None)
            .await?;
        wire::decode_flow(&body).map_err(|e| match e {
            WireError::MissingRecord => ApiError::NotFound(format!("flow {id}")),
            other => ApiError::Decode(other),
        })
    }

    /// Create a flow from a draft and the current graph
    pub async fn create(&self, draft: &FlowDraft, graph: &FlowGraph) -> Result<Flow, ApiError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("flow name must not be empty".to_string()));
        }

        let body = wire::encode_flow_request(name, &draft.trigger_mode, graph);
        let response = self.request(Method::POST, "/flows", Some(&body)).await?;
        Ok(wire::decode_flow(&response)?)
    }

    /// Update a stored flow with its metadata and the current graph
    pub async fn update(&self, id: &str, flow: &Flow, graph: &FlowGraph) -> Result<Flow, ApiError> {
        let name = flow.name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("flow name must not be empty".to_string()));
        }

        let trigger_mode = flow.trigger_mode.as_deref().unwrap_or("webhook");
        let body = wire::encode_flow_request(name, trigger_mode, graph);
        let response = self
            .request(Method::PUT, &format!("/flows/{id}"), Some(&body))
            .await?;
        Ok(wire::decode_flow(&response)?)
    }

    /// Persist the current graph without touching the flow's metadata.
    ///
    /// The stored record is re-read first so the write carries the flow's
    /// real name; a save must never overwrite it with a placeholder.
    pub async fn save(&self, id: &str, graph: &FlowGraph) -> Result<Flow, ApiError> {
        let current = self.get(id).await?;
        self.update(id, &current, graph).await
    }

    /// Delete a flow
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, &format!("/flows/{id}"), None)
            .await?;
        Ok(())
    }

    /// Start an execution
    pub async fn execute(
        &self,
        id: &str,
        input: Option<Value>,
    ) -> Result<ExecutionHandle, ApiError> {
        let body = serde_json::json!({ "input": input });
        let response = self
            .request(Method::POST, &format!("/flows/{id}/execute"), Some(&body))
            .await?;
        Ok(wire::decode_execution_handle(&response)?)
    }

    /// Poll an execution's status
    pub async fn execution_status(
        &self,
        id: &str,
        execution_id: &str,
    ) -> Result<ExecutionStatus, ApiError> {
        let response = self
            .request(
                Method::GET,
                &format!("/flows/{id}/executions/{execution_id}"),
                None,
            )
            .await?;
        Ok(wire::decode_execution_status(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Network behavior is exercised against a real backend; here we pin the
    // pre-flight guarantees that must hold without one.

    fn offline_client() -> FlowClient {
        let config = ClientConfig::new("http://127.0.0.1:1");
        let session = SessionHandle::new(&config).unwrap();
        FlowClient::new(&config, session).unwrap()
    }

    #[tokio::test]
    async fn test_create_validates_name_before_network() {
        let client = offline_client();
        let draft = FlowDraft {
            name: "   ".to_string(),
            ..FlowDraft::default()
        };
        let err = client.create(&draft, &FlowGraph::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_signed_out_call_short_circuits() {
        // No session: the call must fail as unauthenticated, not as a
        // network error from the unroutable base URL.
        let client = offline_client();
        let err = client.list().await.unwrap_err();
        assert!(err.is_unauthenticated());
    }
}
