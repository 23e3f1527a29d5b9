// SPDX-License-Identifier: MIT OR Apache-2.0
//! Credential lifecycle: login, lazy token refresh, logout.
//!
//! The session is an explicit handle passed into [`crate::FlowClient`], not
//! ambient state, so the token lifecycle is testable in isolation. Every
//! authenticated call asks the handle for a bearer value; an expired token is
//! refreshed lazily, with overlapping triggers coalesced into a single
//! in-flight refresh.

use crate::config::ClientConfig;
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The authenticated user, as reported by the identity flow
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    /// Identity-provider user id
    pub id: String,
    /// Login name
    pub username: String,
    /// Email address
    pub email: String,
    /// Whether the account is enabled
    #[serde(default)]
    pub enabled: bool,
    /// Role memberships, used for role-gated views
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Token triple held for the signed-in user
#[derive(Debug, Clone)]
struct TokenSet {
    access_token: String,
    refresh_token: String,
    token_type: String,
    /// Milliseconds since the epoch; the token is invalid past this instant
    expires_at_ms: i64,
}

impl TokenSet {
    fn bearer(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[derive(Debug, Clone)]
struct SessionState {
    tokens: TokenSet,
    user: UserProfile,
}

/// Whether a token with this expiry is past its lifetime
fn token_expired(expires_at_ms: i64, now_ms: i64) -> bool {
    now_ms > expires_at_ms
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Wire shape of the login/refresh response body
#[derive(Debug, Deserialize)]
struct AuthPayload {
    user: UserProfile,
    access_token: String,
    refresh_token: String,
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<String>,
}

impl AuthPayload {
    fn into_state(self, received_at_ms: i64) -> SessionState {
        // Prefer the absolute expiry; fall back to the relative lifetime
        let expires_at_ms = self
            .expires_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
            .unwrap_or_else(|| received_at_ms + self.expires_in.unwrap_or(0) * 1000);

        SessionState {
            tokens: TokenSet {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                token_type: self.token_type,
                expires_at_ms,
            },
            user: self.user,
        }
    }
}

fn parse_auth_response(value: &Value, received_at_ms: i64) -> Result<SessionState, ApiError> {
    let inner = match value {
        Value::Object(map) if map.contains_key("success") => {
            map.get("data").unwrap_or(&Value::Null)
        }
        other => other,
    };
    let payload: AuthPayload = serde_json::from_value(inner.clone())
        .map_err(|e| ApiError::Unauthenticated(format!("malformed auth response: {e}")))?;
    Ok(payload.into_state(received_at_ms))
}

struct SessionInner {
    http: reqwest::Client,
    base_url: String,
    state: RwLock<Option<SessionState>>,
    /// Serializes refreshes so overlapping triggers coalesce
    refresh_gate: tokio::sync::Mutex<()>,
}

/// Shared handle to the current session
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    /// Create a signed-out session against a backend origin
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                http,
                base_url: config.base_url.clone(),
                state: RwLock::new(None),
                refresh_gate: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// Exchange credentials for a token set
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, ApiError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "username and password are required".to_string(),
            ));
        }

        let url = format!("{}/auth/login", self.inner.base_url);
        debug!("POST {url}");
        let response = self
            .inner
            .http
            .post(&url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthenticated("invalid credentials".to_string()));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Server { status, message });
        }

        let body: Value = response.json().await?;
        let state = parse_auth_response(&body, now_ms())?;
        let user = state.user.clone();
        *self.inner.state.write() = Some(state);
        debug!(username = %user.username, "signed in");
        Ok(user)
    }

    /// Revoke the refresh token and clear local state.
    ///
    /// Local state is cleared even when the revocation call fails; a dead
    /// backend must not keep the user signed in.
    pub async fn logout(&self) {
        let refresh_token = {
            let state = self.inner.state.read();
            state.as_ref().map(|s| s.tokens.refresh_token.clone())
        };

        if let Some(refresh_token) = refresh_token {
            let url = format!("{}/auth/logout", self.inner.base_url);
            let result = self
                .inner
                .http
                .post(&url)
                .json(&json!({ "refresh_token": refresh_token }))
                .send()
                .await;
            if let Err(e) = result {
                warn!("logout call failed: {e}");
            }
        }
        self.invalidate();
    }

    /// Drop the session immediately
    pub fn invalidate(&self) {
        *self.inner.state.write() = None;
    }

    /// Whether a user is currently signed in
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.read().is_some()
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.read().as_ref().map(|s| s.user.clone())
    }

    /// Whether the signed-in user holds a role
    pub fn has_role(&self, role: &str) -> bool {
        self.inner
            .state
            .read()
            .as_ref()
            .is_some_and(|s| s.user.roles.iter().any(|r| r == role))
    }

    /// The `Authorization` header value for the current token.
    ///
    /// Short-circuits to [`ApiError::Unauthenticated`] without touching the
    /// network when no session is held, or when the token is expired with no
    /// usable refresh path. An expired token with a refresh token triggers
    /// one coalesced refresh; on refresh failure the session is invalidated.
    pub async fn bearer(&self) -> Result<String, ApiError> {
        enum Fast {
            Live(String),
            NotSignedIn,
            ExpiredNoRefresh,
            NeedRefresh,
        }

        // Fast path decision under the read lock, acted on after release
        let fast = {
            let state = self.inner.state.read();
            match state.as_ref() {
                None => Fast::NotSignedIn,
                Some(s) if !token_expired(s.tokens.expires_at_ms, now_ms()) => {
                    Fast::Live(s.tokens.bearer())
                }
                Some(s) if s.tokens.refresh_token.is_empty() => Fast::ExpiredNoRefresh,
                Some(_) => Fast::NeedRefresh,
            }
        };
        match fast {
            Fast::Live(bearer) => return Ok(bearer),
            Fast::NotSignedIn => {
                return Err(ApiError::Unauthenticated("not signed in".to_string()));
            }
            Fast::ExpiredNoRefresh => {
                self.invalidate();
                return Err(ApiError::Unauthenticated("session expired".to_string()));
            }
            Fast::NeedRefresh => {}
        }

        // Expired: coalesce concurrent refreshes behind one gate
        let _gate = self.inner.refresh_gate.lock().await;

        // A racer may have refreshed while we waited for the gate
        let refresh_token = {
            let state = self.inner.state.read();
            let Some(state) = state.as_ref() else {
                return Err(ApiError::Unauthenticated("session expired".to_string()));
            };
            if !token_expired(state.tokens.expires_at_ms, now_ms()) {
                return Ok(state.tokens.bearer());
            }
            state.tokens.refresh_token.clone()
        };

        match self.refresh(&refresh_token).await {
            Ok(state) => {
                let bearer = state.tokens.bearer();
                *self.inner.state.write() = Some(state);
                debug!("access token refreshed");
                Ok(bearer)
            }
            Err(e) => {
                warn!("token refresh failed: {e}");
                self.invalidate();
                Err(ApiError::Unauthenticated(format!("token refresh failed: {e}")))
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SessionState, ApiError> {
        let url = format!("{}/auth/refresh", self.inner.base_url);
        debug!("POST {url}");
        let response = self
            .inner
            .http
            .post(&url)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Server { status, message });
        }

        let body: Value = response.json().await?;
        parse_auth_response(&body, now_ms())
    }

    #[cfg(test)]
    fn with_state(config: &ClientConfig, state: SessionState) -> Self {
        let handle = Self::new(config).expect("client build");
        *handle.inner.state.write() = Some(state);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserProfile {
        UserProfile {
            id: "u-1".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            enabled: true,
            roles: vec!["editor".to_string(), "admin".to_string()],
        }
    }

    fn state_with_expiry(expires_at_ms: i64, refresh_token: &str) -> SessionState {
        SessionState {
            tokens: TokenSet {
                access_token: "access".to_string(),
                refresh_token: refresh_token.to_string(),
                token_type: "Bearer".to_string(),
                expires_at_ms,
            },
            user: sample_user(),
        }
    }

    #[test]
    fn test_token_expiry_boundary() {
        assert!(!token_expired(1_000, 1_000));
        assert!(token_expired(1_000, 1_001));
        assert!(!token_expired(2_000, 1_999));
    }

    #[test]
    fn test_parse_auth_response_enveloped() {
        let body = json!({
            "success": true,
            "message": "ok",
            "data": {
                "user": {
                    "id": "u-1",
                    "username": "ada",
                    "email": "ada@example.com",
                    "enabled": true,
                    "roles": ["admin"]
                },
                "access_token": "at",
                "refresh_token": "rt",
                "token_type": "Bearer",
                "expires_in": 300,
                "expires_at": "2025-06-01T12:05:00Z"
            }
        });

        let state = parse_auth_response(&body, 0).unwrap();
        assert_eq!(state.user.username, "ada");
        assert_eq!(state.tokens.bearer(), "Bearer at");
        // Absolute expiry wins over the relative lifetime
        let expected = DateTime::parse_from_rfc3339("2025-06-01T12:05:00Z")
            .unwrap()
            .timestamp_millis();
        assert_eq!(state.tokens.expires_at_ms, expected);
    }

    #[test]
    fn test_parse_auth_response_relative_expiry() {
        let body = json!({
            "user": { "id": "u", "username": "n", "email": "e" },
            "access_token": "at",
            "refresh_token": "rt",
            "token_type": "Bearer",
            "expires_in": 60
        });
        let state = parse_auth_response(&body, 10_000).unwrap();
        assert_eq!(state.tokens.expires_at_ms, 70_000);
    }

    #[test]
    fn test_parse_auth_response_malformed() {
        let err = parse_auth_response(&json!({ "success": true, "data": null }), 0).unwrap_err();
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_bearer_short_circuits_when_signed_out() {
        let handle = SessionHandle::new(&ClientConfig::new("http://127.0.0.1:1")).unwrap();
        let err = handle.bearer().await.unwrap_err();
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_bearer_short_circuits_on_expired_token_without_refresh_path() {
        // Expired long ago, no refresh token: the call must fail without any
        // network attempt (the base URL points nowhere routable) and the
        // session must be cleared.
        let config = ClientConfig::new("http://127.0.0.1:1");
        let handle = SessionHandle::with_state(&config, state_with_expiry(1_000, ""));

        let err = handle.bearer().await.unwrap_err();
        assert!(err.is_unauthenticated());
        assert!(!handle.is_authenticated());
    }

    #[tokio::test]
    async fn test_bearer_returns_live_token() {
        let config = ClientConfig::new("http://127.0.0.1:1");
        let future = now_ms() + 60_000;
        let handle = SessionHandle::with_state(&config, state_with_expiry(future, "rt"));

        assert_eq!(handle.bearer().await.unwrap(), "Bearer access");
    }

    #[test]
    fn test_role_membership() {
        let config = ClientConfig::new("http://127.0.0.1:1");
        let handle = SessionHandle::with_state(&config, state_with_expiry(i64::MAX, "rt"));

        assert!(handle.has_role("admin"));
        assert!(!handle.has_role("auditor"));

        handle.invalidate();
        assert!(!handle.has_role("admin"));
        assert!(handle.user().is_none());
    }
}
