// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the persistence and session layer.

use crate::wire::WireError;
use thiserror::Error;

/// Errors surfaced by [`crate::FlowClient`] and [`crate::SessionHandle`].
///
/// Pages map these onto user-visible state: `Transport` and `Server` become
/// retryable banners, `Unauthenticated` forces a sign-out, `NotFound` renders
/// an empty state, `Decode` a generic load failure, `Validation` an inline
/// form error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed to complete
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Token missing, expired without a refresh path, or refresh failed
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    /// The requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend payload matched no known normalization shape
    #[error("decode error: {0}")]
    Decode(#[from] WireError),

    /// Rejected before any network call
    #[error("validation error: {0}")]
    Validation(String),

    /// The backend answered with a non-success status
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Missing or unusable configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether this error should force a sign-out
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated(_))
    }
}
