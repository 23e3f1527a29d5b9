// SPDX-License-Identifier: MIT OR Apache-2.0
//! Client configuration.

use crate::error::ApiError;

/// Environment variable selecting the backend origin
pub const ENV_API_URL: &str = "FLOWSTUDIO_API_URL";

/// Connection settings shared by the flow client and the session
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, without a trailing slash
    pub base_url: String,
}

impl ClientConfig {
    /// Create a config for a backend origin
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Read the backend origin from `FLOWSTUDIO_API_URL`
    pub fn from_env() -> Result<Self, ApiError> {
        match std::env::var(ENV_API_URL) {
            Ok(url) if !url.trim().is_empty() => Ok(Self::new(url.trim())),
            _ => Err(ApiError::Config(format!("{ENV_API_URL} is not set"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = ClientConfig::new("http://localhost:8080/");
        assert_eq!(config.base_url, "http://localhost:8080");
    }
}
