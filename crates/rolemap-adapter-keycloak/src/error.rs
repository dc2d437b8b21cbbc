use rolemap_core::ConfigError;
use thiserror::Error;

/// Errors raised by the Keycloak adapter.
///
/// At the `DirectoryClient` seam these are wrapped in `anyhow::Error`.
#[derive(Debug, Error)]
pub enum KeycloakError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token request to {url} failed with status {status}: {detail}")]
    Auth {
        url: String,
        status: u16,
        detail: String,
    },

    #[error("{method} {url} failed with status {status}: {detail}")]
    Status {
        method: String,
        url: String,
        status: u16,
        detail: String,
    },
}

impl KeycloakError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            KeycloakError::Auth { status, .. } | KeycloakError::Status { status, .. } => {
                Some(*status)
            }
            KeycloakError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Short description of an error response body.
///
/// Keycloak answers with `{"error": ..., "error_description": ...}` on the
/// token endpoint and `{"errorMessage": ...}` on the admin API.
pub(crate) fn describe_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["errorMessage", "error_description", "error"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "<empty body>".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
