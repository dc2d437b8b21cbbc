//! Directory service connection configuration.
//!
//! Two authentication methods are supported:
//! 1. A bearer `token` (or `token_env`, the name of a variable holding it)
//! 2. The password grant: `auth_realm`, `auth_username` and `auth_password`
//!    (or `auth_password_env`), all three together

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ConfigError;

/// Connection to the directory service admin API.
///
/// `Debug` redacts the password, client secret and token.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the directory service, e.g. `https://auth.example.com/auth`.
    pub base_url: String,

    /// Realm used to obtain the token (not the realm being reconciled).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_realm: Option<String>,

    /// OpenID Connect client used for the password grant.
    #[serde(default = "default_auth_client_id")]
    pub auth_client_id: String,

    /// Client secret, for confidential clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_client_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_password: Option<String>,

    /// Environment variable containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_password_env: Option<String>,

    /// Pre-acquired bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable containing the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// HTTP request timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Verify TLS certificates.
    #[serde(default = "default_true")]
    pub validate_certs: bool,
}

impl ConnectionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_realm: None,
            auth_client_id: default_auth_client_id(),
            auth_client_secret: None,
            auth_username: None,
            auth_password: None,
            auth_password_env: None,
            token: None,
            token_env: None,
            timeout_seconds: default_timeout_seconds(),
            validate_certs: true,
        }
    }

    /// Resolve the configured credentials, reading env indirections.
    ///
    /// A direct value takes precedence over its `_env` counterpart.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if let Some(token) = self.token.clone().or_else(|| read_env(&self.token_env)) {
            return Ok(Credentials::Token(token));
        }

        let password = self
            .auth_password
            .clone()
            .or_else(|| read_env(&self.auth_password_env));

        match (&self.auth_realm, &self.auth_username, password) {
            (Some(realm), Some(username), Some(password)) => Ok(Credentials::Password {
                realm: realm.clone(),
                client_id: self.auth_client_id.clone(),
                client_secret: self.auth_client_secret.clone(),
                username: username.clone(),
                password,
            }),
            (None, None, None) => Err(ConfigError::Config(
                "one of `token` or `auth_realm`/`auth_username`/`auth_password` is required"
                    .to_string(),
            )),
            _ => Err(ConfigError::Config(
                "`auth_realm`, `auth_username` and `auth_password` must be given together"
                    .to_string(),
            )),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("base_url", &self.base_url)
            .field("auth_realm", &self.auth_realm)
            .field("auth_client_id", &self.auth_client_id)
            .field("auth_client_secret", &redacted(&self.auth_client_secret))
            .field("auth_username", &self.auth_username)
            .field("auth_password", &redacted(&self.auth_password))
            .field("auth_password_env", &self.auth_password_env)
            .field("token", &redacted(&self.token))
            .field("token_env", &self.token_env)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("validate_certs", &self.validate_certs)
            .finish()
    }
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

/// Credentials used to authenticate against the admin API.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    Password {
        realm: String,
        client_id: String,
        client_secret: Option<String>,
        username: String,
        password: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
            Credentials::Password {
                realm,
                client_id,
                username,
                ..
            } => f
                .debug_struct("Password")
                .field("realm", realm)
                .field("client_id", client_id)
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

fn read_env(name: &Option<String>) -> Option<String> {
    name.as_deref()
        .and_then(|n| std::env::var(n).ok())
        .filter(|v| !v.is_empty())
}

fn default_auth_client_id() -> String {
    "admin-cli".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
