//! Configuration types for rolemap.
//!
//! A single YAML file (conventionally `rolemap.yaml`) holds the directory
//! connection and the reconciliation request:
//!
//! ```yaml
//! connection:
//!   base_url: https://auth.example.com/auth
//!   token_env: KEYCLOAK_TOKEN
//! request:
//!   realm: MyCustomRealm
//!   state: present
//!   group:
//!     name: group1
//!   client:
//!     client_id: client1
//!   roles:
//!     - name: role_name1
//!     - id: 3f1c...
//! ```

pub mod connection;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use connection::{ConnectionConfig, Credentials};

use crate::ReconcileRequest;

/// Complete rolemap configuration loaded from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolemapConfig {
    /// Directory service connection.
    pub connection: ConnectionConfig,

    /// The reconciliation to perform.
    pub request: ReconcileRequest,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RolemapConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Check everything that can be checked without contacting the directory.
    ///
    /// Role entries are deliberately not checked here: an empty role entry is
    /// reported by the reconciler itself, before any remote call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.base_url.trim().is_empty() {
            return Err(ConfigError::Config(
                "`connection.base_url` cannot be empty".to_string(),
            ));
        }

        self.connection.credentials()?;

        self.request
            .group
            .validate()
            .map_err(|e| ConfigError::Config(e.to_string()))?;

        if let Some(client) = &self.request.client {
            client
                .validate()
                .map_err(|e| ConfigError::Config(e.to_string()))?;
        }

        if self.request.realm.trim().is_empty() {
            return Err(ConfigError::Config("`request.realm` cannot be empty".to_string()));
        }

        Ok(())
    }
}
