//! Error types for the reconciliation engine.

use rolemap_core::ReferenceError;
use std::fmt;
use thiserror::Error;

/// Errors that abort a reconciliation. None of them leave a partial mutation behind.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A reference or setting that cannot identify anything.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A lookup returned nothing.
    #[error("{kind} with {reference} not found in {scope}")]
    NotFound {
        kind: EntityKind,
        reference: Reference,
        scope: Scope,
    },

    /// The directory service itself failed.
    #[error("directory service failure: {0:#}")]
    Upstream(#[from] anyhow::Error),
}

impl ReconcileError {
    pub fn not_found(kind: EntityKind, reference: Reference, scope: Scope) -> Self {
        Self::NotFound {
            kind,
            reference,
            scope,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ReconcileError::NotFound { .. })
    }
}

impl From<ReferenceError> for ReconcileError {
    fn from(err: ReferenceError) -> Self {
        ReconcileError::InvalidInput(err.to_string())
    }
}

/// What kind of entity a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Group,
    Client,
    Role,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Group => write!(f, "group"),
            EntityKind::Client => write!(f, "client"),
            EntityKind::Role => write!(f, "role"),
        }
    }
}

/// The identifier that was searched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Name(String),
    Id(String),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Name(name) => write!(f, "name '{}'", name),
            Reference::Id(id) => write!(f, "id '{}'", id),
        }
    }
}

/// Where a lookup was performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Realm { realm: String },
    /// `client` is the human-facing client id when known, the internal id otherwise.
    Client { client: String, realm: String },
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Realm { realm } => write!(f, "realm '{}'", realm),
            Scope::Client { client, realm } => {
                write!(f, "client '{}' of realm '{}'", client, realm)
            }
        }
    }
}
