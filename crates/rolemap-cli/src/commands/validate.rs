//! `rolemap validate`: offline configuration check.

use anyhow::{Context, Result};
use rolemap_adapter_keycloak::KeycloakAdapter;
use rolemap_core::{Credentials, RoleRef, RolemapConfig};
use std::path::Path;

use super::apply::{ApplyOptions, load};

/// What a valid configuration will do, for the summary line.
#[derive(Debug)]
pub struct ValidationSummary {
    pub realm: String,
    pub group: String,
    pub client: Option<String>,
    pub roles: Option<usize>,
    pub auth: &'static str,
}

impl std::fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "realm '{}', group {}", self.realm, self.group)?;
        if let Some(client) = &self.client {
            write!(f, ", client {}", client)?;
        }
        match self.roles {
            Some(n) => write!(f, ", {} role(s)", n)?,
            None => write!(f, ", no roles")?,
        }
        write!(f, ", {} auth", self.auth)
    }
}

pub fn check(config_path: &Path) -> Result<ValidationSummary> {
    let config = load(config_path, &ApplyOptions::default())?;
    summarize(&config)
}

fn summarize(config: &RolemapConfig) -> Result<ValidationSummary> {
    let request = &config.request;

    let roles = request
        .roles
        .as_deref()
        .map(RoleRef::from_specs)
        .transpose()
        .context("Invalid role list")?;

    // Builds the HTTP client and checks the base URL; no request is sent.
    KeycloakAdapter::new(&config.connection).context("Invalid connection settings")?;

    let auth = match config.connection.credentials()? {
        Credentials::Token(_) => "token",
        Credentials::Password { .. } => "password grant",
    };

    let group = describe(request.group.name.as_deref(), request.group.id.as_deref());
    let client = request
        .client
        .as_ref()
        .map(|c| describe(c.client_id.as_deref(), c.id.as_deref()));

    Ok(ValidationSummary {
        realm: request.realm.clone(),
        group,
        client,
        roles: roles.map(|r| r.len()),
        auth,
    })
}

/// Prefer the human-facing name; references are validated on load.
fn describe(name: Option<&str>, id: Option<&str>) -> String {
    match (name, id) {
        (Some(name), _) => format!("'{}'", name),
        (None, Some(id)) => format!("id '{}'", id),
        (None, None) => "<unset>".to_string(),
    }
}

pub fn run(config_path: &Path) -> Result<()> {
    let summary = check(config_path)?;
    println!("Configuration OK: {}", summary);
    Ok(())
}
