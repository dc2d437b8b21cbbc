//! `rolemap apply` and `rolemap plan`.
//!
//! Loads the configuration, applies command-line overrides, runs one
//! reconciliation against Keycloak and prints the result as JSON on stdout.

use anyhow::{Context, Result};
use rolemap_adapter_keycloak::KeycloakAdapter;
use rolemap_core::{ReconcileRequest, ReconciliationIntent, ReconciliationResult, RolemapConfig};
use rolemap_runtime::{DirectoryClient, Reconciler};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Command-line overrides for the request in the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Dry run.
    pub check: bool,
    pub diff: bool,
    pub state: Option<ReconciliationIntent>,
    pub realm: Option<String>,
}

impl ApplyOptions {
    fn apply_to(&self, request: &mut ReconcileRequest) {
        // Flags only ever switch these on.
        request.dry_run |= self.check;
        request.want_diff |= self.diff;
        if let Some(state) = self.state {
            request.intent = state;
        }
        if let Some(realm) = &self.realm {
            request.realm = realm.clone();
        }
    }
}

/// Load the configuration, apply `options` and validate the result.
pub fn load(config_path: &Path, options: &ApplyOptions) -> Result<RolemapConfig> {
    let mut config = RolemapConfig::from_file(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    options.apply_to(&mut config.request);
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;
    Ok(config)
}

pub async fn run(config_path: &Path, options: &ApplyOptions) -> Result<()> {
    let config = load(config_path, options)?;

    let adapter = KeycloakAdapter::new(&config.connection)
        .context("Failed to create Keycloak client")?;
    info!(
        base_url = %adapter.base_url(),
        realm = %config.request.realm,
        dry_run = config.request.dry_run,
        "Reconciling group role mappings"
    );

    let result = execute(Arc::new(adapter), &config.request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

pub async fn execute(
    directory: Arc<dyn DirectoryClient>,
    request: &ReconcileRequest,
) -> Result<ReconciliationResult> {
    Reconciler::new(directory)
        .reconcile(request)
        .await
        .context("Reconciliation failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolemap_runtime::InMemoryDirectory;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
connection:
  base_url: http://localhost:8080
  token: test-token
request:
  group:
    name: developers
  roles:
    - name: role_name1
"#;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn directory() -> Arc<InMemoryDirectory> {
        Arc::new(
            InMemoryDirectory::new()
                .with_group("master", "g1", "developers")
                .with_realm_role("master", "r1", "role_name1")
                .with_mapping("master", "g1", None, "r1")
                .with_group("staging", "g7", "developers")
                .with_realm_role("staging", "r7", "role_name1"),
        )
    }

    #[test]
    fn test_load_without_overrides() {
        let file = config_file(CONFIG);
        let config = load(file.path(), &ApplyOptions::default()).unwrap();
        assert_eq!(config.request.realm, "master");
        assert_eq!(config.request.intent, ReconciliationIntent::Present);
        assert!(!config.request.dry_run);
    }

    #[test]
    fn test_load_applies_overrides() {
        let file = config_file(CONFIG);
        let options = ApplyOptions {
            check: true,
            diff: true,
            state: Some(ReconciliationIntent::Absent),
            realm: Some("staging".to_string()),
        };
        let config = load(file.path(), &options).unwrap();

        assert!(config.request.dry_run);
        assert!(config.request.want_diff);
        assert_eq!(config.request.intent, ReconciliationIntent::Absent);
        assert_eq!(config.request.realm, "staging");
    }

    #[test]
    fn test_load_rejects_empty_realm_override() {
        let file = config_file(CONFIG);
        let options = ApplyOptions {
            realm: Some(String::new()),
            ..Default::default()
        };
        let err = load(file.path(), &options).unwrap_err();
        assert!(format!("{:#}", err).contains("realm"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/rolemap.yaml"), &ApplyOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("Failed to load"));
    }

    #[tokio::test]
    async fn test_execute_reports_noop() {
        let file = config_file(CONFIG);
        let config = load(file.path(), &ApplyOptions::default()).unwrap();

        let result = execute(directory(), &config.request).await.unwrap();

        assert!(!result.changed);
        assert_eq!(
            result.message,
            "Nothing to do, roles [role_name1] are correctly mapped to group developers."
        );
    }

    #[tokio::test]
    async fn test_execute_plan_in_other_realm() {
        let file = config_file(CONFIG);
        let options = ApplyOptions {
            check: true,
            realm: Some("staging".to_string()),
            ..Default::default()
        };
        let config = load(file.path(), &options).unwrap();
        let dir = directory();

        let result = execute(dir.clone(), &config.request).await.unwrap();

        assert!(result.changed);
        assert_eq!(dir.mutation_count(), 0);
        assert_eq!(
            result.message,
            "Roles [role_name1] would be assigned to group developers."
        );
    }

    #[tokio::test]
    async fn test_execute_wraps_failures() {
        let file = config_file(&CONFIG.replace("developers", "nobody"));
        let config = load(file.path(), &ApplyOptions::default()).unwrap();

        let err = execute(directory(), &config.request).await.unwrap_err();

        assert_eq!(err.to_string(), "Reconciliation failed");
        assert!(format!("{:#}", err).contains("group with name 'nobody' not found"));
    }
}
