use serde::{Deserialize, Serialize};
use std::fmt;

// Configuration types shared across all rolemap crates
pub mod config;

pub use config::{ConfigError, ConnectionConfig, Credentials, RolemapConfig};

/// Reference to the group whose role mappings are reconciled.
///
/// At least one of `id` / `name` must be set. Supplying `id` saves a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl GroupRef {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    pub fn validate(&self) -> Result<(), ReferenceError> {
        if self.id.is_none() && self.name.is_none() {
            return Err(ReferenceError::EmptyGroup);
        }
        Ok(())
    }
}

/// Reference to the client whose roles are mapped.
///
/// `client_id` is the human-facing client name (e.g. "admin-cli"), `id` is the
/// internal identifier assigned by the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl ClientRef {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            client_id: None,
        }
    }

    pub fn by_client_id(client_id: impl Into<String>) -> Self {
        Self {
            id: None,
            client_id: Some(client_id.into()),
        }
    }

    pub fn validate(&self) -> Result<(), ReferenceError> {
        if self.id.is_none() && self.client_id.is_none() {
            return Err(ReferenceError::EmptyClient);
        }
        Ok(())
    }
}

/// Caller-facing shape of a role reference, as read from YAML/JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RoleSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }
}

/// A role reference with at least one identifying field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoleSpec", into = "RoleSpec")]
pub enum RoleRef {
    /// Only the name is known; the id is looked up in the role catalog.
    ByName(String),
    /// Only the id is known; the name is recovered from the group's mappings.
    ById(String),
    /// Both are known; no lookup needed.
    Known(ResolvedRole),
}

impl RoleRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            RoleRef::ByName(name) => Some(name),
            RoleRef::ById(_) => None,
            RoleRef::Known(role) => Some(&role.name),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            RoleRef::ByName(_) => None,
            RoleRef::ById(id) => Some(id),
            RoleRef::Known(role) => Some(&role.id),
        }
    }

    /// Convert a list of specs, reporting the first empty entry by position.
    pub fn from_specs(specs: &[RoleSpec]) -> Result<Vec<RoleRef>, ReferenceError> {
        specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                RoleRef::try_from(spec.clone()).map_err(|_| ReferenceError::EmptyRole { index })
            })
            .collect()
    }
}

impl TryFrom<RoleSpec> for RoleRef {
    type Error = ReferenceError;

    fn try_from(spec: RoleSpec) -> Result<Self, Self::Error> {
        match (spec.id, spec.name) {
            (Some(id), Some(name)) => Ok(RoleRef::Known(ResolvedRole { id, name })),
            (Some(id), None) => Ok(RoleRef::ById(id)),
            (None, Some(name)) => Ok(RoleRef::ByName(name)),
            (None, None) => Err(ReferenceError::EmptyRole { index: 0 }),
        }
    }
}

impl From<RoleRef> for RoleSpec {
    fn from(role: RoleRef) -> Self {
        match role {
            RoleRef::ByName(name) => RoleSpec {
                id: None,
                name: Some(name),
            },
            RoleRef::ById(id) => RoleSpec {
                id: Some(id),
                name: None,
            },
            RoleRef::Known(role) => RoleSpec {
                id: Some(role.id),
                name: Some(role.name),
            },
        }
    }
}

impl fmt::Display for RoleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleRef::ByName(name) => write!(f, "{}", name),
            RoleRef::ById(id) => write!(f, "id:{}", id),
            RoleRef::Known(role) => write!(f, "{}", role.name),
        }
    }
}

/// Fully resolved role: both fields populated.
///
/// Extra attributes in directory payloads (description, composite, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedRole {
    pub id: String,
    pub name: String,
}

impl ResolvedRole {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Group as returned by a name lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

/// Desired state of the listed roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationIntent {
    /// Ensure the roles are assigned.
    #[default]
    Present,
    /// Ensure the roles are not assigned.
    Absent,
}

impl fmt::Display for ReconciliationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationIntent::Present => write!(f, "present"),
            ReconciliationIntent::Absent => write!(f, "absent"),
        }
    }
}

impl std::str::FromStr for ReconciliationIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(ReconciliationIntent::Present),
            "absent" => Ok(ReconciliationIntent::Absent),
            other => Err(format!(
                "unknown state '{}' (expected 'present' or 'absent')",
                other
            )),
        }
    }
}

/// The two sets the diff is computed against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleComparisonSets {
    /// Roles that could be assigned in the current scope.
    pub available: Vec<ResolvedRole>,
    /// Roles currently granted (effective, including composites).
    pub assigned: Vec<ResolvedRole>,
}

/// One reconciliation request, built once at the boundary and passed down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    #[serde(default = "default_realm")]
    pub realm: String,

    #[serde(default, alias = "state")]
    pub intent: ReconciliationIntent,

    pub group: GroupRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientRef>,

    /// `None` means "no roles specified" and yields a no-op.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<RoleSpec>>,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub want_diff: bool,
}

impl ReconcileRequest {
    pub fn new(group: GroupRef) -> Self {
        Self {
            realm: default_realm(),
            intent: ReconciliationIntent::default(),
            group,
            client: None,
            roles: None,
            dry_run: false,
            want_diff: false,
        }
    }

    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    pub fn intent(mut self, intent: ReconciliationIntent) -> Self {
        self.intent = intent;
        self
    }

    pub fn client(mut self, client: ClientRef) -> Self {
        self.client = Some(client);
        self
    }

    pub fn roles(mut self, roles: Vec<RoleSpec>) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn want_diff(mut self, want_diff: bool) -> Self {
        self.want_diff = want_diff;
        self
    }
}

/// Before/after payload attached when a diff was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationDiff {
    pub before: Vec<ResolvedRole>,
    pub after: Vec<ResolvedRole>,
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub changed: bool,
    #[serde(rename = "msg")]
    pub message: String,
    pub proposed: Vec<RoleRef>,
    pub existing: Vec<ResolvedRole>,
    pub end_state: Vec<ResolvedRole>,
    pub mutated: Vec<ResolvedRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<ReconciliationDiff>,
}

/// A reference that does not identify anything.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("either the group `name` or `id` has to be specified")]
    EmptyGroup,

    #[error("either the client `client_id` or `id` has to be specified")]
    EmptyClient,

    #[error("either `name` or `id` has to be specified on each role (role #{index})")]
    EmptyRole { index: usize },
}

fn default_realm() -> String {
    "master".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_spec_converts_to_matching_variant() {
        assert_eq!(
            RoleRef::try_from(RoleSpec::named("reader")).unwrap(),
            RoleRef::ByName("reader".to_string())
        );
        assert_eq!(
            RoleRef::try_from(RoleSpec::with_id("r-1")).unwrap(),
            RoleRef::ById("r-1".to_string())
        );

        let both = RoleSpec {
            id: Some("r-1".to_string()),
            name: Some("reader".to_string()),
        };
        assert_eq!(
            RoleRef::try_from(both).unwrap(),
            RoleRef::Known(ResolvedRole::new("r-1", "reader"))
        );
    }

    #[test]
    fn empty_role_spec_reports_position() {
        let specs = vec![RoleSpec::named("a"), RoleSpec::default(), RoleSpec::default()];
        let err = RoleRef::from_specs(&specs).unwrap_err();
        assert_eq!(err, ReferenceError::EmptyRole { index: 1 });
    }

    #[test]
    fn role_ref_serializes_as_role_spec() {
        let json = serde_json::to_value(RoleRef::ByName("reader".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "reader" }));

        let back: RoleRef = serde_json::from_value(serde_json::json!({ "id": "r-9" })).unwrap();
        assert_eq!(back, RoleRef::ById("r-9".to_string()));

        assert!(serde_json::from_value::<RoleRef>(serde_json::json!({})).is_err());
    }

    #[test]
    fn group_and_client_refs_require_a_field() {
        assert_eq!(GroupRef::default().validate(), Err(ReferenceError::EmptyGroup));
        assert!(GroupRef::by_name("admins").validate().is_ok());
        assert_eq!(ClientRef::default().validate(), Err(ReferenceError::EmptyClient));
        assert!(ClientRef::by_client_id("portal").validate().is_ok());
    }

    #[test]
    fn request_defaults_from_yaml() {
        let yaml = r#"
group:
  name: developers
roles:
  - name: role_name1
"#;
        let request: ReconcileRequest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(request.realm, "master");
        assert_eq!(request.intent, ReconciliationIntent::Present);
        assert!(request.client.is_none());
        assert!(!request.dry_run);
        assert_eq!(request.roles, Some(vec![RoleSpec::named("role_name1")]));
    }

    #[test]
    fn request_accepts_state_alias() {
        let yaml = r#"
state: absent
group:
  id: g1
"#;
        let request: ReconcileRequest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(request.intent, ReconciliationIntent::Absent);
        assert!(request.roles.is_none());
    }

    #[test]
    fn intent_parses_from_str() {
        assert_eq!(
            "absent".parse::<ReconciliationIntent>(),
            Ok(ReconciliationIntent::Absent)
        );
        assert!("gone".parse::<ReconciliationIntent>().is_err());
    }
}
