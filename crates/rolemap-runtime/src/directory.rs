use async_trait::async_trait;
use rolemap_core::{Group, ResolvedRole};

/// Lookup and mutation primitives the reconciler needs from the directory service.
///
/// `client` arguments are always the directory's internal client id, never the
/// human-facing `clientId`. Lookups return `Ok(None)` when nothing matches;
/// `Err` is reserved for transport/auth/permission failures.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn find_group_by_name(&self, name: &str, realm: &str) -> anyhow::Result<Option<Group>>;

    /// Translate a `clientId` into the internal client id.
    async fn find_client_by_client_id(
        &self,
        client_id: &str,
        realm: &str,
    ) -> anyhow::Result<Option<String>>;

    async fn find_realm_role_by_name(
        &self,
        name: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>>;

    async fn find_client_role_by_name(
        &self,
        client: &str,
        name: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>>;

    /// Find a realm role currently mapped to the group, by role id.
    async fn find_realm_group_role_mapping_by_id(
        &self,
        group_id: &str,
        role_id: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>>;

    /// Find a client role currently mapped to the group, by role id.
    async fn find_client_group_role_mapping_by_id(
        &self,
        group_id: &str,
        client: &str,
        role_id: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>>;

    async fn list_available_realm_role_mappings(
        &self,
        group_id: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>>;

    /// Effective realm roles of the group, composites expanded.
    async fn list_assigned_realm_role_mappings(
        &self,
        group_id: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>>;

    async fn list_available_client_role_mappings(
        &self,
        group_id: &str,
        client: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>>;

    /// Effective client roles of the group, composites expanded.
    async fn list_assigned_client_role_mappings(
        &self,
        group_id: &str,
        client: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>>;

    /// Map all `roles` to the group in one call.
    async fn add_group_role_mappings(
        &self,
        group_id: &str,
        client: Option<&str>,
        roles: &[ResolvedRole],
        realm: &str,
    ) -> anyhow::Result<()>;

    /// Unmap all `roles` from the group in one call.
    async fn remove_group_role_mappings(
        &self,
        group_id: &str,
        client: Option<&str>,
        roles: &[ResolvedRole],
        realm: &str,
    ) -> anyhow::Result<()>;
}
