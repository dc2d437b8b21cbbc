use rolemap_core::{ResolvedRole, RoleComparisonSets};
use tracing::debug;

use crate::directory::DirectoryClient;
use crate::error::ReconcileError;

/// Reads the available and assigned role sets, realm or client scoped.
pub struct RoleSetFetcher<'a> {
    directory: &'a dyn DirectoryClient,
    realm: &'a str,
}

impl<'a> RoleSetFetcher<'a> {
    pub fn new(directory: &'a dyn DirectoryClient, realm: &'a str) -> Self {
        Self { directory, realm }
    }

    /// Fetch both comparison sets, unfiltered.
    pub async fn fetch(
        &self,
        group_id: &str,
        client: Option<&str>,
    ) -> Result<RoleComparisonSets, ReconcileError> {
        let available = match client {
            Some(cid) => {
                self.directory
                    .list_available_client_role_mappings(group_id, cid, self.realm)
                    .await?
            }
            None => {
                self.directory
                    .list_available_realm_role_mappings(group_id, self.realm)
                    .await?
            }
        };
        let assigned = self.assigned(group_id, client).await?;

        debug!(
            group_id = %group_id,
            client = client.unwrap_or("-"),
            available = available.len(),
            assigned = assigned.len(),
            "Fetched role comparison sets"
        );

        Ok(RoleComparisonSets {
            available,
            assigned,
        })
    }

    /// Effective (composite) mappings of the group.
    pub async fn assigned(
        &self,
        group_id: &str,
        client: Option<&str>,
    ) -> Result<Vec<ResolvedRole>, ReconcileError> {
        let roles = match client {
            Some(cid) => {
                self.directory
                    .list_assigned_client_role_mappings(group_id, cid, self.realm)
                    .await?
            }
            None => {
                self.directory
                    .list_assigned_realm_role_mappings(group_id, self.realm)
                    .await?
            }
        };
        Ok(roles)
    }
}
