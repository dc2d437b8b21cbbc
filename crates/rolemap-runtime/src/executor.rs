use rolemap_core::{ReconciliationIntent, ResolvedRole};
use tracing::{info, warn};

use crate::directory::DirectoryClient;
use crate::error::ReconcileError;
use crate::fetcher::RoleSetFetcher;

/// What the executor did with a mutation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Empty mutation list, nothing to apply.
    NoOp,
    /// Mutations computed but not applied.
    DryRun,
    /// Mutations applied; `end_state` is the re-fetched assigned set.
    Applied { end_state: Vec<ResolvedRole> },
}

impl ExecutionOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, ExecutionOutcome::NoOp)
    }
}

/// The only component that issues mutating directory calls.
pub struct MutationExecutor<'a> {
    directory: &'a dyn DirectoryClient,
    realm: &'a str,
}

impl<'a> MutationExecutor<'a> {
    pub fn new(directory: &'a dyn DirectoryClient, realm: &'a str) -> Self {
        Self { directory, realm }
    }

    /// Apply `mutations` as a single batched call, unless empty or `dry_run`.
    pub async fn execute(
        &self,
        group_id: &str,
        client: Option<&str>,
        mutations: &[ResolvedRole],
        intent: ReconciliationIntent,
        dry_run: bool,
    ) -> Result<ExecutionOutcome, ReconcileError> {
        if mutations.is_empty() {
            return Ok(ExecutionOutcome::NoOp);
        }

        if dry_run {
            warn!(
                group_id = %group_id,
                intent = %intent,
                count = mutations.len(),
                "Dry run: role mappings not applied"
            );
            return Ok(ExecutionOutcome::DryRun);
        }

        match intent {
            ReconciliationIntent::Present => {
                self.directory
                    .add_group_role_mappings(group_id, client, mutations, self.realm)
                    .await?
            }
            ReconciliationIntent::Absent => {
                self.directory
                    .remove_group_role_mappings(group_id, client, mutations, self.realm)
                    .await?
            }
        }
        info!(
            group_id = %group_id,
            intent = %intent,
            count = mutations.len(),
            "Role mappings applied"
        );

        let end_state = RoleSetFetcher::new(self.directory, self.realm)
            .assigned(group_id, client)
            .await?;

        Ok(ExecutionOutcome::Applied { end_state })
    }
}
