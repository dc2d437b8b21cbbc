use rolemap_core::{ReconcileRequest, ReconciliationResult, RoleRef};
use std::sync::Arc;
use tracing::{debug, info};

use crate::diff::compute_mutations;
use crate::directory::DirectoryClient;
use crate::error::ReconcileError;
use crate::executor::MutationExecutor;
use crate::fetcher::RoleSetFetcher;
use crate::report::ResultReporter;
use crate::resolver::IdentifierResolver;

/// Runs one reconciliation end to end:
/// resolve → fetch → diff → apply (or preview) → report.
///
/// Any failure before the apply step aborts the run with no mutation issued.
pub struct Reconciler {
    directory: Arc<dyn DirectoryClient>,
}

impl Reconciler {
    pub fn new(directory: Arc<dyn DirectoryClient>) -> Self {
        Self { directory }
    }

    #[tracing::instrument(
        name = "reconcile",
        skip_all,
        fields(realm = %request.realm, intent = %request.intent, dry_run = request.dry_run)
    )]
    pub async fn reconcile(
        &self,
        request: &ReconcileRequest,
    ) -> Result<ReconciliationResult, ReconcileError> {
        // Cheap validation first: nothing below runs on malformed input.
        request.group.validate()?;
        if let Some(client) = &request.client {
            client.validate()?;
        }
        let roles = request
            .roles
            .as_deref()
            .map(RoleRef::from_specs)
            .transpose()?;

        let directory = self.directory.as_ref();
        let realm = request.realm.as_str();

        let resolver = IdentifierResolver::new(directory, realm);
        let group = resolver.resolve_group(&request.group).await?;
        let client = resolver.resolve_client(request.client.as_ref()).await?;
        let client_id = client.as_ref().map(|c| c.id.as_str());

        let Some(roles) = roles else {
            info!(group_id = %group.id, "No roles specified");
            return Ok(ResultReporter::nothing_specified());
        };

        let desired = resolver
            .resolve_roles(&group, client.as_ref(), &roles)
            .await?;

        let sets = RoleSetFetcher::new(directory, realm)
            .fetch(&group.id, client_id)
            .await?;

        let mutations = compute_mutations(&desired, request.intent, &sets);
        debug!(
            group_id = %group.id,
            desired = desired.len(),
            mutations = mutations.len(),
            "Computed role mapping diff"
        );

        let outcome = MutationExecutor::new(directory, realm)
            .execute(
                &group.id,
                client_id,
                &mutations,
                request.intent,
                request.dry_run,
            )
            .await?;

        let result = ResultReporter::new(&group, request.intent, request.want_diff).report(
            roles,
            &desired,
            sets.assigned,
            mutations,
            outcome,
        );
        info!(changed = result.changed, "{}", result.message);

        Ok(result)
    }
}
