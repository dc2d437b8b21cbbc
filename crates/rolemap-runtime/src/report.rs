//! Result assembly and outcome messages.

use rolemap_core::{
    ReconciliationDiff, ReconciliationIntent, ReconciliationResult, ResolvedRole, RoleRef,
};

use crate::executor::ExecutionOutcome;
use crate::resolver::GroupTarget;

/// Builds the `ReconciliationResult` for one group.
pub struct ResultReporter<'a> {
    group: &'a GroupTarget,
    intent: ReconciliationIntent,
    want_diff: bool,
}

impl<'a> ResultReporter<'a> {
    pub fn new(group: &'a GroupTarget, intent: ReconciliationIntent, want_diff: bool) -> Self {
        Self {
            group,
            intent,
            want_diff,
        }
    }

    /// Result for a request that named no roles at all.
    pub fn nothing_specified() -> ReconciliationResult {
        ReconciliationResult {
            changed: false,
            message: "Nothing to do (no roles specified).".to_string(),
            proposed: Vec::new(),
            existing: Vec::new(),
            end_state: Vec::new(),
            mutated: Vec::new(),
            diff: None,
        }
    }

    pub fn report(
        &self,
        proposed: Vec<RoleRef>,
        desired: &[ResolvedRole],
        existing: Vec<ResolvedRole>,
        mutated: Vec<ResolvedRole>,
        outcome: ExecutionOutcome,
    ) -> ReconciliationResult {
        let changed = outcome.changed();
        let message = self.message(desired, &mutated, &outcome);

        let (end_state, after) = match outcome {
            ExecutionOutcome::NoOp => (existing.clone(), None),
            ExecutionOutcome::DryRun => {
                let predicted = self.predict(&existing, &mutated);
                (existing.clone(), Some(predicted))
            }
            ExecutionOutcome::Applied { end_state } => {
                let after = end_state.clone();
                (end_state, Some(after))
            }
        };

        let diff = match after {
            Some(after) if self.want_diff => Some(ReconciliationDiff {
                before: existing.clone(),
                after,
            }),
            _ => None,
        };

        ReconciliationResult {
            changed,
            message,
            proposed,
            existing,
            end_state,
            mutated,
            diff,
        }
    }

    fn message(
        &self,
        desired: &[ResolvedRole],
        mutated: &[ResolvedRole],
        outcome: &ExecutionOutcome,
    ) -> String {
        let group = self.group.label();
        match (outcome, self.intent) {
            (ExecutionOutcome::NoOp, _) => format!(
                "Nothing to do, roles {} are correctly mapped to group {}.",
                role_list(desired),
                group
            ),
            (ExecutionOutcome::DryRun, ReconciliationIntent::Present) => format!(
                "Roles {} would be assigned to group {}.",
                role_list(mutated),
                group
            ),
            (ExecutionOutcome::DryRun, ReconciliationIntent::Absent) => format!(
                "Roles {} would be removed from group {}.",
                role_list(mutated),
                group
            ),
            (ExecutionOutcome::Applied { .. }, ReconciliationIntent::Present) => format!(
                "Roles {} assigned to group {}.",
                role_list(mutated),
                group
            ),
            (ExecutionOutcome::Applied { .. }, ReconciliationIntent::Absent) => format!(
                "Roles {} removed from group {}.",
                role_list(mutated),
                group
            ),
        }
    }

    /// Assigned set as it would look after applying `mutated`.
    fn predict(&self, existing: &[ResolvedRole], mutated: &[ResolvedRole]) -> Vec<ResolvedRole> {
        match self.intent {
            ReconciliationIntent::Present => {
                let mut predicted = existing.to_vec();
                for role in mutated {
                    if !predicted.iter().any(|r| r.name == role.name) {
                        predicted.push(role.clone());
                    }
                }
                predicted
            }
            ReconciliationIntent::Absent => existing
                .iter()
                .filter(|r| !mutated.iter().any(|m| m.name == r.name))
                .cloned()
                .collect(),
        }
    }
}

fn role_list(roles: &[ResolvedRole]) -> String {
    let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
    format!("[{}]", names.join(", "))
}
