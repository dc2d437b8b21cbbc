//! Mutation list computation.
//!
//! Roles are compared by name, exactly: the ids already present in the
//! directory's sets may have been assigned independently of the ones the
//! caller supplied.

use rolemap_core::{ReconciliationIntent, ResolvedRole, RoleComparisonSets};
use std::collections::HashSet;

/// Desired roles that have to be mapped (`Present`) or unmapped (`Absent`).
///
/// `Present` selects desired roles found in `available`, `Absent` those found
/// in `assigned`. Output follows the order of `desired`; a name listed twice
/// is emitted once. Entries carry the caller's resolved id and name.
pub fn compute_mutations(
    desired: &[ResolvedRole],
    intent: ReconciliationIntent,
    sets: &RoleComparisonSets,
) -> Vec<ResolvedRole> {
    let comparison = match intent {
        ReconciliationIntent::Present => &sets.available,
        ReconciliationIntent::Absent => &sets.assigned,
    };
    let names: HashSet<&str> = comparison.iter().map(|r| r.name.as_str()).collect();

    let mut seen = HashSet::new();
    desired
        .iter()
        .filter(|role| names.contains(role.name.as_str()))
        .filter(|role| seen.insert(role.name.as_str()))
        .cloned()
        .collect()
}
