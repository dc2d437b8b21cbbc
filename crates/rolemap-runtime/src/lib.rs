//! # rolemap-runtime
//!
//! Reconciles the role mappings of one group against a directory service.
//!
//! The pipeline is linear and runs once per request:
//!
//! | Step | Component | Remote calls |
//! |------|-----------|--------------|
//! | Resolve | [`IdentifierResolver`] | only for missing ids/names |
//! | Fetch | [`RoleSetFetcher`] | available + assigned sets |
//! | Diff | [`compute_mutations`] | none |
//! | Apply | [`MutationExecutor`] | one batched add/remove, then a re-fetch |
//! | Report | [`ResultReporter`] | none |
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use rolemap_core::{GroupRef, ReconcileRequest, RoleSpec};
//! use rolemap_runtime::{InMemoryDirectory, Reconciler};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = Arc::new(
//!     InMemoryDirectory::new()
//!         .with_group("master", "g1", "developers")
//!         .with_realm_role("master", "r1", "role_name1"),
//! );
//! let reconciler = Reconciler::new(directory);
//!
//! let request = ReconcileRequest::new(GroupRef::by_name("developers"))
//!     .roles(vec![RoleSpec::named("role_name1")]);
//! let result = reconciler.reconcile(&request).await?;
//! assert!(result.changed);
//! # Ok(())
//! # }
//! ```

pub mod diff;
pub mod directory;
pub mod error;
pub mod executor;
pub mod fetcher;
pub mod memory;
pub mod reconciler;
pub mod report;
pub mod resolver;

pub use diff::compute_mutations;
pub use directory::DirectoryClient;
pub use error::{EntityKind, ReconcileError, Reference, Scope};
pub use executor::{ExecutionOutcome, MutationExecutor};
pub use fetcher::RoleSetFetcher;
pub use memory::InMemoryDirectory;
pub use reconciler::Reconciler;
pub use report::ResultReporter;
pub use resolver::{ClientTarget, GroupTarget, IdentifierResolver};
