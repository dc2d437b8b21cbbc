//! Shared fixtures for reconciler integration tests.

#![allow(dead_code)]

use anyhow::bail;
use async_trait::async_trait;
use rolemap_core::{Group, ResolvedRole};
use rolemap_runtime::{DirectoryClient, InMemoryDirectory};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const REALM: &str = "master";

pub fn role(id: &str, name: &str) -> ResolvedRole {
    ResolvedRole::new(id, name)
}

pub fn names(roles: &[ResolvedRole]) -> Vec<&str> {
    roles.iter().map(|r| r.name.as_str()).collect()
}

/// Realm `master` with group `developers` (g1), realm roles role_name1..3 and
/// client `portal` (c1) with roles viewer/editor.
pub fn keycloak_like() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_group(REALM, "g1", "developers")
        .with_realm_role(REALM, "r1", "role_name1")
        .with_realm_role(REALM, "r2", "role_name2")
        .with_realm_role(REALM, "r3", "role_name3")
        .with_client(REALM, "c1", "portal")
        .with_client_role(REALM, "c1", "cr1", "viewer")
        .with_client_role(REALM, "c1", "cr2", "editor")
}

/// Directory that serves fixed comparison sets, whatever the scope.
///
/// Unlike Keycloak, `available` is never updated after a mutation, which
/// lets tests describe sets where a role is both available and assigned.
pub struct StaticDirectory {
    pub group: Group,
    pub catalog: Vec<ResolvedRole>,
    pub available: Vec<ResolvedRole>,
    pub assigned: Mutex<Vec<ResolvedRole>>,
    pub fail_listing: bool,
    pub calls: AtomicUsize,
    pub batches: Mutex<Vec<(&'static str, Vec<ResolvedRole>)>>,
}

impl StaticDirectory {
    pub fn new(available: Vec<ResolvedRole>, assigned: Vec<ResolvedRole>) -> Self {
        let mut catalog = available.clone();
        for role in &assigned {
            if !catalog.iter().any(|r| r.name == role.name) {
                catalog.push(role.clone());
            }
        }
        Self {
            group: Group {
                id: "g1".to_string(),
                name: "developers".to_string(),
            },
            catalog,
            available,
            assigned: Mutex::new(assigned),
            fail_listing: false,
            calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Add a role that exists in the directory but is in neither set.
    pub fn with_catalog_role(mut self, role: ResolvedRole) -> Self {
        self.catalog.push(role);
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<(&'static str, Vec<ResolvedRole>)> {
        self.batches.lock().unwrap().clone()
    }

    fn call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn lookup(&self, name: &str) -> Option<ResolvedRole> {
        self.catalog.iter().find(|r| r.name == name).cloned()
    }

    fn mapped(&self, role_id: &str) -> Option<ResolvedRole> {
        self.assigned
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == role_id)
            .cloned()
    }

    fn listing(&self, roles: Vec<ResolvedRole>) -> anyhow::Result<Vec<ResolvedRole>> {
        if self.fail_listing {
            bail!("503 Service Unavailable");
        }
        Ok(roles)
    }
}

#[async_trait]
impl DirectoryClient for StaticDirectory {
    async fn find_group_by_name(&self, name: &str, _realm: &str) -> anyhow::Result<Option<Group>> {
        self.call();
        Ok((self.group.name == name).then(|| self.group.clone()))
    }

    async fn find_client_by_client_id(
        &self,
        client_id: &str,
        _realm: &str,
    ) -> anyhow::Result<Option<String>> {
        self.call();
        Ok((client_id == "portal").then(|| "c1".to_string()))
    }

    async fn find_realm_role_by_name(
        &self,
        name: &str,
        _realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        self.call();
        Ok(self.lookup(name))
    }

    async fn find_client_role_by_name(
        &self,
        _client: &str,
        name: &str,
        _realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        self.call();
        Ok(self.lookup(name))
    }

    async fn find_realm_group_role_mapping_by_id(
        &self,
        _group_id: &str,
        role_id: &str,
        _realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        self.call();
        Ok(self.mapped(role_id))
    }

    async fn find_client_group_role_mapping_by_id(
        &self,
        _group_id: &str,
        _client: &str,
        role_id: &str,
        _realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        self.call();
        Ok(self.mapped(role_id))
    }

    async fn list_available_realm_role_mappings(
        &self,
        _group_id: &str,
        _realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        self.call();
        self.listing(self.available.clone())
    }

    async fn list_assigned_realm_role_mappings(
        &self,
        _group_id: &str,
        _realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        self.call();
        let assigned = self.assigned.lock().unwrap().clone();
        self.listing(assigned)
    }

    async fn list_available_client_role_mappings(
        &self,
        _group_id: &str,
        _client: &str,
        _realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        self.call();
        self.listing(self.available.clone())
    }

    async fn list_assigned_client_role_mappings(
        &self,
        _group_id: &str,
        _client: &str,
        _realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        self.call();
        let assigned = self.assigned.lock().unwrap().clone();
        self.listing(assigned)
    }

    async fn add_group_role_mappings(
        &self,
        _group_id: &str,
        _client: Option<&str>,
        roles: &[ResolvedRole],
        _realm: &str,
    ) -> anyhow::Result<()> {
        self.call();
        self.batches.lock().unwrap().push(("add", roles.to_vec()));
        let mut assigned = self.assigned.lock().unwrap();
        for role in roles {
            if !assigned.iter().any(|r| r.name == role.name) {
                assigned.push(role.clone());
            }
        }
        Ok(())
    }

    async fn remove_group_role_mappings(
        &self,
        _group_id: &str,
        _client: Option<&str>,
        roles: &[ResolvedRole],
        _realm: &str,
    ) -> anyhow::Result<()> {
        self.call();
        self.batches.lock().unwrap().push(("remove", roles.to_vec()));
        self.assigned
            .lock()
            .unwrap()
            .retain(|r| !roles.iter().any(|m| m.name == r.name));
        Ok(())
    }
}
