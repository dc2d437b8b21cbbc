//! In-memory directory with Keycloak mapping semantics.
//!
//! - available = roles of the scope not directly mapped to the group
//! - assigned  = direct mappings plus everything reachable through composites
//!
//! Every trait call is counted, and mutating calls separately, so tests can
//! assert on the number of remote round-trips.

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use rolemap_core::{Group, ResolvedRole};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::directory::DirectoryClient;

#[derive(Debug)]
struct RoleEntry {
    role: ResolvedRole,
    /// Ids of roles (same scope) this composite role includes.
    composites: Vec<String>,
}

#[derive(Debug, Default)]
struct RealmState {
    groups: Vec<Group>,
    /// (internal id, clientId)
    clients: Vec<(String, String)>,
    realm_roles: Vec<RoleEntry>,
    client_roles: HashMap<String, Vec<RoleEntry>>,
    /// Direct mappings keyed by (group id, internal client id or None for realm roles).
    mappings: HashMap<(String, Option<String>), Vec<String>>,
}

impl RealmState {
    fn catalog(&self, client: Option<&str>) -> &[RoleEntry] {
        match client {
            Some(cid) => self.client_roles.get(cid).map(Vec::as_slice).unwrap_or(&[]),
            None => &self.realm_roles,
        }
    }

    fn direct(&self, group_id: &str, client: Option<&str>) -> &[String] {
        self.mappings
            .get(&(group_id.to_string(), client.map(str::to_string)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn available(&self, group_id: &str, client: Option<&str>) -> Vec<ResolvedRole> {
        let direct = self.direct(group_id, client);
        self.catalog(client)
            .iter()
            .filter(|entry| !direct.contains(&entry.role.id))
            .map(|entry| entry.role.clone())
            .collect()
    }

    fn effective(&self, group_id: &str, client: Option<&str>) -> Vec<ResolvedRole> {
        let catalog = self.catalog(client);
        let mut reached: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&str> = self
            .direct(group_id, client)
            .iter()
            .map(String::as_str)
            .collect();

        while let Some(id) = pending.pop() {
            if !reached.insert(id) {
                continue;
            }
            if let Some(entry) = catalog.iter().find(|e| e.role.id == id) {
                pending.extend(entry.composites.iter().map(String::as_str));
            }
        }

        catalog
            .iter()
            .filter(|entry| reached.contains(entry.role.id.as_str()))
            .map(|entry| entry.role.clone())
            .collect()
    }
}

/// Directory service held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    realms: Mutex<HashMap<String, RealmState>>,
    calls: AtomicUsize,
    mutations: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, realm: &str, id: &str, name: &str) -> Self {
        self.edit(realm, |state| {
            state.groups.push(Group {
                id: id.to_string(),
                name: name.to_string(),
            })
        });
        self
    }

    pub fn with_client(self, realm: &str, id: &str, client_id: &str) -> Self {
        self.edit(realm, |state| {
            state.clients.push((id.to_string(), client_id.to_string()))
        });
        self
    }

    pub fn with_realm_role(self, realm: &str, id: &str, name: &str) -> Self {
        self.edit(realm, |state| {
            state.realm_roles.push(RoleEntry {
                role: ResolvedRole::new(id, name),
                composites: Vec::new(),
            })
        });
        self
    }

    pub fn with_client_role(self, realm: &str, client: &str, id: &str, name: &str) -> Self {
        self.edit(realm, |state| {
            state
                .client_roles
                .entry(client.to_string())
                .or_default()
                .push(RoleEntry {
                    role: ResolvedRole::new(id, name),
                    composites: Vec::new(),
                })
        });
        self
    }

    /// Make `role_id` a composite that includes `member_id` (same scope).
    pub fn with_composite(
        self,
        realm: &str,
        client: Option<&str>,
        role_id: &str,
        member_id: &str,
    ) -> Self {
        self.edit(realm, |state| {
            let catalog = match client {
                Some(cid) => state.client_roles.entry(cid.to_string()).or_default(),
                None => &mut state.realm_roles,
            };
            if let Some(entry) = catalog.iter_mut().find(|e| e.role.id == role_id) {
                entry.composites.push(member_id.to_string());
            }
        });
        self
    }

    /// Map a role directly to a group.
    pub fn with_mapping(
        self,
        realm: &str,
        group_id: &str,
        client: Option<&str>,
        role_id: &str,
    ) -> Self {
        self.edit(realm, |state| {
            state
                .mappings
                .entry((group_id.to_string(), client.map(str::to_string)))
                .or_default()
                .push(role_id.to_string())
        });
        self
    }

    /// Total number of trait calls served.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of add/remove calls served.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Names of the group's effective roles in the given scope.
    pub fn assigned_names(
        &self,
        realm: &str,
        group_id: &str,
        client: Option<&str>,
    ) -> Vec<String> {
        self.read(realm, |state| {
            state
                .effective(group_id, client)
                .into_iter()
                .map(|r| r.name)
                .collect()
        })
    }

    fn edit(&self, realm: &str, f: impl FnOnce(&mut RealmState)) {
        let mut realms = self.realms.lock().unwrap_or_else(|e| e.into_inner());
        f(realms.entry(realm.to_string()).or_default());
    }

    fn read<T>(&self, realm: &str, f: impl FnOnce(&RealmState) -> T) -> T {
        let realms = self.realms.lock().unwrap_or_else(|e| e.into_inner());
        let empty = RealmState::default();
        f(realms.get(realm).unwrap_or(&empty))
    }

    fn call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn apply(
        &self,
        realm: &str,
        group_id: &str,
        client: Option<&str>,
        roles: &[ResolvedRole],
        add: bool,
    ) -> anyhow::Result<()> {
        self.call();
        self.mutations.fetch_add(1, Ordering::SeqCst);

        let mut realms = self.realms.lock().unwrap_or_else(|e| e.into_inner());
        let state = realms
            .get_mut(realm)
            .ok_or_else(|| anyhow!("realm '{}' does not exist", realm))?;

        for role in roles {
            if !state.catalog(client).iter().any(|e| e.role.id == role.id) {
                bail!("role '{}' ({}) does not exist", role.name, role.id);
            }
        }

        let direct = state
            .mappings
            .entry((group_id.to_string(), client.map(str::to_string)))
            .or_default();
        for role in roles {
            if add {
                if !direct.contains(&role.id) {
                    direct.push(role.id.clone());
                }
            } else {
                direct.retain(|id| id != &role.id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn find_group_by_name(&self, name: &str, realm: &str) -> anyhow::Result<Option<Group>> {
        self.call();
        Ok(self.read(realm, |s| s.groups.iter().find(|g| g.name == name).cloned()))
    }

    async fn find_client_by_client_id(
        &self,
        client_id: &str,
        realm: &str,
    ) -> anyhow::Result<Option<String>> {
        self.call();
        Ok(self.read(realm, |s| {
            s.clients
                .iter()
                .find(|(_, cid)| cid == client_id)
                .map(|(id, _)| id.clone())
        }))
    }

    async fn find_realm_role_by_name(
        &self,
        name: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        self.call();
        Ok(self.read(realm, |s| {
            s.catalog(None)
                .iter()
                .find(|e| e.role.name == name)
                .map(|e| e.role.clone())
        }))
    }

    async fn find_client_role_by_name(
        &self,
        client: &str,
        name: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        self.call();
        Ok(self.read(realm, |s| {
            s.catalog(Some(client))
                .iter()
                .find(|e| e.role.name == name)
                .map(|e| e.role.clone())
        }))
    }

    async fn find_realm_group_role_mapping_by_id(
        &self,
        group_id: &str,
        role_id: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        self.call();
        Ok(self.read(realm, |s| {
            let direct = s.direct(group_id, None);
            s.catalog(None)
                .iter()
                .find(|e| e.role.id == role_id && direct.contains(&e.role.id))
                .map(|e| e.role.clone())
        }))
    }

    async fn find_client_group_role_mapping_by_id(
        &self,
        group_id: &str,
        client: &str,
        role_id: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        self.call();
        Ok(self.read(realm, |s| {
            let direct = s.direct(group_id, Some(client));
            s.catalog(Some(client))
                .iter()
                .find(|e| e.role.id == role_id && direct.contains(&e.role.id))
                .map(|e| e.role.clone())
        }))
    }

    async fn list_available_realm_role_mappings(
        &self,
        group_id: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        self.call();
        Ok(self.read(realm, |s| s.available(group_id, None)))
    }

    async fn list_assigned_realm_role_mappings(
        &self,
        group_id: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        self.call();
        Ok(self.read(realm, |s| s.effective(group_id, None)))
    }

    async fn list_available_client_role_mappings(
        &self,
        group_id: &str,
        client: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        self.call();
        Ok(self.read(realm, |s| s.available(group_id, Some(client))))
    }

    async fn list_assigned_client_role_mappings(
        &self,
        group_id: &str,
        client: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        self.call();
        Ok(self.read(realm, |s| s.effective(group_id, Some(client))))
    }

    async fn add_group_role_mappings(
        &self,
        group_id: &str,
        client: Option<&str>,
        roles: &[ResolvedRole],
        realm: &str,
    ) -> anyhow::Result<()> {
        self.apply(realm, group_id, client, roles, true)
    }

    async fn remove_group_role_mappings(
        &self,
        group_id: &str,
        client: Option<&str>,
        roles: &[ResolvedRole],
        realm: &str,
    ) -> anyhow::Result<()> {
        self.apply(realm, group_id, client, roles, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::new()
            .with_group("master", "g1", "developers")
            .with_realm_role("master", "r1", "role_name1")
            .with_realm_role("master", "r2", "role_name2")
            .with_realm_role("master", "r3", "bundle")
            .with_composite("master", None, "r3", "r2")
    }

    #[tokio::test]
    async fn test_available_excludes_direct_mappings() {
        let dir = directory().with_mapping("master", "g1", None, "r1");
        let available = dir.list_available_realm_role_mappings("g1", "master").await.unwrap();
        let names: Vec<&str> = available.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["role_name2", "bundle"]);
    }

    #[tokio::test]
    async fn test_assigned_expands_composites() {
        let dir = directory().with_mapping("master", "g1", None, "r3");
        assert_eq!(
            dir.assigned_names("master", "g1", None),
            vec!["role_name2".to_string(), "bundle".to_string()]
        );
    }

    #[tokio::test]
    async fn test_add_and_remove_count_mutations() {
        let dir = directory();
        let role = ResolvedRole::new("r1", "role_name1");
        dir.add_group_role_mappings("g1", None, &[role.clone()], "master")
            .await
            .unwrap();
        assert_eq!(dir.assigned_names("master", "g1", None), vec!["role_name1"]);

        dir.remove_group_role_mappings("g1", None, &[role], "master")
            .await
            .unwrap();
        assert!(dir.assigned_names("master", "g1", None).is_empty());
        assert_eq!(dir.mutation_count(), 2);
        assert_eq!(dir.call_count(), 2);
    }

    #[tokio::test]
    async fn test_add_unknown_role_fails() {
        let dir = directory();
        let err = dir
            .add_group_role_mappings("g1", None, &[ResolvedRole::new("nope", "ghost")], "master")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
        assert!(dir.assigned_names("master", "g1", None).is_empty());
    }

    #[tokio::test]
    async fn test_mapping_lookup_requires_mapping() {
        let dir = directory().with_mapping("master", "g1", None, "r1");
        let found = dir
            .find_realm_group_role_mapping_by_id("g1", "r1", "master")
            .await
            .unwrap();
        assert_eq!(found, Some(ResolvedRole::new("r1", "role_name1")));

        let missing = dir
            .find_realm_group_role_mapping_by_id("g1", "r2", "master")
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
