//! Turns partially specified group, client and role references into ids.
//!
//! Every lookup is skipped when the caller already supplied the value it
//! would produce, so a fully specified request resolves without remote calls.

use futures::future::join_all;
use rolemap_core::{ClientRef, GroupRef, ResolvedRole, RoleRef};
use tracing::debug;

use crate::directory::DirectoryClient;
use crate::error::{EntityKind, ReconcileError, Reference, Scope};

/// Resolved target group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTarget {
    pub id: String,
    pub name: Option<String>,
}

impl GroupTarget {
    /// Name when known, id otherwise.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Resolved client scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientTarget {
    /// Internal id, used in every directory call.
    pub id: String,
    /// Human-facing client id, when the caller gave one.
    pub client_id: Option<String>,
}

impl ClientTarget {
    pub fn label(&self) -> &str {
        self.client_id.as_deref().unwrap_or(&self.id)
    }
}

pub struct IdentifierResolver<'a> {
    directory: &'a dyn DirectoryClient,
    realm: &'a str,
}

impl<'a> IdentifierResolver<'a> {
    pub fn new(directory: &'a dyn DirectoryClient, realm: &'a str) -> Self {
        Self { directory, realm }
    }

    pub async fn resolve_group(&self, group: &GroupRef) -> Result<GroupTarget, ReconcileError> {
        group.validate()?;

        if let Some(id) = &group.id {
            return Ok(GroupTarget {
                id: id.clone(),
                name: group.name.clone(),
            });
        }

        // validate() guarantees a name when there is no id
        let name = group.name.as_deref().unwrap_or_default();
        debug!(realm = %self.realm, group = %name, "Looking up group by name");

        match self.directory.find_group_by_name(name, self.realm).await? {
            Some(found) => Ok(GroupTarget {
                id: found.id,
                name: Some(found.name),
            }),
            None => Err(ReconcileError::not_found(
                EntityKind::Group,
                Reference::Name(name.to_string()),
                self.realm_scope(),
            )),
        }
    }

    /// `None` in, `None` out: realm-scoped mode.
    pub async fn resolve_client(
        &self,
        client: Option<&ClientRef>,
    ) -> Result<Option<ClientTarget>, ReconcileError> {
        let Some(client) = client else {
            return Ok(None);
        };
        client.validate()?;

        if let Some(id) = &client.id {
            return Ok(Some(ClientTarget {
                id: id.clone(),
                client_id: client.client_id.clone(),
            }));
        }

        let client_id = client.client_id.as_deref().unwrap_or_default();
        debug!(realm = %self.realm, client_id = %client_id, "Looking up client by clientId");

        match self
            .directory
            .find_client_by_client_id(client_id, self.realm)
            .await?
        {
            Some(id) => Ok(Some(ClientTarget {
                id,
                client_id: Some(client_id.to_string()),
            })),
            None => Err(ReconcileError::not_found(
                EntityKind::Client,
                Reference::Name(client_id.to_string()),
                self.realm_scope(),
            )),
        }
    }

    /// Resolve every role reference.
    ///
    /// Lookups run concurrently and are joined before returning. When several
    /// fail, the error of the earliest reference in `roles` is returned.
    pub async fn resolve_roles(
        &self,
        group: &GroupTarget,
        client: Option<&ClientTarget>,
        roles: &[RoleRef],
    ) -> Result<Vec<ResolvedRole>, ReconcileError> {
        let lookups = roles
            .iter()
            .map(|role| self.resolve_role(group, client, role));

        join_all(lookups).await.into_iter().collect()
    }

    pub async fn resolve_role(
        &self,
        group: &GroupTarget,
        client: Option<&ClientTarget>,
        role: &RoleRef,
    ) -> Result<ResolvedRole, ReconcileError> {
        match role {
            RoleRef::Known(resolved) => Ok(resolved.clone()),
            RoleRef::ByName(name) => {
                debug!(role = %name, scope = %self.scope(client), "Resolving role id by name");
                let found = match client {
                    Some(c) => {
                        self.directory
                            .find_client_role_by_name(&c.id, name, self.realm)
                            .await?
                    }
                    None => self.directory.find_realm_role_by_name(name, self.realm).await?,
                };
                found
                    .map(|r| ResolvedRole::new(r.id, name.clone()))
                    .ok_or_else(|| {
                        ReconcileError::not_found(
                            EntityKind::Role,
                            Reference::Name(name.clone()),
                            self.scope(client),
                        )
                    })
            }
            RoleRef::ById(id) => {
                // Names are recovered from the group's current mappings: the
                // comparison sets are keyed by name.
                debug!(role_id = %id, scope = %self.scope(client), "Resolving role name from group mapping");
                let found = match client {
                    Some(c) => {
                        self.directory
                            .find_client_group_role_mapping_by_id(&group.id, &c.id, id, self.realm)
                            .await?
                    }
                    None => {
                        self.directory
                            .find_realm_group_role_mapping_by_id(&group.id, id, self.realm)
                            .await?
                    }
                };
                found
                    .map(|r| ResolvedRole::new(id.clone(), r.name))
                    .ok_or_else(|| {
                        ReconcileError::not_found(
                            EntityKind::Role,
                            Reference::Id(id.clone()),
                            self.scope(client),
                        )
                    })
            }
        }
    }

    fn realm_scope(&self) -> Scope {
        Scope::Realm {
            realm: self.realm.to_string(),
        }
    }

    fn scope(&self, client: Option<&ClientTarget>) -> Scope {
        match client {
            Some(c) => Scope::Client {
                client: c.label().to_string(),
                realm: self.realm.to_string(),
            },
            None => self.realm_scope(),
        }
    }
}
