//! Keycloak admin REST API implementation of `DirectoryClient`.
//!
//! All calls go to `{base_url}/admin/realms/{realm}/...` with a bearer token
//! from [`TokenSource`]. Lookups answer `None` on 404; any other
//! non-success status is an error naming the method, URL and status.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use rolemap_core::{ConnectionConfig, Group, ResolvedRole};
use rolemap_runtime::DirectoryClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub mod auth;
pub mod error;

pub use auth::TokenSource;
pub use error::KeycloakError;

use error::describe_body;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupRepresentation {
    id: String,
    name: String,
    #[serde(default)]
    sub_groups: Vec<GroupRepresentation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRepresentation {
    id: String,
    client_id: String,
}

pub struct KeycloakAdapter {
    http: reqwest::Client,
    base_url: Url,
    tokens: TokenSource,
}

impl KeycloakAdapter {
    pub fn new(connection: &ConnectionConfig) -> Result<Self, KeycloakError> {
        let base_url = parse_base_url(&connection.base_url)?;
        let credentials = connection.credentials()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(connection.timeout_seconds))
            .danger_accept_invalid_certs(!connection.validate_certs)
            .build()?;
        let tokens = TokenSource::new(credentials, &base_url)?;

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/admin/realms/{realm}/{segments...}`, each segment percent-encoded.
    fn admin_url(&self, realm: &str, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base URL '{}' cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend(["admin", "realms", realm])
            .extend(segments);
        Ok(url)
    }

    /// `.../groups/{gid}/role-mappings/realm` or `.../role-mappings/clients/{cid}`,
    /// optionally followed by `available` or `composite`.
    fn mapping_url(
        &self,
        realm: &str,
        group_id: &str,
        client: Option<&str>,
        view: Option<&str>,
    ) -> anyhow::Result<Url> {
        let mut segments = vec!["groups", group_id, "role-mappings"];
        match client {
            Some(cid) => segments.extend(["clients", cid]),
            None => segments.push("realm"),
        }
        segments.extend(view);
        self.admin_url(realm, &segments)
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        roles: Option<&[ResolvedRole]>,
    ) -> anyhow::Result<Response> {
        let token = self.tokens.token(&self.http).await?;
        debug!(method = %method, url = %url, "Keycloak request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token);
        if let Some(roles) = roles {
            request = request.json(roles);
        }

        request
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, url))
    }

    /// Turn a non-success response into an error.
    async fn check(
        &self,
        method: &Method,
        url: &Url,
        response: Response,
    ) -> anyhow::Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            warn!(url = %url, "Access token rejected, dropping cached token");
            self.tokens.invalidate().await;
        }

        let body = response.text().await.unwrap_or_default();
        Err(KeycloakError::Status {
            method: method.to_string(),
            url: url.to_string(),
            status: status.as_u16(),
            detail: describe_body(&body),
        }
        .into())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> anyhow::Result<T> {
        let response = self.send(Method::GET, &url, None).await?;
        let response = self.check(&Method::GET, &url, response).await?;
        response
            .json()
            .await
            .with_context(|| format!("invalid response body from GET {}", url))
    }

    async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> anyhow::Result<Option<T>> {
        let response = self.send(Method::GET, &url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.check(&Method::GET, &url, response).await?;
        let value = response
            .json()
            .await
            .with_context(|| format!("invalid response body from GET {}", url))?;
        Ok(Some(value))
    }

    async fn send_roles(
        &self,
        method: Method,
        url: Url,
        roles: &[ResolvedRole],
    ) -> anyhow::Result<()> {
        let response = self.send(method.clone(), &url, Some(roles)).await?;
        self.check(&method, &url, response).await?;
        Ok(())
    }

    async fn find_direct_mapping(
        &self,
        realm: &str,
        group_id: &str,
        client: Option<&str>,
        role_id: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        let url = self.mapping_url(realm, group_id, client, None)?;
        let mapped: Vec<ResolvedRole> = self.get_json(url).await?;
        Ok(mapped.into_iter().find(|r| r.id == role_id))
    }
}

#[async_trait]
impl DirectoryClient for KeycloakAdapter {
    async fn find_group_by_name(&self, name: &str, realm: &str) -> anyhow::Result<Option<Group>> {
        let mut url = self.admin_url(realm, &["groups"])?;
        url.query_pairs_mut().append_pair("search", name);

        // `search` is a substring match over the whole tree.
        let groups: Vec<GroupRepresentation> = self.get_json(url).await?;
        Ok(find_group(&groups, name))
    }

    async fn find_client_by_client_id(
        &self,
        client_id: &str,
        realm: &str,
    ) -> anyhow::Result<Option<String>> {
        let mut url = self.admin_url(realm, &["clients"])?;
        url.query_pairs_mut().append_pair("clientId", client_id);

        let clients: Vec<ClientRepresentation> = self.get_json(url).await?;
        Ok(clients
            .into_iter()
            .find(|c| c.client_id == client_id)
            .map(|c| c.id))
    }

    async fn find_realm_role_by_name(
        &self,
        name: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        let url = self.admin_url(realm, &["roles", name])?;
        self.get_optional(url).await
    }

    async fn find_client_role_by_name(
        &self,
        client: &str,
        name: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        let url = self.admin_url(realm, &["clients", client, "roles", name])?;
        self.get_optional(url).await
    }

    async fn find_realm_group_role_mapping_by_id(
        &self,
        group_id: &str,
        role_id: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        self.find_direct_mapping(realm, group_id, None, role_id).await
    }

    async fn find_client_group_role_mapping_by_id(
        &self,
        group_id: &str,
        client: &str,
        role_id: &str,
        realm: &str,
    ) -> anyhow::Result<Option<ResolvedRole>> {
        self.find_direct_mapping(realm, group_id, Some(client), role_id)
            .await
    }

    async fn list_available_realm_role_mappings(
        &self,
        group_id: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        let url = self.mapping_url(realm, group_id, None, Some("available"))?;
        self.get_json(url).await
    }

    async fn list_assigned_realm_role_mappings(
        &self,
        group_id: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        let url = self.mapping_url(realm, group_id, None, Some("composite"))?;
        self.get_json(url).await
    }

    async fn list_available_client_role_mappings(
        &self,
        group_id: &str,
        client: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        let url = self.mapping_url(realm, group_id, Some(client), Some("available"))?;
        self.get_json(url).await
    }

    async fn list_assigned_client_role_mappings(
        &self,
        group_id: &str,
        client: &str,
        realm: &str,
    ) -> anyhow::Result<Vec<ResolvedRole>> {
        let url = self.mapping_url(realm, group_id, Some(client), Some("composite"))?;
        self.get_json(url).await
    }

    async fn add_group_role_mappings(
        &self,
        group_id: &str,
        client: Option<&str>,
        roles: &[ResolvedRole],
        realm: &str,
    ) -> anyhow::Result<()> {
        let url = self.mapping_url(realm, group_id, client, None)?;
        self.send_roles(Method::POST, url, roles).await
    }

    async fn remove_group_role_mappings(
        &self,
        group_id: &str,
        client: Option<&str>,
        roles: &[ResolvedRole],
        realm: &str,
    ) -> anyhow::Result<()> {
        let url = self.mapping_url(realm, group_id, client, None)?;
        self.send_roles(Method::DELETE, url, roles).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, KeycloakError> {
    let url = Url::parse(raw).map_err(|e| KeycloakError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(KeycloakError::InvalidUrl {
            url: raw.to_string(),
            reason: "expected an http(s) URL".to_string(),
        });
    }
    Ok(url)
}

/// Depth-first search for an exact name match.
fn find_group(groups: &[GroupRepresentation], name: &str) -> Option<Group> {
    groups.iter().find_map(|g| {
        if g.name == name {
            Some(Group {
                id: g.id.clone(),
                name: g.name.clone(),
            })
        } else {
            find_group(&g.sub_groups, name)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(base: &str) -> KeycloakAdapter {
        let mut connection = ConnectionConfig::new(base);
        connection.token = Some("t".to_string());
        KeycloakAdapter::new(&connection).unwrap()
    }

    #[test]
    fn test_admin_url_encodes_segments() {
        let kc = adapter("https://auth.example.com/auth/");
        let url = kc
            .admin_url("master", &["roles", "team lead/ops"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://auth.example.com/auth/admin/realms/master/roles/team%20lead%2Fops"
        );
    }

    #[test]
    fn test_mapping_urls() {
        let kc = adapter("https://auth.example.com");
        assert_eq!(
            kc.mapping_url("master", "g1", None, Some("available"))
                .unwrap()
                .path(),
            "/admin/realms/master/groups/g1/role-mappings/realm/available"
        );
        assert_eq!(
            kc.mapping_url("master", "g1", Some("c1"), None).unwrap().path(),
            "/admin/realms/master/groups/g1/role-mappings/clients/c1"
        );
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = parse_base_url("mailto:admin@example.com").unwrap_err();
        assert!(matches!(err, KeycloakError::InvalidUrl { .. }));
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_new_requires_credentials() {
        let connection = ConnectionConfig::new("https://auth.example.com");
        let result = KeycloakAdapter::new(&connection);
        assert!(matches!(result, Err(KeycloakError::Config(_))));
    }

    #[test]
    fn test_find_group_searches_subgroups() {
        let groups: Vec<GroupRepresentation> = serde_json::from_value(serde_json::json!([
            {
                "id": "p1",
                "name": "platform",
                "subGroups": [
                    { "id": "s1", "name": "platform-admins", "subGroups": [] },
                    { "id": "s2", "name": "developers" }
                ]
            }
        ]))
        .unwrap();

        assert_eq!(find_group(&groups, "developers").unwrap().id, "s2");
        assert_eq!(find_group(&groups, "platform").unwrap().id, "p1");
        assert!(find_group(&groups, "platform-admin").is_none());
    }
}
