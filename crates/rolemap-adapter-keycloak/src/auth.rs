//! Access token acquisition for the admin API.

use rolemap_core::Credentials;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{KeycloakError, describe_body};

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    60
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// True if the token expires within `grace`.
    fn is_expired(&self, grace: Duration) -> bool {
        Instant::now() + grace >= self.expires_at
    }
}

/// Supplies bearer tokens: either a static one, or one obtained with the
/// OpenID Connect password grant and cached until shortly before expiry.
#[derive(Debug)]
pub struct TokenSource {
    credentials: Credentials,
    token_url: Url,
    cached: RwLock<Option<CachedToken>>,
    grace: Duration,
}

impl TokenSource {
    pub fn new(credentials: Credentials, base_url: &Url) -> Result<Self, KeycloakError> {
        let realm = match &credentials {
            Credentials::Password { realm, .. } => realm.as_str(),
            // Never requested for static tokens.
            Credentials::Token(_) => "master",
        };
        let token_url = token_url(base_url, realm)?;

        Ok(Self {
            credentials,
            token_url,
            cached: RwLock::new(None),
            grace: Duration::from_secs(10),
        })
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Returns a valid access token, requesting a new one if needed.
    pub async fn token(&self, http: &reqwest::Client) -> Result<String, KeycloakError> {
        let (client_id, client_secret, username, password) = match &self.credentials {
            Credentials::Token(token) => return Ok(token.clone()),
            Credentials::Password {
                client_id,
                client_secret,
                username,
                password,
                ..
            } => (client_id, client_secret, username, password),
        };

        {
            let cache = self.cached.read().await;
            if let Some(token) = cache.as_ref().filter(|t| !t.is_expired(self.grace)) {
                return Ok(token.access_token.clone());
            }
        }

        // Held across the grant: concurrent callers wait for one refresh.
        let mut cache = self.cached.write().await;
        if let Some(token) = cache.as_ref().filter(|t| !t.is_expired(self.grace)) {
            return Ok(token.access_token.clone());
        }

        let fresh = self
            .acquire(http, client_id, client_secret.as_deref(), username, password)
            .await?;
        let access_token = fresh.access_token.clone();
        *cache = Some(fresh);

        Ok(access_token)
    }

    /// Drop the cached token so the next call requests a new one.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    #[instrument(skip_all, fields(url = %self.token_url, username = %username))]
    async fn acquire(
        &self,
        http: &reqwest::Client,
        client_id: &str,
        client_secret: Option<&str>,
        username: &str,
        password: &str,
    ) -> Result<CachedToken, KeycloakError> {
        let mut params = vec![
            ("grant_type", "password"),
            ("client_id", client_id),
            ("username", username),
            ("password", password),
        ];
        if let Some(secret) = client_secret {
            params.push(("client_secret", secret));
        }

        let response = http
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KeycloakError::Auth {
                url: self.token_url.to_string(),
                status: status.as_u16(),
                detail: describe_body(&body),
            });
        }

        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "Acquired access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

/// `{base}/realms/{realm}/protocol/openid-connect/token`
pub(crate) fn token_url(base_url: &Url, realm: &str) -> Result<Url, KeycloakError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| KeycloakError::InvalidUrl {
            url: base_url.to_string(),
            reason: "cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .extend(["realms", realm, "protocol", "openid-connect", "token"]);
    Ok(url)
}
