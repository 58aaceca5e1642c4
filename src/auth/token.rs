//! OAuth2 client-credentials token provider.

use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Scope for calling the Bot Framework connector.
pub const BOT_FRAMEWORK_SCOPE: &str = "https://api.botframework.com/.default";

/// Scope for calling Microsoft Graph.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tenant used to issue tokens for multi-tenant bots.
pub const BOT_FRAMEWORK_TENANT: &str = "botframework.com";

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_SKEW: Duration = Duration::from_secs(300);

/// Errors that can occur while acquiring a token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },
}

/// Client-credentials grant parameters.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// Full token endpoint URL.
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

impl ClientCredentials {
    /// Builds the v2.0 token endpoint URL for `tenant` under `login_base`.
    #[must_use]
    pub fn token_url(login_base: &str, tenant: &str) -> String {
        format!(
            "{}/{tenant}/oauth2/v2.0/token",
            login_base.trim_end_matches('/')
        )
    }
}

#[derive(Debug)]
enum TokenSource {
    Fixed(String),
    ClientCredentials(ClientCredentials),
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Hands out bearer tokens, caching fetched ones until shortly before expiry.
#[derive(Debug)]
pub struct TokenProvider {
    source: TokenSource,
    http: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenProvider {
    /// Creates a provider that always returns `token`.
    #[must_use]
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Fixed(token.into()),
            http: reqwest::Client::new(),
            cached: RwLock::new(None),
        }
    }

    /// Creates a provider that fetches tokens with the client-credentials grant.
    #[must_use]
    pub fn client_credentials(http: reqwest::Client, credentials: ClientCredentials) -> Self {
        Self {
            source: TokenSource::ClientCredentials(credentials),
            http,
            cached: RwLock::new(None),
        }
    }

    /// Returns a valid access token.
    pub async fn token(&self) -> Result<String, AuthError> {
        let credentials = match &self.source {
            TokenSource::Fixed(token) => return Ok(token.clone()),
            TokenSource::ClientCredentials(credentials) => credentials,
        };

        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref()
                && Instant::now() < token.refresh_at
            {
                return Ok(token.value.clone());
            }
        }

        let mut cached = self.cached.write().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let fetched = self.fetch(credentials).await?;
        let value = fetched.value.clone();
        *cached = Some(fetched);
        Ok(value)
    }

    async fn fetch(&self, credentials: &ClientCredentials) -> Result<CachedToken, AuthError> {
        debug!("Requesting token for scope {}", credentials.scope);

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", credentials.scope.as_str()),
        ];

        let response = self
            .http
            .post(&credentials.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Endpoint { status, body });
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_SKEW);

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}
