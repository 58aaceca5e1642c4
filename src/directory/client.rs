//! Graph API user lookups.

use std::sync::Arc;

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::auth::{AuthError, TokenProvider};

/// Errors that can occur while querying the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("No Graph credentials configured")]
    NotConfigured,

    #[error("Failed to acquire Graph token: {0}")]
    Auth(#[from] AuthError),

    #[error("Graph request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid Graph base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Invalid directory object id '{0}'")]
    InvalidObjectId(String),
}

/// Directory profile fields the bot displays.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub mail: Option<String>,

    #[serde(default)]
    pub user_principal_name: Option<String>,
}

impl DirectoryUser {
    /// Mail address, falling back to the principal name.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        non_empty(self.mail.as_deref()).or_else(|| non_empty(self.user_principal_name.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Reads user profiles from Graph.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Option<Arc<TokenProvider>>,
}

impl DirectoryClient {
    /// Creates a client for the Graph API at `base_url`.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        tokens: Option<Arc<TokenProvider>>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            tokens,
        }
    }

    /// Fetches the profile of the user with directory object id `object_id`.
    pub async fn get_user(&self, object_id: &str) -> Result<DirectoryUser, DirectoryError> {
        let tokens = self.tokens.as_ref().ok_or(DirectoryError::NotConfigured)?;
        let url = user_url(&self.base_url, object_id)?;
        let token = tokens.token().await?;

        debug!("Fetching directory profile from {}", url);

        let response = self.http.get(url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Api { status, body });
        }

        Ok(response.json().await?)
    }
}

/// Builds `{base_url}/v1.0/users/{object_id}` with the id as a single
/// percent-encoded path segment.
fn user_url(base_url: &str, object_id: &str) -> Result<Url, DirectoryError> {
    if matches!(object_id.trim(), "" | "." | "..") {
        return Err(DirectoryError::InvalidObjectId(object_id.to_owned()));
    }

    let invalid_base = || DirectoryError::InvalidBaseUrl(base_url.to_owned());
    let mut url = Url::parse(base_url).map_err(|_| invalid_base())?;
    url.path_segments_mut()
        .map_err(|()| invalid_base())?
        .pop_if_empty()
        .extend(["v1.0", "users", object_id]);
    Ok(url)
}
