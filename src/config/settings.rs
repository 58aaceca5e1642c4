//! Bot credentials and application settings.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{BOT_FRAMEWORK_SCOPE, BOT_FRAMEWORK_TENANT, ClientCredentials, GRAPH_SCOPE};
use crate::channel::DEFAULT_TRUSTED_SERVICE_HOSTS;
use crate::guard::DEFAULT_WAIT_MESSAGE;

/// How the bot's app registration is scoped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppType {
    #[default]
    MultiTenant,
    SingleTenant,
}

impl FromStr for AppType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multitenant" => Ok(Self::MultiTenant),
            "singletenant" => Ok(Self::SingleTenant),
            _ => Err(ConfigError::InvalidAppType(s.to_owned())),
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiTenant => write!(f, "MultiTenant"),
            Self::SingleTenant => write!(f, "SingleTenant"),
        }
    }
}

/// Bot registration credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotCredentials {
    /// App (client) id. Absent when running against a local emulator.
    pub app_id: Option<String>,

    /// Registration scope.
    #[serde(default)]
    pub app_type: AppType,

    /// Directory tenant id.
    pub tenant_id: Option<String>,

    /// Client secret.
    #[serde(skip_serializing)]
    pub app_password: Option<String>,
}

impl BotCredentials {
    /// Creates credentials from environment variables.
    ///
    /// Reads `CLIENT_ID` (or `BOT_ID`), `BOT_TYPE`, `TENANT_ID` and
    /// `CLIENT_SECRET` (or `CLIENT_PASSWORD`).
    ///
    /// # Errors
    ///
    /// Returns an error if `BOT_TYPE` is unknown, or if an app id is set
    /// without a secret, or a single-tenant bot has no tenant id.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_id = non_empty("CLIENT_ID").or_else(|| non_empty("BOT_ID"));
        let app_type = non_empty("BOT_TYPE")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();
        let tenant_id = non_empty("TENANT_ID");
        let app_password = non_empty("CLIENT_SECRET").or_else(|| non_empty("CLIENT_PASSWORD"));

        if app_id.is_some() && app_password.is_none() {
            return Err(ConfigError::MissingEnvVar("CLIENT_SECRET"));
        }

        if app_id.is_some() && app_type == AppType::SingleTenant && tenant_id.is_none() {
            return Err(ConfigError::MissingEnvVar("TENANT_ID"));
        }

        Ok(Self {
            app_id,
            app_type,
            tenant_id,
            app_password,
        })
    }

    /// Credentials for calling the connector service, if an app id is configured.
    #[must_use]
    pub fn connector_credentials(&self, login_base: &str) -> Option<ClientCredentials> {
        let client_id = self.app_id.clone()?;
        let client_secret = self.app_password.clone()?;

        let tenant = match self.app_type {
            AppType::MultiTenant => BOT_FRAMEWORK_TENANT,
            AppType::SingleTenant => self.tenant_id.as_deref()?,
        };

        Some(ClientCredentials {
            token_url: ClientCredentials::token_url(login_base, tenant),
            client_id,
            client_secret,
            scope: BOT_FRAMEWORK_SCOPE.to_owned(),
        })
    }

    /// Credentials for calling Graph, which needs the real tenant.
    #[must_use]
    pub fn graph_credentials(&self, login_base: &str) -> Option<ClientCredentials> {
        let tenant = self.tenant_id.as_deref()?;

        Some(ClientCredentials {
            token_url: ClientCredentials::token_url(login_base, tenant),
            client_id: self.app_id.clone()?,
            client_secret: self.app_password.clone()?,
            scope: GRAPH_SCOPE.to_owned(),
        })
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Port of the messaging endpoint.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interval between repeated typing signals in milliseconds.
    #[serde(default = "default_typing_interval_ms")]
    pub typing_interval_ms: u64,

    /// Notice sent when a user's previous request is still running.
    #[serde(default = "default_wait_message")]
    pub wait_message: String,

    /// Pre-issued Graph token; used instead of the client-credentials grant.
    #[serde(default, skip_serializing)]
    pub graph_api_token: Option<String>,

    /// Base URL of the Graph API.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,

    /// Base URL of the identity platform token endpoints.
    #[serde(default = "default_login_base_url")]
    pub login_base_url: String,

    /// Service URL hosts the connector token may be sent to. Subdomains
    /// of each host are trusted too.
    #[serde(default = "default_trusted_service_hosts")]
    pub trusted_service_hosts: Vec<String>,

    /// Log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    3978
}

fn default_typing_interval_ms() -> u64 {
    3000
}

fn default_wait_message() -> String {
    DEFAULT_WAIT_MESSAGE.to_owned()
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com".to_owned()
}

fn default_login_base_url() -> String {
    "https://login.microsoftonline.com".to_owned()
}

fn default_trusted_service_hosts() -> Vec<String> {
    DEFAULT_TRUSTED_SERVICE_HOSTS
        .iter()
        .map(|&host| host.to_owned())
        .collect()
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            typing_interval_ms: default_typing_interval_ms(),
            wait_message: default_wait_message(),
            graph_api_token: None,
            graph_base_url: default_graph_base_url(),
            login_base_url: default_login_base_url(),
            trusted_service_hosts: default_trusted_service_hosts(),
            log_level: default_log_level(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env_with_defaults`](Self::from_env_with_defaults) but
    /// reads values through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup("PORT")
                .or_else(|| lookup("port"))
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_port),
            typing_interval_ms: lookup("TYPING_INTERVAL_MS")
                .and_then(|s| s.parse().ok())
                .filter(|&ms| ms > 0)
                .unwrap_or_else(default_typing_interval_ms),
            wait_message: lookup("WAIT_MESSAGE")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(default_wait_message),
            graph_api_token: lookup("GRAPH_API_TOKEN").filter(|s| !s.trim().is_empty()),
            graph_base_url: lookup("GRAPH_BASE_URL").unwrap_or_else(default_graph_base_url),
            login_base_url: lookup("LOGIN_BASE_URL").unwrap_or_else(default_login_base_url),
            trusted_service_hosts: lookup("TRUSTED_SERVICE_HOSTS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|host| !host.is_empty())
                        .map(str::to_owned)
                        .collect::<Vec<_>>()
                })
                .filter(|hosts| !hosts.is_empty())
                .unwrap_or_else(default_trusted_service_hosts),
            log_level: lookup("RUST_LOG").unwrap_or_else(default_log_level),
        }
    }

    #[must_use]
    pub const fn typing_interval(&self) -> Duration {
        Duration::from_millis(self.typing_interval_ms)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid BOT_TYPE '{0}' (expected MultiTenant or SingleTenant)")]
    InvalidAppType(String),
}
