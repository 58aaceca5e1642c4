//! Connector REST client used to post replies back to the channel.

use std::sync::Arc;

use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};

use super::OutgoingActivity;
use crate::auth::{AuthError, TokenProvider};

/// Errors that can occur while talking to the channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Activity is missing required field: {0}")]
    MissingField(&'static str),

    #[error("Failed to acquire connector token: {0}")]
    Auth(#[from] AuthError),

    #[error("Connector request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connector rejected activity ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid service URL '{0}'")]
    InvalidServiceUrl(String),

    #[error("Service URL host '{0}' is not trusted")]
    UntrustedServiceUrl(String),

    #[error("Invalid {field} '{value}'")]
    InvalidId { field: &'static str, value: String },
}

/// Hosts (and their subdomains) the bot token may be sent to.
pub const DEFAULT_TRUSTED_SERVICE_HOSTS: [&str; 2] =
    ["botframework.com", "smba.trafficmanager.net"];

/// Posts activities to a conversation through the connector service.
#[derive(Debug, Clone)]
pub struct ConnectorClient {
    http: reqwest::Client,

    /// Absent when the bot runs without an app id (local emulator).
    tokens: Option<Arc<TokenProvider>>,

    /// Service URL hosts that may receive the bearer token.
    trusted_hosts: Vec<String>,
}

impl ConnectorClient {
    /// Creates a new connector client.
    #[must_use]
    pub fn new(http: reqwest::Client, tokens: Option<Arc<TokenProvider>>) -> Self {
        Self {
            http,
            tokens,
            trusted_hosts: DEFAULT_TRUSTED_SERVICE_HOSTS
                .iter()
                .map(|&h| h.to_owned())
                .collect(),
        }
    }

    /// Replaces the hosts the bearer token may be sent to. A host also
    /// trusts its subdomains.
    #[must_use]
    pub fn with_trusted_hosts(mut self, hosts: Vec<String>) -> Self {
        self.trusted_hosts = hosts
            .into_iter()
            .map(|h| h.trim().trim_start_matches('.').to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        self
    }

    /// Returns true if `host` is a trusted host or a subdomain of one.
    fn is_trusted(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.trusted_hosts.iter().any(|trusted| {
            host == *trusted
                || host
                    .strip_suffix(trusted.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Sends `activity` to the conversation, threaded under `reply_to_id` if given.
    pub async fn send(
        &self,
        service_url: &str,
        conversation_id: &str,
        reply_to_id: Option<&str>,
        activity: &OutgoingActivity,
    ) -> Result<(), ChannelError> {
        let url = activities_url(service_url, conversation_id, reply_to_id)?;

        let host = url.host_str().unwrap_or_default();
        if self.tokens.is_some() && !self.is_trusted(host) {
            warn!("Refusing to send bot token to untrusted host {}", host);
            return Err(ChannelError::UntrustedServiceUrl(host.to_owned()));
        }

        let mut request = self.http.post(url.clone()).json(activity);
        if let Some(tokens) = &self.tokens {
            request = request.bearer_auth(tokens.token().await?);
        }
        debug!("Posting {} activity to {}", activity.kind, url);

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected { status, body });
        }

        Ok(())
    }
}

/// Builds `{service_url}/v3/conversations/{id}/activities[/{reply_to_id}]`,
/// with each id as a single percent-encoded path segment.
fn activities_url(
    service_url: &str,
    conversation_id: &str,
    reply_to_id: Option<&str>,
) -> Result<Url, ChannelError> {
    check_id("conversation id", conversation_id)?;
    if let Some(id) = reply_to_id {
        check_id("reply-to id", id)?;
    }

    let invalid = || ChannelError::InvalidServiceUrl(service_url.to_owned());
    let mut url = Url::parse(service_url).map_err(|_| invalid())?;
    {
        let mut segments = url.path_segments_mut().map_err(|()| invalid())?;
        segments
            .pop_if_empty()
            .extend(["v3", "conversations", conversation_id, "activities"]);
        if let Some(id) = reply_to_id {
            segments.push(id);
        }
    }
    Ok(url)
}

/// Rejects ids that would vanish or climb when used as a path segment.
fn check_id(field: &'static str, value: &str) -> Result<(), ChannelError> {
    if matches!(value.trim(), "" | "." | "..") {
        return Err(ChannelError::InvalidId {
            field,
            value: value.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        Json, Router,
        extract::{Path, State},
        http::HeaderMap,
        routing::post,
    };
    use parking_lot::Mutex;
    use serde_json::Value;

    use super::*;

    type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn capture(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> &'static str {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        captured.lock().push((auth, body));
        "{}"
    }

    async fn serve(captured: Captured) -> String {
        let router = Router::new()
            .route("/v3/conversations/{conv}/activities/{reply}", post(capture))
            .with_state(captured);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/")
    }

    type CapturedIds = Arc<Mutex<Vec<(String, String)>>>;

    async fn capture_ids(
        State(captured): State<CapturedIds>,
        Path((conv, reply)): Path<(String, String)>,
    ) -> &'static str {
        captured.lock().push((conv, reply));
        "{}"
    }

    #[test]
    fn test_activities_url() {
        assert_eq!(
            activities_url("https://smba.example/amer/", "a:1", Some("99"))
                .unwrap()
                .as_str(),
            "https://smba.example/amer/v3/conversations/a:1/activities/99"
        );
        assert_eq!(
            activities_url("https://smba.example", "a:1", None)
                .unwrap()
                .as_str(),
            "https://smba.example/v3/conversations/a:1/activities"
        );
    }

    #[test]
    fn test_activities_url_encodes_ids() {
        let url =
            activities_url("https://smba.example/amer/", "a:1/x?y#z", Some("r/1?z")).unwrap();

        assert_eq!(
            url.path(),
            "/amer/v3/conversations/a:1%2Fx%3Fy%23z/activities/r%2F1%3Fz"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_activities_url_rejects_bad_input() {
        assert!(matches!(
            activities_url("not a url", "a:1", None),
            Err(ChannelError::InvalidServiceUrl(_))
        ));
        assert!(matches!(
            activities_url("mailto:bot@example.com", "a:1", None),
            Err(ChannelError::InvalidServiceUrl(_))
        ));
        for id in ["", ".", ".."] {
            assert!(matches!(
                activities_url("https://smba.example", id, None),
                Err(ChannelError::InvalidId { field: "conversation id", .. })
            ));
            assert!(matches!(
                activities_url("https://smba.example", "a:1", Some(id)),
                Err(ChannelError::InvalidId { field: "reply-to id", .. })
            ));
        }
    }

    #[test]
    fn test_trusted_hosts() {
        let client = ConnectorClient::new(reqwest::Client::new(), None);

        assert!(client.is_trusted("smba.trafficmanager.net"));
        assert!(client.is_trusted("api.botframework.com"));
        assert!(client.is_trusted("EUROPE.BotFramework.com"));
        assert!(!client.is_trusted("evilbotframework.com"));
        assert!(!client.is_trusted("botframework.com.evil.example"));
        assert!(!client.is_trusted("127.0.0.1"));

        let client = client.with_trusted_hosts(vec![" .Example.org ".to_owned(), String::new()]);
        assert!(client.is_trusted("bots.example.org"));
        assert!(!client.is_trusted("api.botframework.com"));
    }

    #[tokio::test]
    async fn test_send_keeps_odd_ids_in_their_segments() {
        let captured = CapturedIds::default();
        let router = Router::new()
            .route("/v3/conversations/{conv}/activities/{reply}", post(capture_ids))
            .with_state(Arc::clone(&captured));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = ConnectorClient::new(reqwest::Client::new(), None);
        client
            .send(
                &format!("http://{addr}/"),
                "a:1/x?y#z",
                Some("r/1?z"),
                &OutgoingActivity::text("hello"),
            )
            .await
            .unwrap();

        let captured = captured.lock();
        assert_eq!(*captured, vec![("a:1/x?y#z".to_owned(), "r/1?z".to_owned())]);
    }

    #[tokio::test]
    async fn test_untrusted_host_gets_no_token() {
        let captured = Captured::default();
        let service_url = serve(Arc::clone(&captured)).await;

        let client = ConnectorClient::new(
            reqwest::Client::new(),
            Some(Arc::new(TokenProvider::fixed("secret-token"))),
        );
        let result = client
            .send(&service_url, "conv", Some("7"), &OutgoingActivity::typing())
            .await;

        assert!(matches!(
            result,
            Err(ChannelError::UntrustedServiceUrl(host)) if host == "127.0.0.1"
        ));
        assert!(captured.lock().is_empty());
    }

    #[tokio::test]
    async fn test_send_with_bearer_token() {
        let captured = Captured::default();
        let service_url = serve(Arc::clone(&captured)).await;

        let client = ConnectorClient::new(
            reqwest::Client::new(),
            Some(Arc::new(TokenProvider::fixed("secret-token"))),
        )
        .with_trusted_hosts(vec!["127.0.0.1".to_owned()]);
        client
            .send(&service_url, "conv", Some("7"), &OutgoingActivity::typing())
            .await
            .unwrap();

        let captured = captured.lock();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].0.as_deref(), Some("Bearer secret-token"));
        assert_eq!(captured[0].1["type"], "typing");
    }

    #[tokio::test]
    async fn test_send_without_tokens_omits_auth() {
        let captured = Captured::default();
        let service_url = serve(Arc::clone(&captured)).await;

        let client = ConnectorClient::new(reqwest::Client::new(), None);
        client
            .send(&service_url, "conv", Some("7"), &OutgoingActivity::text("hello"))
            .await
            .unwrap();

        let captured = captured.lock();
        assert!(captured[0].0.is_none());
        assert_eq!(captured[0].1["text"], "hello");
    }

    #[tokio::test]
    async fn test_rejected_status() {
        let captured = Captured::default();
        let service_url = serve(captured).await;

        let client = ConnectorClient::new(reqwest::Client::new(), None);
        // No route without a reply id, so the server answers 404
        let result = client
            .send(&service_url, "conv", None, &OutgoingActivity::text("hello"))
            .await;

        assert!(matches!(result, Err(ChannelError::Rejected { status: 404, .. })));
    }
}
