//! HTTP endpoints: the Bot Framework messaging endpoint and a health check.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::channel::{Activity, ConnectorClient, ConnectorContext, TurnContext};
use crate::commands::{CommandError, CommandHandler, IncomingMessage};
use crate::config::{AppType, BotCredentials};

/// Shared state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    handler: Arc<CommandHandler>,
    connector: Arc<ConnectorClient>,
    config: ConfigSummary,
    start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(
        handler: Arc<CommandHandler>,
        connector: Arc<ConnectorClient>,
        credentials: &BotCredentials,
    ) -> Self {
        Self {
            handler,
            connector,
            config: ConfigSummary::from(credentials),
            start_time: Instant::now(),
        }
    }

    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Which credentials are configured, without revealing them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub has_app_id: bool,
    pub has_tenant_id: bool,
    pub app_type: AppType,
}

impl From<&BotCredentials> for ConfigSummary {
    fn from(credentials: &BotCredentials) -> Self {
        Self {
            has_app_id: credentials.app_id.is_some(),
            has_tenant_id: credentials.tenant_id.is_some(),
            app_type: credentials.app_type,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,

    /// RFC 3339 time of the check.
    pub timestamp: String,

    pub uptime_secs: u64,
    pub config: ConfigSummary,
}

/// Builds the router with all bot endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/messages", post(messages))
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: state.uptime_secs(),
        config: state.config.clone(),
    })
}

/// Runs one turn for an inbound activity.
///
/// Turn failures are reported to the user and logged; the channel always
/// gets `200` once the activity is accepted.
async fn messages(State(state): State<AppState>, Json(activity): Json<Activity>) -> StatusCode {
    if !activity.is_message() {
        debug!("Ignoring '{}' activity", activity.kind);
        return StatusCode::OK;
    }

    let activity = Arc::new(activity);
    let ctx = match ConnectorContext::new(Arc::clone(&state.connector), Arc::clone(&activity)) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            warn!("Rejecting activity: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let message = IncomingMessage::from(activity.as_ref());
    if let Err(e) = state.handler.handle(ctx.clone(), &message).await {
        error!("Turn failed for user {}: {}", message.user_id, e);
        report_error(ctx.as_ref(), &e).await;
    }

    StatusCode::OK
}

async fn report_error(ctx: &dyn TurnContext, e: &CommandError) {
    for text in [
        "The bot encountered an error. Please try again.".to_owned(),
        format!("Error details: {e}"),
    ] {
        if let Err(send_err) = ctx.send_text(&text).await {
            warn!("Failed to report error to user {}: {}", ctx.user_id(), send_err);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use super::*;
    use crate::auth::TokenProvider;
    use crate::channel::ADAPTIVE_CARD_CONTENT_TYPE;
    use crate::conversation::ConversationCounters;
    use crate::guard::{ProcessingRegistry, TurnGuard};

    type Replies = Arc<Mutex<Vec<Value>>>;

    /// Records each reply, with its `Authorization` header under `"auth"`.
    async fn capture(
        State(replies): State<Replies>,
        headers: HeaderMap,
        Json(mut body): Json<Value>,
    ) -> &'static str {
        if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            body["auth"] = Value::from(auth);
        }
        replies.lock().push(body);
        "{}"
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Starts a fake connector and the bot; returns (bot url, connector url, replies).
    async fn start() -> (String, String, Replies) {
        start_with(ConnectorClient::new(reqwest::Client::new(), None)).await
    }

    async fn start_with(connector: ConnectorClient) -> (String, String, Replies) {
        let replies = Replies::default();
        let connector_url = spawn(
            Router::new()
                .route("/v3/conversations/{conv}/activities/{reply}", post(capture))
                .with_state(Arc::clone(&replies)),
        )
        .await;

        let handler = CommandHandler::new(
            TurnGuard::new(ProcessingRegistry::new()),
            Arc::new(ConversationCounters::new()),
        );
        let credentials = BotCredentials {
            tenant_id: Some("tenant".to_owned()),
            ..BotCredentials::default()
        };
        let state = AppState::new(
            Arc::new(handler),
            Arc::new(connector),
            &credentials,
        );
        let bot_url = spawn(router(state)).await;

        (bot_url, connector_url, replies)
    }

    fn activity(service_url: &str, text: &str) -> Value {
        json!({
            "type": "message",
            "id": "act-1",
            "text": text,
            "from": {"id": "29:user", "name": "Ana"},
            "recipient": {"id": "28:bot", "name": "GuruTeam"},
            "conversation": {"id": "conv-1"},
            "serviceUrl": service_url,
            "channelId": "msteams"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (bot_url, _, _) = start().await;
        let body: Value = reqwest::get(format!("{bot_url}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
        assert_eq!(
            body["config"],
            json!({"hasAppId": false, "hasTenantId": true, "appType": "MultiTenant"})
        );
    }

    #[tokio::test]
    async fn test_message_is_echoed() {
        let (bot_url, connector_url, replies) = start().await;
        let response = reqwest::Client::new()
            .post(format!("{bot_url}/api/messages"))
            .json(&activity(&connector_url, "good morning"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let replies = replies.lock();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["text"], "Received: \"good morning\"");
        assert_eq!(replies[0]["replyToId"], "act-1");
    }

    #[tokio::test]
    async fn test_chart_sends_typing_then_card() {
        let (bot_url, connector_url, replies) = start().await;
        reqwest::Client::new()
            .post(format!("{bot_url}/api/messages"))
            .json(&activity(&connector_url, "chart line"))
            .send()
            .await
            .unwrap();

        let replies = replies.lock();
        assert_eq!(replies[0]["type"], "typing");
        let card = replies.last().unwrap();
        assert_eq!(card["attachments"][0]["contentType"], ADAPTIVE_CARD_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_non_message_activity_is_acknowledged() {
        let (bot_url, _, replies) = start().await;
        let response = reqwest::Client::new()
            .post(format!("{bot_url}/api/messages"))
            .json(&json!({"type": "conversationUpdate"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(replies.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_service_url_is_bad_request() {
        let (bot_url, _, _) = start().await;
        let response = reqwest::Client::new()
            .post(format!("{bot_url}/api/messages"))
            .json(&json!({
                "type": "message",
                "text": "hi",
                "from": {"id": "29:user"},
                "conversation": {"id": "conv-1"}
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delivery_failure_still_acknowledged() {
        let (bot_url, _, _) = start().await;
        // Nothing listens on this connector path, so every reply is rejected.
        let dead_connector = spawn(Router::new()).await;
        let response = reqwest::Client::new()
            .post(format!("{bot_url}/api/messages"))
            .json(&activity(&dead_connector, "hello"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_token_is_not_sent_to_untrusted_service_url() {
        let connector = ConnectorClient::new(
            reqwest::Client::new(),
            Some(Arc::new(TokenProvider::fixed("secret"))),
        );
        let (bot_url, connector_url, replies) = start_with(connector).await;

        let response = reqwest::Client::new()
            .post(format!("{bot_url}/api/messages"))
            .json(&activity(&connector_url, "chart bar"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        // 127.0.0.1 is not on the default allowlist, so nothing reached it.
        assert!(replies.lock().is_empty());
    }

    #[tokio::test]
    async fn test_token_is_sent_to_trusted_service_url() {
        let connector = ConnectorClient::new(
            reqwest::Client::new(),
            Some(Arc::new(TokenProvider::fixed("secret"))),
        )
        .with_trusted_hosts(vec!["127.0.0.1".to_owned()]);
        let (bot_url, connector_url, replies) = start_with(connector).await;

        reqwest::Client::new()
            .post(format!("{bot_url}/api/messages"))
            .json(&activity(&connector_url, "hello"))
            .send()
            .await
            .unwrap();

        let replies = replies.lock();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["auth"], "Bearer secret");
    }

    #[tokio::test]
    async fn test_unauthenticated_replies_carry_no_auth_header() {
        let (bot_url, connector_url, replies) = start().await;
        reqwest::Client::new()
            .post(format!("{bot_url}/api/messages"))
            .json(&activity(&connector_url, "hello"))
            .send()
            .await
            .unwrap();

        let replies = replies.lock();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].get("auth").is_none());
    }
}
