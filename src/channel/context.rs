//! Per-turn capabilities exposed to the guard and command handlers.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Activity, Attachment, ChannelError, ConnectorClient, OutgoingActivity};

/// The minimal surface a turn needs from the chat channel.
///
/// The guard only uses [`user_id`](Self::user_id), [`send_text`](Self::send_text)
/// and [`send_typing`](Self::send_typing); command handlers additionally send
/// card attachments.
#[async_trait]
pub trait TurnContext: Send + Sync {
    /// Stable identifier of the user who sent the message. Compared by exact match.
    fn user_id(&self) -> &str;

    /// Sends a plain text message to the conversation.
    async fn send_text(&self, text: &str) -> Result<(), ChannelError>;

    /// Sends a single "typing" presence signal.
    async fn send_typing(&self) -> Result<(), ChannelError>;

    /// Sends a message carrying one attachment.
    async fn send_attachment(&self, attachment: Attachment) -> Result<(), ChannelError>;
}

/// A [`TurnContext`] that replies through the connector service.
#[derive(Debug, Clone)]
pub struct ConnectorContext {
    connector: Arc<ConnectorClient>,
    incoming: Arc<Activity>,
    user_id: String,
    conversation_id: String,
    service_url: String,
}

impl ConnectorContext {
    /// Creates a context for replying to `incoming`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::MissingField`] if the activity has no sender,
    /// conversation or service URL.
    pub fn new(connector: Arc<ConnectorClient>, incoming: Arc<Activity>) -> Result<Self, ChannelError> {
        let user_id = incoming
            .from
            .as_ref()
            .map(|from| from.id.clone())
            .ok_or(ChannelError::MissingField("from"))?;
        let conversation_id = incoming
            .conversation
            .as_ref()
            .map(|conversation| conversation.id.clone())
            .ok_or(ChannelError::MissingField("conversation"))?;
        let service_url = incoming
            .service_url
            .clone()
            .ok_or(ChannelError::MissingField("serviceUrl"))?;

        Ok(Self {
            connector,
            incoming,
            user_id,
            conversation_id,
            service_url,
        })
    }

    /// Returns the activity this context replies to.
    #[must_use]
    pub fn incoming(&self) -> &Activity {
        &self.incoming
    }

    async fn reply(&self, activity: OutgoingActivity) -> Result<(), ChannelError> {
        let activity = activity.in_reply_to(&self.incoming);
        self.connector
            .send(
                &self.service_url,
                &self.conversation_id,
                self.incoming.id.as_deref(),
                &activity,
            )
            .await
    }
}

#[async_trait]
impl TurnContext for ConnectorContext {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn send_text(&self, text: &str) -> Result<(), ChannelError> {
        self.reply(OutgoingActivity::text(text)).await
    }

    async fn send_typing(&self) -> Result<(), ChannelError> {
        self.reply(OutgoingActivity::typing()).await
    }

    async fn send_attachment(&self, attachment: Attachment) -> Result<(), ChannelError> {
        self.reply(OutgoingActivity::attachment(attachment)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelAccount, ConversationAccount};

    fn connector() -> Arc<ConnectorClient> {
        Arc::new(ConnectorClient::new(reqwest::Client::new(), None))
    }

    #[test]
    fn test_context_from_complete_activity() {
        let activity = Activity {
            kind: "message".to_owned(),
            from: Some(ChannelAccount {
                id: "29:user".to_owned(),
                ..ChannelAccount::default()
            }),
            conversation: Some(ConversationAccount {
                id: "conv".to_owned(),
            }),
            service_url: Some("https://smba.example".to_owned()),
            ..Activity::default()
        };

        let context = ConnectorContext::new(connector(), Arc::new(activity)).unwrap();
        assert_eq!(context.user_id(), "29:user");
    }

    #[test]
    fn test_context_requires_sender() {
        let activity = Activity {
            kind: "message".to_owned(),
            conversation: Some(ConversationAccount {
                id: "conv".to_owned(),
            }),
            service_url: Some("https://smba.example".to_owned()),
            ..Activity::default()
        };

        let result = ConnectorContext::new(connector(), Arc::new(activity));
        assert!(matches!(result, Err(ChannelError::MissingField("from"))));
    }

    #[test]
    fn test_context_requires_service_url() {
        let activity = Activity {
            kind: "message".to_owned(),
            from: Some(ChannelAccount::default()),
            conversation: Some(ConversationAccount::default()),
            ..Activity::default()
        };

        let result = ConnectorContext::new(connector(), Arc::new(activity));
        assert!(matches!(result, Err(ChannelError::MissingField("serviceUrl"))));
    }
}
