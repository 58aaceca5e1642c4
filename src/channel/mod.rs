//! Chat channel boundary.
//!
//! Provides the activity wire types, the connector client used to reply,
//! and the [`TurnContext`] capability handed to the guard and handlers.

mod activity;
mod connector;
mod context;

#[cfg(test)]
pub(crate) mod testing;

pub use activity::{
    ADAPTIVE_CARD_CONTENT_TYPE, Activity, Attachment, ChannelAccount, ConversationAccount,
    MESSAGE_TYPE, OutgoingActivity, TYPING_TYPE,
};
pub use connector::{ChannelError, ConnectorClient, DEFAULT_TRUSTED_SERVICE_HOSTS};
pub use context::{ConnectorContext, TurnContext};
