//! Command handler implementation.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::{JoinError, spawn_blocking};
use tracing::{debug, info, warn};

use super::types::{BotCommand, CustomChartArgs, IncomingMessage};
use crate::channel::{Attachment, ChannelError, TurnContext};
use crate::charts::{
    Chart, ChartError, ChartKind, SvgRenderer, charts_menu_card, custom_chart_card,
    sample_chart_card,
};
use crate::conversation::ConversationCounters;
use crate::directory::DirectoryClient;
use crate::guard::TurnGuard;

const NOT_AVAILABLE: &str = "Not available";

/// Errors that abort a turn.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to send reply: {0}")]
    Channel(#[from] ChannelError),

    #[error("chart rendering task failed: {0}")]
    Render(#[from] JoinError),
}

/// Dispatches parsed commands and sends the replies.
#[derive(Debug)]
pub struct CommandHandler {
    guard: TurnGuard,
    counters: Arc<ConversationCounters>,
    directory: Option<Arc<DirectoryClient>>,
    renderer: SvgRenderer,
}

impl CommandHandler {
    /// Creates a handler without a directory client.
    #[must_use]
    pub fn new(guard: TurnGuard, counters: Arc<ConversationCounters>) -> Self {
        Self {
            guard,
            counters,
            directory: None,
            renderer: SvgRenderer::default(),
        }
    }

    /// Sets the client used to look up e-mail addresses.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<DirectoryClient>) -> Self {
        self.directory = Some(directory);
        self
    }

    #[must_use]
    pub const fn guard(&self) -> &TurnGuard {
        &self.guard
    }

    #[must_use]
    pub fn counters(&self) -> &ConversationCounters {
        &self.counters
    }

    /// Handles one inbound message.
    ///
    /// Chart and info commands run inside the turn guard, so a second one from
    /// the same user is answered with the wait notice instead.
    pub async fn handle(
        &self,
        ctx: Arc<dyn TurnContext>,
        message: &IncomingMessage,
    ) -> Result<(), CommandError> {
        let count = self.counters.increment(&message.conversation_id);
        let command = message.command();
        info!(
            "Message #{} in conversation {} from {}: {}",
            count, message.conversation_id, message.user_id, command
        );

        match command {
            BotCommand::Info => {
                let outcome = self
                    .guard
                    .run(Arc::clone(&ctx), || self.send_info(ctx.as_ref(), message))
                    .await?;
                if outcome.is_rejected() {
                    debug!("Info request from {} rejected", message.user_id);
                }
            }
            BotCommand::Chart(kind) => {
                let outcome = self
                    .guard
                    .run(Arc::clone(&ctx), || self.send_sample_chart(ctx.as_ref(), kind))
                    .await?;
                if outcome.is_rejected() {
                    debug!("Chart request from {} rejected", message.user_id);
                }
            }
            BotCommand::CustomChart(args) => {
                let outcome = self
                    .guard
                    .run(Arc::clone(&ctx), || self.send_custom_chart(ctx.as_ref(), args))
                    .await?;
                if outcome.is_rejected() {
                    debug!("Custom chart request from {} rejected", message.user_id);
                }
            }
            BotCommand::Reset => {
                self.counters.reset(&message.conversation_id);
                ctx.send_text("🔄 Conversation reset.").await?;
            }
            BotCommand::Greeting => ctx.send_text(&greeting()).await?,
            BotCommand::ChartsMenu => {
                ctx.send_attachment(Attachment::adaptive_card(charts_menu_card()))
                    .await?;
            }
            BotCommand::Count => {
                let count = self.counters.get(&message.conversation_id);
                ctx.send_text(&format!("This conversation has {count} message(s)."))
                    .await?;
            }
            BotCommand::Usage(usage) => ctx.send_text(usage).await?,
            BotCommand::Echo(text) => ctx.send_text(&format!("Received: \"{text}\"")).await?,
        }

        Ok(())
    }

    async fn send_info(
        &self,
        ctx: &dyn TurnContext,
        message: &IncomingMessage,
    ) -> Result<(), CommandError> {
        let email = self.lookup_email(message).await;
        let name = message.user_name.as_deref().unwrap_or("Unknown");

        let text = format!(
            "**User information**\n\
             - Name: {name}\n\
             - ID: {}\n\
             - Email: {email}",
            message.user_id
        );
        ctx.send_text(&text).await?;
        Ok(())
    }

    async fn lookup_email(&self, message: &IncomingMessage) -> String {
        let Some(directory) = &self.directory else {
            debug!("No directory client configured");
            return NOT_AVAILABLE.to_owned();
        };
        let Some(object_id) = message.aad_object_id.as_deref() else {
            debug!("User {} has no directory object id", message.user_id);
            return NOT_AVAILABLE.to_owned();
        };

        match directory.get_user(object_id).await {
            Ok(user) => user.email().unwrap_or(NOT_AVAILABLE).to_owned(),
            Err(e) => {
                warn!("Failed to fetch e-mail for {}: {}", message.user_id, e);
                NOT_AVAILABLE.to_owned()
            }
        }
    }

    async fn send_sample_chart(
        &self,
        ctx: &dyn TurnContext,
        kind: ChartKind,
    ) -> Result<(), CommandError> {
        let renderer = self.renderer.clone();
        let card = spawn_blocking(move || {
            let chart = Chart::sample(kind);
            renderer
                .render_data_uri(&chart)
                .map(|uri| sample_chart_card(&chart, &uri))
        })
        .await?;
        send_chart_card(ctx, card).await
    }

    async fn send_custom_chart(
        &self,
        ctx: &dyn TurnContext,
        args: CustomChartArgs,
    ) -> Result<(), CommandError> {
        let renderer = self.renderer.clone();
        let card = spawn_blocking(move || -> Result<serde_json::Value, ChartError> {
            let chart = Chart::custom(args.kind, args.title, args.labels, args.values)?;
            renderer
                .render_data_uri(&chart)
                .map(|uri| custom_chart_card(&chart, &uri))
        })
        .await?;
        send_chart_card(ctx, card).await
    }
}

/// Sends the rendered card, or the error text if the chart could not be built.
async fn send_chart_card(
    ctx: &dyn TurnContext,
    card: Result<serde_json::Value, ChartError>,
) -> Result<(), CommandError> {
    match card {
        Ok(card) => ctx.send_attachment(Attachment::adaptive_card(card)).await?,
        Err(e) => {
            warn!("Failed to generate chart for {}: {}", ctx.user_id(), e);
            ctx.send_text(&format!("⚠️ Failed to generate chart: {e}"))
                .await?;
        }
    }
    Ok(())
}

fn greeting() -> String {
    let mut text = "Hi! 👋 I'm GuruTeam Bot.\n\nAvailable commands:".to_owned();
    for (usage, description) in BotCommand::all_commands() {
        text.push_str(&format!("\n- **{usage}**: {description}"));
    }
    text
}
