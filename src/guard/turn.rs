//! Single-flight turn execution with a typing indicator.

use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::ProcessingRegistry;
use crate::channel::TurnContext;

/// Notice sent when a user sends a message while the previous one is still running.
pub const DEFAULT_WAIT_MESSAGE: &str =
    "⏳ Please wait, I'm still processing your previous request...";

/// Result of a guarded turn that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum GuardOutcome<T> {
    /// The handler ran and returned this value.
    Completed(T),

    /// Another turn was in flight for the user; the handler did not run.
    Rejected,
}

impl<T> GuardOutcome<T> {
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }

    /// Returns the handler's value, or `None` if the turn was rejected.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Rejected => None,
        }
    }
}

/// Runs handlers so that each user has at most one in flight.
#[derive(Debug, Clone)]
pub struct TurnGuard {
    registry: ProcessingRegistry,
    wait_message: String,
}

impl TurnGuard {
    /// Creates a guard over `registry`.
    #[must_use]
    pub fn new(registry: ProcessingRegistry) -> Self {
        Self {
            registry,
            wait_message: DEFAULT_WAIT_MESSAGE.to_owned(),
        }
    }

    /// Sets the notice sent to rejected users.
    #[must_use]
    pub fn with_wait_message(mut self, message: impl Into<String>) -> Self {
        self.wait_message = message.into();
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &ProcessingRegistry {
        &self.registry
    }

    /// Runs `handler` for the user behind `ctx`.
    ///
    /// If the user already has a turn in flight, sends the wait notice once
    /// and returns [`GuardOutcome::Rejected`] without calling `handler`.
    /// Otherwise marks the user as processing, starts the typing signal and
    /// awaits the handler. Processing state and the typing signal are released
    /// on every exit path before the handler's result is returned. Handler
    /// errors are returned unchanged; typing failures never are.
    pub async fn run<T, E, F, Fut>(
        &self,
        ctx: Arc<dyn TurnContext>,
        handler: F,
    ) -> Result<GuardOutcome<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let user_id = ctx.user_id().to_owned();

        let Some(lease) = self.registry.try_begin(&user_id) else {
            info!("User {} already has a message in progress", user_id);
            if let Err(e) = ctx.send_text(&self.wait_message).await {
                warn!("Failed to send wait notice to user {}: {}", user_id, e);
            }
            return Ok(GuardOutcome::Rejected);
        };

        self.registry
            .start_typing_signal(&user_id, Arc::clone(&ctx))
            .await;
        debug!("Typing indicator started for user {}", user_id);

        let result = handler().await;
        drop(lease);

        match result {
            Ok(value) => {
                info!("Processing completed for user {}", user_id);
                Ok(GuardOutcome::Completed(value))
            }
            Err(e) => {
                error!("Processing failed for user {}: {}", user_id, e);
                Err(e)
            }
        }
    }
}
