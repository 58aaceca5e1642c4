//! Repeating "typing" presence signal.
//!
//! Each signal is a spawned task that waits for the next tick, emits one
//! typing activity, and repeats. Cancellation is only observed while waiting
//! for a tick, so an emission already in flight always runs to completion.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::registry::RegistryState;
use crate::channel::TurnContext;

/// Registry entry for an active typing signal.
///
/// Dropping the entry cancels the task, so removing it from the map is
/// enough to stop future emissions.
#[derive(Debug)]
pub(super) struct TypingSignal {
    id: u64,
    cancel: CancellationToken,
}

impl TypingSignal {
    pub(super) fn new(id: u64) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
        }
    }

    pub(super) const fn id(&self) -> u64 {
        self.id
    }

    pub(super) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for TypingSignal {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Everything the periodic task needs, detached from the registry handle.
pub(super) struct PeriodicSignal {
    pub(super) state: Weak<Mutex<RegistryState>>,
    pub(super) user_id: String,
    pub(super) signal_id: u64,
    pub(super) emitter: Arc<dyn TurnContext>,
    pub(super) period: Duration,
    pub(super) cancel: CancellationToken,
}

impl PeriodicSignal {
    /// Spawns the repeating emission task.
    pub(super) fn spawn(self) {
        tokio::spawn(self.run());
    }

    async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.emitter.send_typing().await {
                error!(
                    "Error sending typing indicator for user {}: {}",
                    self.user_id, e
                );
                if let Some(state) = self.state.upgrade() {
                    state.lock().remove_typing_signal(&self.user_id, Some(self.signal_id));
                }
                break;
            }
        }

        debug!("Typing indicator task ended for user {}", self.user_id);
    }
}
