//! Per-user processing state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::typing::{PeriodicSignal, TypingSignal};
use crate::channel::TurnContext;

/// Interval between repeated typing signals. Teams drops the indicator after
/// a few seconds, so it has to be re-sent.
pub const DEFAULT_TYPING_INTERVAL: Duration = Duration::from_millis(3000);

/// Mutable registry contents. Every access is a short synchronous section.
#[derive(Debug, Default)]
pub(super) struct RegistryState {
    /// User id -> id of the turn that marked it as processing.
    active_users: HashMap<String, u64>,

    /// User id -> active typing signal.
    typing_signals: HashMap<String, TypingSignal>,

    next_id: u64,
}

impl RegistryState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Removes the user's typing signal, optionally only if it is `signal_id`.
    pub(super) fn remove_typing_signal(&mut self, user_id: &str, signal_id: Option<u64>) -> bool {
        let matches = self
            .typing_signals
            .get(user_id)
            .is_some_and(|signal| signal_id.is_none_or(|id| signal.id() == id));

        if matches {
            self.typing_signals.remove(user_id);
        }
        matches
    }

    fn end(&mut self, user_id: &str) {
        self.active_users.remove(user_id);
        self.remove_typing_signal(user_id, None);
    }
}

/// Tracks which users have work in flight and which are receiving a typing
/// signal.
///
/// Create one at startup, share it by cloning (clones see the same state),
/// and call [`cleanup`](Self::cleanup) on shutdown.
#[derive(Debug, Clone)]
pub struct ProcessingRegistry {
    state: Arc<Mutex<RegistryState>>,
    typing_interval: Duration,
}

impl Default for ProcessingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            typing_interval: DEFAULT_TYPING_INTERVAL,
        }
    }

    /// Sets the interval between repeated typing signals.
    #[must_use]
    pub const fn with_typing_interval(mut self, interval: Duration) -> Self {
        self.typing_interval = interval;
        self
    }

    #[must_use]
    pub const fn typing_interval(&self) -> Duration {
        self.typing_interval
    }

    /// Returns true if work is in flight for `user_id`.
    #[must_use]
    pub fn is_processing(&self, user_id: &str) -> bool {
        self.state.lock().active_users.contains_key(user_id)
    }

    /// Marks `user_id` as processing. No-op if it already is.
    pub fn start_processing(&self, user_id: &str) {
        let mut state = self.state.lock();
        if !state.active_users.contains_key(user_id) {
            let id = state.next_id();
            state.active_users.insert(user_id.to_owned(), id);
        }
    }

    /// Clears the processing mark for `user_id` and stops its typing signal.
    pub fn end_processing(&self, user_id: &str) {
        self.state.lock().end(user_id);
    }

    /// Atomically marks `user_id` as processing unless it already is.
    ///
    /// The returned lease ends processing for this turn when dropped.
    #[must_use]
    pub fn try_begin(&self, user_id: &str) -> Option<ProcessingLease> {
        let mut state = self.state.lock();
        if state.active_users.contains_key(user_id) {
            return None;
        }

        let turn_id = state.next_id();
        state.active_users.insert(user_id.to_owned(), turn_id);

        Some(ProcessingLease {
            state: Arc::clone(&self.state),
            user_id: user_id.to_owned(),
            turn_id,
        })
    }

    /// Starts sending typing signals to `emitter` for `user_id`.
    ///
    /// The first signal is sent before this returns; later ones follow every
    /// [`typing_interval`](Self::typing_interval). Does nothing if a signal is
    /// already active for the user. Emission failures are logged and stop the
    /// signal; they are never returned to the caller.
    pub async fn start_typing_signal(&self, user_id: &str, emitter: Arc<dyn TurnContext>) {
        // Reserve the slot before the first await so a concurrent call sees it
        let (signal_id, cancel) = {
            let mut state = self.state.lock();
            if state.typing_signals.contains_key(user_id) {
                debug!("Typing indicator already active for user {}", user_id);
                return;
            }

            let signal = TypingSignal::new(state.next_id());
            let reserved = (signal.id(), signal.token());
            state.typing_signals.insert(user_id.to_owned(), signal);
            reserved
        };

        if let Err(e) = emitter.send_typing().await {
            warn!("Error sending typing indicator for user {}: {}", user_id, e);
            self.state.lock().remove_typing_signal(user_id, Some(signal_id));
            return;
        }

        // Stopped while the first signal was in flight
        if cancel.is_cancelled() {
            return;
        }

        PeriodicSignal {
            state: Arc::downgrade(&self.state),
            user_id: user_id.to_owned(),
            signal_id,
            emitter,
            period: self.typing_interval,
            cancel,
        }
        .spawn();
    }

    /// Stops the typing signal for `user_id`. No-op if none is active.
    pub fn stop_typing_signal(&self, user_id: &str) {
        self.state.lock().remove_typing_signal(user_id, None);
    }

    /// Returns true if a typing signal is active for `user_id`.
    #[must_use]
    pub fn has_typing_signal(&self, user_id: &str) -> bool {
        self.state.lock().typing_signals.contains_key(user_id)
    }

    /// Number of users with work in flight.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state.lock().active_users.len()
    }

    /// Forgets every user and stops every typing signal.
    pub fn cleanup(&self) {
        let mut state = self.state.lock();
        state.active_users.clear();
        state.typing_signals.clear();
        info!("All processing state cleared");
    }
}

/// Processing mark held for the duration of one turn.
///
/// Dropping the lease ends processing for the user, including when the turn
/// fails, panics, or is cancelled. A lease whose turn was already cleared
/// (for example by [`ProcessingRegistry::cleanup`]) leaves newer turns alone.
#[derive(Debug)]
pub struct ProcessingLease {
    state: Arc<Mutex<RegistryState>>,
    user_id: String,
    turn_id: u64,
}

impl ProcessingLease {
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for ProcessingLease {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.active_users.get(&self.user_id) == Some(&self.turn_id) {
            state.end(&self.user_id);
            debug!("State cleared for user {}", self.user_id);
        }
    }
}
