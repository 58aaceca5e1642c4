//! Turn processing guard.
//!
//! Keeps at most one turn in flight per user, emits a periodic typing
//! signal while it runs, and releases both on every exit path.
//!
//! Per user the state moves `Idle -> Processing -> Processing+Typing -> Idle`.
//! A turn arriving while the user is processing is rejected without changing
//! that state.

mod registry;
mod turn;
mod typing;

pub use registry::{DEFAULT_TYPING_INTERVAL, ProcessingLease, ProcessingRegistry};
pub use turn::{DEFAULT_WAIT_MESSAGE, GuardOutcome, TurnGuard};
