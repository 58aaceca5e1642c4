//! HTTP server for the bot.

mod routes;

pub use routes::{AppState, ConfigSummary, HealthResponse, router};
