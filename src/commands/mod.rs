//! Command handling module.
//!
//! Parses inbound messages into commands and sends the replies. Commands
//! are plain words (`info`, `chart pie`), slash commands (`/reset`) or
//! Adaptive Card submit payloads.

mod handler;
mod types;

pub use handler::{CommandError, CommandHandler};
pub use types::{BotCommand, CHART_USAGE, CUSTOM_CHART_USAGE, CustomChartArgs, IncomingMessage};
