//! Configuration module for the bot.
//!
//! Handles loading of the bot registration credentials and runtime
//! settings from the environment.

mod settings;

pub use settings::{AppType, BotCredentials, BotSettings, ConfigError};
