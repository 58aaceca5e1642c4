//! GuruTeam Bot Library
//!
//! A Microsoft Teams bot served over the Bot Framework messaging endpoint.
//!
//! This crate provides the core functionality for:
//! - Keeping each user to one request in flight, with a repeating typing indicator
//! - Parsing chat commands and replying through the connector service
//! - Rendering bar, line and pie charts into Adaptive Cards
//! - Looking up user profiles in the directory

pub mod auth;
pub mod channel;
pub mod charts;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod directory;
pub mod guard;
pub mod server;
