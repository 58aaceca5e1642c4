//! Directory (Graph API) profile lookups.

mod client;

pub use client::{DirectoryClient, DirectoryError, DirectoryUser};
