//! Access token acquisition for the connector and Graph API.

mod token;

pub use token::{
    AuthError, BOT_FRAMEWORK_SCOPE, BOT_FRAMEWORK_TENANT, ClientCredentials, GRAPH_SCOPE,
    TokenProvider,
};
