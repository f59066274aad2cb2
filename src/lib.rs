pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod feed;
pub mod identity;
pub mod ledger;
pub mod lifecycle;
pub mod mailer;
pub mod models;
pub mod openapi;
pub mod rate_limit;
pub mod repo;
pub mod routes;
pub mod security;
pub mod session;
pub mod shell;
pub mod snapshot;
pub mod telemetry;

// Re-export commonly used items for tests / the binary
pub use config::AppConfig;
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
