//! xpost - draft, generate and post to X from the command line
//!
//! Posts and threads are kept in a local SQLite store and published
//! through the X API v2 with OAuth 1.0a user-context signing.

pub mod config;
pub mod db;
pub mod error;
pub mod id;
pub mod logging;
pub mod oauth;
pub mod platforms;
pub mod poster;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{Result, XpostError};
pub use oauth::OAuthCredentials;
pub use poster::PostingClient;
pub use types::{Generation, Post, PostStatus, PostUpdate};
