//! Remote API backends
//!
//! A [`Platform`] performs the actual network calls for creating and deleting
//! posts. The [`crate::poster::PostingClient`] wraps a platform and adds
//! dry-run handling and thread chaining on top.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

pub mod mock;
pub mod x;

/// A post as acknowledged by the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePost {
    pub id: String,
    pub text: String,
}

/// Backend for the remote posting API
#[async_trait]
pub trait Platform: Send + Sync {
    /// Create a post, optionally as a reply to `reply_to`
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Api` on a non-2xx response, `RemoteError::Network`
    /// if the request could not be completed.
    async fn create_post(
        &self,
        text: &str,
        reply_to: Option<&str>,
    ) -> std::result::Result<RemotePost, RemoteError>;

    /// Delete a post by its remote id
    async fn delete_post(&self, remote_id: &str) -> std::result::Result<(), RemoteError>;

    /// Lowercase identifier for logging
    fn name(&self) -> &str;
}
