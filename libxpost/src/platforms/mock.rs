//! Mock platform implementation for testing
//!
//! Records every call and can be told to fail on a given create call or on
//! delete. Compiled for all builds so integration tests can use it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::platforms::{Platform, RemotePost};

/// A create call as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
    pub text: String,
    pub reply_to: Option<String>,
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Zero-based index of the create attempt that fails, if any
    pub fail_on_create: Option<usize>,

    /// Create attempts so far, failed ones included
    pub attempts: Arc<AtomicUsize>,

    /// Error returned by failing calls
    pub error: RemoteError,

    /// Whether delete calls should succeed
    pub delete_succeeds: bool,

    /// Creates made so far (shared with clones of the config)
    pub created: Arc<Mutex<Vec<CreateCall>>>,

    /// Remote ids deleted so far
    pub deleted: Arc<Mutex<Vec<String>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fail_on_create: None,
            attempts: Arc::new(AtomicUsize::new(0)),
            error: RemoteError::Api {
                status: 503,
                detail: "Service Unavailable".to_string(),
            },
            delete_succeeds: true,
            created: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A mock that always succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// A mock whose `n`th create attempt (zero-based) fails with `error`
    pub fn failing_on(n: usize, error: RemoteError) -> Self {
        Self::new(MockConfig {
            fail_on_create: Some(n),
            error,
            ..Default::default()
        })
    }

    /// A mock whose deletes fail with `error`
    pub fn delete_failure(error: RemoteError) -> Self {
        Self::new(MockConfig {
            delete_succeeds: false,
            error,
            ..Default::default()
        })
    }

    /// Handle onto the recorded calls, usable after the mock is boxed
    pub fn recorder(&self) -> MockConfig {
        self.config.clone()
    }
}

impl MockConfig {
    pub fn created(&self) -> Vec<CreateCall> {
        self.created.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

/// Remote id the mock assigns to the `n`th create (zero-based)
pub fn mock_remote_id(n: usize) -> String {
    format!("mock_{}", n + 1)
}

#[async_trait]
impl Platform for MockPlatform {
    async fn create_post(&self, text: &str, reply_to: Option<&str>) -> Result<RemotePost, RemoteError> {
        let attempt = self.config.attempts.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_on_create == Some(attempt) {
            return Err(self.config.error.clone());
        }

        let mut created = self
            .config
            .created
            .lock()
            .map_err(|_| RemoteError::Network("mock state poisoned".to_string()))?;
        let index = created.len();

        created.push(CreateCall {
            text: text.to_string(),
            reply_to: reply_to.map(str::to_string),
        });

        Ok(RemotePost {
            id: mock_remote_id(index),
            text: text.to_string(),
        })
    }

    async fn delete_post(&self, remote_id: &str) -> Result<(), RemoteError> {
        if !self.config.delete_succeeds {
            return Err(self.config.error.clone());
        }

        self.config
            .deleted
            .lock()
            .map_err(|_| RemoteError::Network("mock state poisoned".to_string()))?
            .push(remote_id.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
