//! Posting client
//!
//! Wraps a [`Platform`] with dry-run handling and reply-chained thread
//! posting. Dry-run is fixed at construction so every operation honors it
//! the same way.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{RemoteError, Result};
use crate::oauth::OAuthCredentials;
use crate::platforms::x::XPlatform;
use crate::platforms::{Platform, RemotePost};

/// Prefix of the fake remote ids handed out in dry-run mode
pub const DRY_RUN_PREFIX: &str = "dry_";

/// Pause between consecutive thread posts
pub const THREAD_POST_DELAY: Duration = Duration::from_millis(1500);

/// Called after each post of a thread succeeds, before the next one starts
#[async_trait]
pub trait ThreadObserver: Send {
    async fn on_posted(&mut self, index: usize, posted: &RemotePost) -> Result<()>;
}

/// Observer that ignores progress
pub struct IgnoreProgress;

#[async_trait]
impl ThreadObserver for IgnoreProgress {
    async fn on_posted(&mut self, _index: usize, _posted: &RemotePost) -> Result<()> {
        Ok(())
    }
}

/// Failure part-way through a thread
#[derive(Debug)]
pub struct ThreadFailure {
    /// Zero-based index of the text that failed
    pub index: usize,
    /// Posts that made it before the failure
    pub posted: Vec<RemotePost>,
    pub error: crate::XpostError,
}

pub struct PostingClient {
    platform: Box<dyn Platform>,
    dry_run: bool,
    thread_delay: Duration,
    /// Last millisecond stamp handed out as a dry-run id
    last_dry_run_millis: AtomicI64,
}

impl PostingClient {
    pub fn new(platform: Box<dyn Platform>, dry_run: bool) -> Self {
        Self {
            platform,
            dry_run,
            thread_delay: THREAD_POST_DELAY,
            last_dry_run_millis: AtomicI64::new(0),
        }
    }

    /// Client for the configured X API
    pub fn from_config(config: &Config, credentials: OAuthCredentials, dry_run: bool) -> Result<Self> {
        if !dry_run && !credentials.is_complete() {
            tracing::warn!("API credentials are incomplete; the remote API will likely reject requests");
        }
        let platform = XPlatform::new(credentials, config.twitter.api_base.clone())?;
        Ok(Self::new(Box::new(platform), dry_run))
    }

    /// Override the pause between thread posts
    pub fn with_thread_delay(mut self, delay: Duration) -> Self {
        self.thread_delay = delay;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Current unix millis, bumped past the previous stamp so ids never repeat
    fn next_dry_run_millis(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self
            .last_dry_run_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or(now);
        now.max(previous + 1)
    }

    /// Post a single text, optionally as a reply
    pub async fn post_one(&self, text: &str, reply_to: Option<&str>) -> std::result::Result<RemotePost, RemoteError> {
        if self.dry_run {
            let id = format!("{}{}", DRY_RUN_PREFIX, self.next_dry_run_millis());
            info!(reply_to = ?reply_to, "[dry-run] Would post: {:?}", text);
            return Ok(RemotePost {
                id,
                text: text.to_string(),
            });
        }

        debug!(platform = self.platform.name(), "Posting {} chars", text.chars().count());
        self.platform.create_post(text, reply_to).await
    }

    /// Post texts in order, each replying to the previous one
    pub async fn post_thread(&self, texts: &[String]) -> Result<Vec<RemotePost>> {
        self.post_thread_observed(texts, None, &mut IgnoreProgress)
            .await
            .map_err(|failure| failure.error)
    }

    /// Post texts in order, chaining replies from `reply_to`
    ///
    /// Stops at the first failure. Posts already made are not rolled back;
    /// they are reported to `observer` as they happen and returned in the
    /// failure.
    pub async fn post_thread_observed(
        &self,
        texts: &[String],
        reply_to: Option<String>,
        observer: &mut dyn ThreadObserver,
    ) -> std::result::Result<Vec<RemotePost>, ThreadFailure> {
        let mut posted: Vec<RemotePost> = Vec::with_capacity(texts.len());
        let mut previous = reply_to;

        for (index, text) in texts.iter().enumerate() {
            if index > 0 && !self.dry_run && !self.thread_delay.is_zero() {
                sleep(self.thread_delay).await;
            }

            let result = match self.post_one(text, previous.as_deref()).await {
                Ok(result) => result,
                Err(error) => {
                    return Err(ThreadFailure {
                        index,
                        posted,
                        error: error.into(),
                    })
                }
            };

            if let Err(error) = observer.on_posted(index, &result).await {
                posted.push(result);
                return Err(ThreadFailure { index, posted, error });
            }

            previous = Some(result.id.clone());
            posted.push(result);
        }

        Ok(posted)
    }

    /// Delete a remote post
    pub async fn delete_one(&self, remote_id: &str) -> std::result::Result<(), RemoteError> {
        if self.dry_run {
            info!("[dry-run] Would delete remote post {}", remote_id);
            return Ok(());
        }

        self.platform.delete_post(remote_id).await
    }
}
