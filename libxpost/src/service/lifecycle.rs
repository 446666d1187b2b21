//! Post lifecycle: drafting, editing, posting and deleting
//!
//! Status transitions:
//!
//! ```text
//! draft  --post--> posted
//! draft  --post (fails)--> failed
//! failed --post--> posted | failed
//! posted --post--> Conflict
//! any    --delete--> (removed; remote post deleted first if there is one)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, XpostError};
use crate::platforms::RemotePost;
use crate::poster::{PostingClient, ThreadFailure, ThreadObserver};
use crate::types::{length_warning, Post, PostStatus, PostUpdate};
use crate::Database;

/// Drives posts through their states using the store and a posting client
pub struct PostLifecycle {
    db: Arc<Database>,
    client: PostingClient,
}

/// A created or edited draft
#[derive(Debug, Clone, Serialize)]
pub struct DraftOutcome {
    pub post: Post,
    pub warning: Option<String>,
}

/// Result of posting a standalone post or a thread
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PostOutcome {
    Single {
        dry_run: bool,
        post: Post,
        remote: RemotePost,
    },
    Thread {
        dry_run: bool,
        /// How many members were posted by this call
        posted_now: usize,
        /// Every member of the thread, in position order
        posts: Vec<Post>,
    },
}

/// Result of deleting a post
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub post: Post,
    pub dry_run: bool,
    pub remote_deleted: bool,
}

/// Marks each thread member posted as soon as the remote accepts it
struct RecordThreadProgress<'a> {
    db: &'a Database,
    pending: &'a [Post],
}

#[async_trait]
impl<'a> ThreadObserver for RecordThreadProgress<'a> {
    async fn on_posted(&mut self, index: usize, posted: &RemotePost) -> Result<()> {
        let member = &self.pending[index];
        self.db
            .update_post(&member.id, PostUpdate::posted(posted.id.clone()))
            .await?
            .ok_or_else(|| XpostError::NotFound(member.id.clone()))?;
        info!(post_id = %member.id, remote_id = %posted.id, position = member.thread_pos, "Thread member posted");
        Ok(())
    }
}

impl PostLifecycle {
    pub fn new(db: Arc<Database>, client: PostingClient) -> Self {
        Self { db, client }
    }

    pub fn is_dry_run(&self) -> bool {
        self.client.is_dry_run()
    }

    async fn require(&self, id: &str) -> Result<Post> {
        self.db
            .get_post(id)
            .await?
            .ok_or_else(|| XpostError::NotFound(id.to_string()))
    }

    /// Create a standalone draft
    ///
    /// Content over 280 characters is accepted with a warning.
    pub async fn create_draft(&self, content: &str) -> Result<DraftOutcome> {
        let content = content.trim();
        if content.is_empty() {
            return Err(XpostError::InvalidArguments(
                "Content cannot be empty".to_string(),
            ));
        }

        let warning = length_warning(content);
        if let Some(w) = &warning {
            warn!("{}", w);
        }

        let post = self.db.create_post(content, None, 0, None).await?;
        info!(post_id = %post.id, "Created draft");
        Ok(DraftOutcome { post, warning })
    }

    /// Replace the content of a draft
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Conflict` if the post is not a draft.
    pub async fn edit(&self, id: &str, content: &str) -> Result<DraftOutcome> {
        let content = content.trim();
        if content.is_empty() {
            return Err(XpostError::InvalidArguments(
                "Content cannot be empty".to_string(),
            ));
        }

        let existing = self.require(id).await?;
        if existing.status != PostStatus::Draft {
            return Err(XpostError::Conflict {
                message: format!("Can only edit drafts (current status: {})", existing.status),
                remote_id: existing.remote_id,
            });
        }

        let warning = length_warning(content);
        if let Some(w) = &warning {
            warn!(post_id = %id, "{}", w);
        }

        let post = self
            .db
            .update_post(id, PostUpdate::content(content))
            .await?
            .ok_or_else(|| XpostError::NotFound(id.to_string()))?;

        info!(post_id = %id, "Edited draft");
        Ok(DraftOutcome { post, warning })
    }

    /// Remove a local record without touching the remote API
    pub async fn discard(&self, id: &str) -> Result<Post> {
        let post = self.require(id).await?;
        self.db.delete_post(id).await?;
        info!(post_id = %id, "Discarded local record");
        Ok(post)
    }

    /// Post a standalone post, or the thread it belongs to
    ///
    /// For threads only members not yet `posted` are sent, chained as replies
    /// to the last member already posted, so a partially posted thread can be
    /// resumed by posting any of its remaining members.
    pub async fn post(&self, id: &str) -> Result<PostOutcome> {
        let post = self.require(id).await?;

        if post.status == PostStatus::Posted {
            let remote_id = post.remote_id.clone().unwrap_or_default();
            return Err(XpostError::Conflict {
                message: format!("Already posted (remote id: {})", remote_id),
                remote_id: post.remote_id,
            });
        }

        match post.thread_id.clone() {
            Some(thread_id) => self.post_thread(&thread_id).await,
            None => self.post_single(post).await,
        }
    }

    async fn post_single(&self, post: Post) -> Result<PostOutcome> {
        match self.client.post_one(&post.content, None).await {
            Ok(remote) => {
                let updated = self
                    .db
                    .update_post(&post.id, PostUpdate::posted(remote.id.clone()))
                    .await?
                    .ok_or_else(|| XpostError::NotFound(post.id.clone()))?;

                info!(post_id = %post.id, remote_id = %remote.id, "Posted");
                Ok(PostOutcome::Single {
                    dry_run: self.is_dry_run(),
                    post: updated,
                    remote,
                })
            }
            Err(error) => {
                warn!(post_id = %post.id, "Posting failed: {}", error);
                if let Err(store_error) = self
                    .db
                    .update_post(&post.id, PostUpdate::status(PostStatus::Failed))
                    .await
                {
                    tracing::error!(post_id = %post.id, "Could not mark post failed: {}", store_error);
                }
                Err(XpostError::PostFailed {
                    post_id: post.id,
                    source: error,
                })
            }
        }
    }

    async fn post_thread(&self, thread_id: &str) -> Result<PostOutcome> {
        let members = self.db.list_thread(thread_id).await?;

        let first_pending = members
            .iter()
            .position(|m| m.status != PostStatus::Posted)
            .unwrap_or(members.len());

        // Resume the reply chain from the last member already posted
        let reply_to = members[..first_pending]
            .iter()
            .rev()
            .find_map(|m| m.remote_id.clone());

        let pending: Vec<Post> = members
            .iter()
            .skip(first_pending)
            .filter(|m| m.status != PostStatus::Posted)
            .cloned()
            .collect();

        info!(
            thread_id = %thread_id,
            total = members.len(),
            pending = pending.len(),
            "Posting thread"
        );

        let texts: Vec<String> = pending.iter().map(|m| m.content.clone()).collect();
        let mut progress = RecordThreadProgress {
            db: &self.db,
            pending: &pending,
        };

        let posted_now = match self
            .client
            .post_thread_observed(&texts, reply_to, &mut progress)
            .await
        {
            Ok(results) => results.len(),
            Err(ThreadFailure { index, posted, error }) => {
                warn!(
                    thread_id = %thread_id,
                    posted = posted.len(),
                    "Thread posting stopped at position {}: {}",
                    pending[index].thread_pos,
                    error
                );
                return Err(match error {
                    XpostError::Remote(source) => XpostError::PostFailed {
                        post_id: pending[index].id.clone(),
                        source,
                    },
                    other => other,
                });
            }
        };

        let posts = self.db.list_thread(thread_id).await?;
        Ok(PostOutcome::Thread {
            dry_run: self.is_dry_run(),
            posted_now,
            posts,
        })
    }

    /// Delete a post locally, deleting the remote post first if it has one
    ///
    /// If the remote delete fails the local record is left untouched.
    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome> {
        let post = self.require(id).await?;

        let mut remote_deleted = false;
        if let Some(remote_id) = post.remote_id.as_deref().filter(|r| !r.is_empty()) {
            self.client.delete_one(remote_id).await?;
            remote_deleted = true;
            info!(post_id = %id, remote_id = %remote_id, "Deleted remote post");
        }

        self.db.delete_post(id).await?;
        info!(post_id = %id, "Deleted local record");

        Ok(DeleteOutcome {
            post,
            dry_run: self.is_dry_run(),
            remote_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::platforms::mock::MockPlatform;
    use crate::poster::DRY_RUN_PREFIX;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn setup(platform: MockPlatform, dry_run: bool) -> (PostLifecycle, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open(temp_dir.path().join("xpost.db")).await.unwrap());
        let client = PostingClient::new(Box::new(platform), dry_run).with_thread_delay(Duration::ZERO);
        (PostLifecycle::new(Arc::clone(&db), client), db, temp_dir)
    }

    async fn seed_thread(db: &Database, thread_id: &str, count: i64) -> Vec<Post> {
        let mut posts = Vec::new();
        for pos in 0..count {
            posts.push(
                db.create_post(&format!("part {}", pos), Some(thread_id), pos, None)
                    .await
                    .unwrap(),
            );
        }
        posts
    }

    #[tokio::test]
    async fn test_create_draft_rejects_empty() {
        let (lifecycle, _db, _tmp) = setup(MockPlatform::success(), true).await;
        let result = lifecycle.create_draft("   ").await;
        assert!(matches!(result, Err(XpostError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_create_draft_warns_when_long() {
        let (lifecycle, _db, _tmp) = setup(MockPlatform::success(), true).await;
        let outcome = lifecycle.create_draft(&"x".repeat(300)).await.unwrap();
        assert_eq!(outcome.warning.as_deref(), Some("text is 300 chars (max 280)"));
        assert_eq!(outcome.post.content.len(), 300);
    }

    #[tokio::test]
    async fn test_edit_draft() {
        let (lifecycle, db, _tmp) = setup(MockPlatform::success(), true).await;
        let draft = lifecycle.create_draft("first").await.unwrap().post;

        let outcome = lifecycle.edit(&draft.id, "second").await.unwrap();
        assert_eq!(outcome.post.content, "second");
        assert!(outcome.warning.is_none());
        assert_eq!(db.get_post(&draft.id).await.unwrap().unwrap().content, "second");
    }

    #[tokio::test]
    async fn test_edit_over_limit_warns_but_saves() {
        let (lifecycle, db, _tmp) = setup(MockPlatform::success(), true).await;
        let draft = lifecycle.create_draft("short").await.unwrap().post;

        let outcome = lifecycle.edit(&draft.id, &"y".repeat(300)).await.unwrap();
        assert_eq!(outcome.warning.as_deref(), Some("text is 300 chars (max 280)"));

        let stored = db.get_post(&draft.id).await.unwrap().unwrap();
        assert_eq!(stored.content.chars().count(), 300);
        assert_eq!(stored.status, PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_edit_non_draft_is_conflict() {
        let (lifecycle, _db, _tmp) = setup(MockPlatform::success(), true).await;
        let draft = lifecycle.create_draft("first").await.unwrap().post;
        lifecycle.post(&draft.id).await.unwrap();

        let result = lifecycle.edit(&draft.id, "too late").await;
        assert!(matches!(result, Err(XpostError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_edit_unknown_is_not_found() {
        let (lifecycle, _db, _tmp) = setup(MockPlatform::success(), true).await;
        let result = lifecycle.edit("nope", "text").await;
        assert!(matches!(result, Err(XpostError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_post_unknown_is_not_found() {
        let (lifecycle, _db, _tmp) = setup(MockPlatform::success(), true).await;
        let result = lifecycle.post("nope").await;
        assert!(matches!(result, Err(XpostError::NotFound(id)) if id == "nope"));
    }

    #[tokio::test]
    async fn test_single_post_success() {
        let mock = MockPlatform::success();
        let recorder = mock.recorder();
        let (lifecycle, _db, _tmp) = setup(mock, false).await;
        let draft = lifecycle.create_draft("Hello world").await.unwrap().post;

        match lifecycle.post(&draft.id).await.unwrap() {
            PostOutcome::Single { dry_run, post, remote } => {
                assert!(!dry_run);
                assert_eq!(post.status, PostStatus::Posted);
                assert_eq!(post.remote_id.as_deref(), Some(remote.id.as_str()));
                assert!(post.posted_at.is_some());
            }
            other => panic!("expected single outcome, got {:?}", other),
        }
        assert_eq!(recorder.created().len(), 1);
    }

    #[tokio::test]
    async fn test_single_post_failure_marks_failed_then_retry_succeeds() {
        let mock = MockPlatform::failing_on(
            0,
            RemoteError::Api {
                status: 500,
                detail: "Internal Error".into(),
            },
        );
        let (lifecycle, db, _tmp) = setup(mock, false).await;
        let draft = lifecycle.create_draft("Hello").await.unwrap().post;

        let error = lifecycle.post(&draft.id).await.unwrap_err();
        match &error {
            XpostError::PostFailed { post_id, source } => {
                assert_eq!(post_id, &draft.id);
                assert!(matches!(source, RemoteError::Api { status: 500, .. }));
            }
            other => panic!("expected PostFailed, got {:?}", other),
        }

        let failed = db.get_post(&draft.id).await.unwrap().unwrap();
        assert_eq!(failed.status, PostStatus::Failed);
        assert!(failed.remote_id.is_none());

        // The mock only fails its first call
        let outcome = lifecycle.post(&draft.id).await.unwrap();
        assert!(matches!(outcome, PostOutcome::Single { .. }));
        assert_eq!(
            db.get_post(&draft.id).await.unwrap().unwrap().status,
            PostStatus::Posted
        );
    }

    #[tokio::test]
    async fn test_repost_is_conflict_with_remote_id() {
        let (lifecycle, _db, _tmp) = setup(MockPlatform::success(), true).await;
        let draft = lifecycle.create_draft("Hello world").await.unwrap().post;
        lifecycle.post(&draft.id).await.unwrap();

        match lifecycle.post(&draft.id).await.unwrap_err() {
            XpostError::Conflict { message, remote_id } => {
                let remote_id = remote_id.unwrap();
                assert!(remote_id.starts_with(DRY_RUN_PREFIX));
                assert!(message.contains(&remote_id));
            }
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_thread_posts_all_members_in_order() {
        let mock = MockPlatform::success();
        let recorder = mock.recorder();
        let (lifecycle, db, _tmp) = setup(mock, false).await;
        let members = seed_thread(&db, "thread1", 3).await;

        // Posting any member posts the whole thread
        let outcome = lifecycle.post(&members[1].id).await.unwrap();
        match outcome {
            PostOutcome::Thread { posted_now, posts, .. } => {
                assert_eq!(posted_now, 3);
                assert!(posts.iter().all(|p| p.status == PostStatus::Posted));
                let remote: Vec<_> = posts.iter().map(|p| p.remote_id.clone().unwrap()).collect();
                assert_eq!(remote, vec!["mock_1", "mock_2", "mock_3"]);
            }
            other => panic!("expected thread outcome, got {:?}", other),
        }

        let calls = recorder.created();
        let texts: Vec<&str> = calls.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["part 0", "part 1", "part 2"]);
        assert_eq!(calls[2].reply_to.as_deref(), Some("mock_2"));
    }

    #[tokio::test]
    async fn test_thread_failure_keeps_posted_prefix() {
        let mock = MockPlatform::failing_on(1, RemoteError::Network("connection reset".into()));
        let (lifecycle, db, _tmp) = setup(mock, false).await;
        let members = seed_thread(&db, "thread1", 3).await;

        let error = lifecycle.post(&members[0].id).await.unwrap_err();
        match error {
            XpostError::PostFailed { post_id, .. } => assert_eq!(post_id, members[1].id),
            other => panic!("expected PostFailed, got {:?}", other),
        }

        let after = db.list_thread("thread1").await.unwrap();
        assert_eq!(after[0].status, PostStatus::Posted);
        assert_eq!(after[0].remote_id.as_deref(), Some("mock_1"));
        assert_eq!(after[1].status, PostStatus::Draft);
        assert_eq!(after[2].status, PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_thread_resume_posts_only_remaining_tail() {
        let mock = MockPlatform::success();
        let recorder = mock.recorder();
        let (lifecycle, db, _tmp) = setup(mock, false).await;
        let members = seed_thread(&db, "thread1", 3).await;

        // Simulate an earlier run that got the first member out
        db.update_post(&members[0].id, PostUpdate::posted("earlier_1"))
            .await
            .unwrap();

        let outcome = lifecycle.post(&members[2].id).await.unwrap();
        assert!(matches!(outcome, PostOutcome::Thread { posted_now: 2, .. }));

        let calls = recorder.created();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].text, "part 1");
        assert_eq!(calls[0].reply_to.as_deref(), Some("earlier_1"));
        assert_eq!(calls[1].reply_to.as_deref(), Some("mock_1"));

        let after = db.list_thread("thread1").await.unwrap();
        assert_eq!(after[0].remote_id.as_deref(), Some("earlier_1"));
        assert!(after.iter().all(|p| p.status == PostStatus::Posted));
    }

    #[tokio::test]
    async fn test_delete_draft_skips_remote() {
        let mock = MockPlatform::success();
        let recorder = mock.recorder();
        let (lifecycle, db, _tmp) = setup(mock, false).await;
        let draft = lifecycle.create_draft("bye").await.unwrap().post;

        let outcome = lifecycle.delete(&draft.id).await.unwrap();
        assert!(!outcome.remote_deleted);
        assert!(recorder.deleted().is_empty());
        assert!(db.get_post(&draft.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_posted_deletes_remote_first() {
        let mock = MockPlatform::success();
        let recorder = mock.recorder();
        let (lifecycle, db, _tmp) = setup(mock, false).await;
        let draft = lifecycle.create_draft("bye").await.unwrap().post;
        lifecycle.post(&draft.id).await.unwrap();

        let outcome = lifecycle.delete(&draft.id).await.unwrap();
        assert!(outcome.remote_deleted);
        assert_eq!(recorder.deleted(), vec!["mock_1".to_string()]);
        assert!(db.get_post(&draft.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remote_delete_failure_keeps_local_record() {
        let mock = MockPlatform::delete_failure(RemoteError::Api {
            status: 404,
            detail: "Not Found".into(),
        });
        let (lifecycle, db, _tmp) = setup(mock, false).await;
        let post = db.create_post("posted", None, 0, None).await.unwrap();
        db.update_post(&post.id, PostUpdate::posted("12345")).await.unwrap();

        let result = lifecycle.delete(&post.id).await;
        assert!(matches!(
            result,
            Err(XpostError::Remote(RemoteError::Api { status: 404, .. }))
        ));
        assert!(db.get_post(&post.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let (lifecycle, _db, _tmp) = setup(MockPlatform::success(), true).await;
        assert!(matches!(
            lifecycle.delete("nope").await,
            Err(XpostError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_discard_removes_record() {
        let (lifecycle, db, _tmp) = setup(MockPlatform::success(), true).await;
        let draft = lifecycle.create_draft("temp").await.unwrap().post;

        lifecycle.discard(&draft.id).await.unwrap();
        assert!(db.get_post(&draft.id).await.unwrap().is_none());
        assert!(matches!(
            lifecycle.discard(&draft.id).await,
            Err(XpostError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_post_outcome_json_shape() {
        let (lifecycle, _db, _tmp) = setup(MockPlatform::success(), true).await;
        let draft = lifecycle.create_draft("json").await.unwrap().post;

        let outcome = lifecycle.post(&draft.id).await.unwrap();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["mode"], "single");
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["post"]["status"], "posted");
    }
}
