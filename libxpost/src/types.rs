//! Core types for xpost

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Advisory length limit; longer content is accepted with a warning
pub const MAX_POST_CHARS: usize = 280;

/// A post (standalone or a member of a thread)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub thread_id: Option<String>,
    pub thread_pos: i64,
    pub status: PostStatus,
    pub remote_id: Option<String>,
    pub posted_at: Option<i64>,
    pub created_at: i64,
    pub tags: Option<String>,
}

impl Post {
    pub fn is_thread_member(&self) -> bool {
        self.thread_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Posted,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Posted => "posted",
            PostStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    /// Accepts the stored names plus the `drafts` alias used on the command line
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" | "drafts" => Ok(PostStatus::Draft),
            "posted" => Ok(PostStatus::Posted),
            "failed" => Ok(PostStatus::Failed),
            _ => Err(format!(
                "Invalid status: '{}'. Valid options: drafts, posted, failed",
                s
            )),
        }
    }
}

/// Field-level partial update applied by [`crate::Database::update_post`].
///
/// `None` fields are left untouched. Posting state is a single field so
/// `remote_id` and `posted_at` can only ever change together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostUpdate {
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    pub published: Option<Publication>,
    pub tags: Option<Option<String>>,
}

/// Remote id and publication time, always set as a pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub remote_id: String,
    pub posted_at: i64,
}

impl PostUpdate {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn status(status: PostStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Mark as posted with the given remote id, stamped now
    pub fn posted(remote_id: impl Into<String>) -> Self {
        Self {
            status: Some(PostStatus::Posted),
            published: Some(Publication {
                remote_id: remote_id.into(),
                posted_at: chrono::Utc::now().timestamp(),
            }),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, post: &mut Post) {
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(status) = self.status {
            post.status = status;
        }
        if let Some(publication) = self.published {
            post.remote_id = Some(publication.remote_id);
            post.posted_at = Some(publication.posted_at);
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
    }
}

/// Write-once audit record of a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub id: String,
    pub prompt: String,
    pub output: String,
    pub model: String,
    pub created_at: i64,
}

/// Warning text for content over the advisory limit, if any
pub fn length_warning(content: &str) -> Option<String> {
    let chars = content.chars().count();
    (chars > MAX_POST_CHARS).then(|| format!("text is {} chars (max {})", chars, MAX_POST_CHARS))
}
