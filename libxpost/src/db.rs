//! Database operations for xpost
//!
//! The content store is a single SQLite file. Every mutation is either a
//! single statement or a read-modify-write inside one transaction, so an
//! interrupted process never leaves a half-written record behind.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::error::{DbError, Result};
use crate::id::record_id;
use crate::types::{Generation, Post, PostStatus, PostUpdate};

const POST_COLUMNS: &str =
    "id, content, thread_id, thread_pos, status, remote_id, posted_at, created_at, tags";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the store at `db_path` and run migrations
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        // One connection: this is a single-user tool and SQLite serializes
        // writers anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        tracing::debug!("Opened content store at {}", path.display());

        Ok(Self { pool })
    }

    /// Close the underlying pool, flushing any pending writes
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Create a new draft post
    pub async fn create_post(
        &self,
        content: &str,
        thread_id: Option<&str>,
        thread_pos: i64,
        tags: Option<&str>,
    ) -> Result<Post> {
        let post = Post {
            id: record_id(),
            content: content.to_string(),
            thread_id: thread_id.map(str::to_string),
            thread_pos,
            status: PostStatus::Draft,
            remote_id: None,
            posted_at: None,
            created_at: chrono::Utc::now().timestamp(),
            tags: tags.map(str::to_string),
        };

        sqlx::query(
            r#"
            INSERT INTO posts (id, content, thread_id, thread_pos, status, remote_id, posted_at, created_at, tags)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.content)
        .bind(&post.thread_id)
        .bind(post.thread_pos)
        .bind(post.status.as_str())
        .bind(&post.remote_id)
        .bind(post.posted_at)
        .bind(post.created_at)
        .bind(&post.tags)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        tracing::debug!(post_id = %post.id, thread_id = ?post.thread_id, "Created post");

        Ok(post)
    }

    /// Get a post by ID
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        row.as_ref().map(post_from_row).transpose()
    }

    /// List posts, newest first, optionally filtered by status
    pub async fn list_posts(&self, status: Option<PostStatus>) -> Result<Vec<Post>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {} FROM posts WHERE status = ? ORDER BY created_at DESC, rowid DESC",
                    POST_COLUMNS
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM posts ORDER BY created_at DESC, rowid DESC",
                    POST_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(DbError::SqlxError)?;

        rows.iter().map(post_from_row).collect()
    }

    /// All members of a thread ordered by position
    pub async fn list_thread(&self, thread_id: &str) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts WHERE thread_id = ? ORDER BY thread_pos ASC",
            POST_COLUMNS
        ))
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows.iter().map(post_from_row).collect()
    }

    /// Apply a partial update; returns `None` if no post has that id
    pub async fn update_post(&self, post_id: &str, update: PostUpdate) -> Result<Option<Post>> {
        let mut tx = self.pool.begin().await.map_err(DbError::SqlxError)?;

        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::SqlxError)?;

        let mut post = match row.as_ref().map(post_from_row).transpose()? {
            Some(post) => post,
            None => return Ok(None),
        };

        update.apply(&mut post);

        sqlx::query(
            r#"
            UPDATE posts
            SET content = ?, status = ?, remote_id = ?, posted_at = ?, tags = ?
            WHERE id = ?
            "#,
        )
        .bind(&post.content)
        .bind(post.status.as_str())
        .bind(&post.remote_id)
        .bind(post.posted_at)
        .bind(&post.tags)
        .bind(&post.id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::SqlxError)?;

        tx.commit().await.map_err(DbError::SqlxError)?;

        Ok(Some(post))
    }

    /// Delete a post; deleting a missing id is not an error
    pub async fn delete_post(&self, post_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Append a generation audit record
    pub async fn save_generation(&self, prompt: &str, output: &str, model: &str) -> Result<Generation> {
        let generation = Generation {
            id: record_id(),
            prompt: prompt.to_string(),
            output: output.to_string(),
            model: model.to_string(),
            created_at: chrono::Utc::now().timestamp(),
        };

        sqlx::query(
            r#"
            INSERT INTO generations (id, prompt, output, model, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&generation.id)
        .bind(&generation.prompt)
        .bind(&generation.output)
        .bind(&generation.model)
        .bind(generation.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(generation)
    }

    /// The generation log, oldest first
    pub async fn list_generations(&self) -> Result<Vec<Generation>> {
        let rows = sqlx::query(
            "SELECT id, prompt, output, model, created_at FROM generations ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(rows
            .iter()
            .map(|r| Generation {
                id: r.get("id"),
                prompt: r.get("prompt"),
                output: r.get("output"),
                model: r.get("model"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let id: String = row.get("id");
    let status = row
        .get::<String, _>("status")
        .parse::<PostStatus>()
        .map_err(|message| DbError::Corrupt {
            id: id.clone(),
            message,
        })?;

    Ok(Post {
        id,
        content: row.get("content"),
        thread_id: row.get("thread_id"),
        thread_pos: row.get("thread_pos"),
        status,
        remote_id: row.get("remote_id"),
        posted_at: row.get("posted_at"),
        created_at: row.get("created_at"),
        tags: row.get("tags"),
    })
}
