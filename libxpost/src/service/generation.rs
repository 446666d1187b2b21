//! Template-based post generation
//!
//! Fixed templates stand in for a language model. Every generation is
//! recorded in the generation log, and thread/single output is stored as
//! drafts ready for `post`.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::{Result, XpostError};
use crate::id::record_id;
use crate::types::{Post, MAX_POST_CHARS};
use crate::Database;

/// Model label recorded for template output
pub const TEMPLATE_MODEL: &str = "template";

/// Separator between thread parts in generated output
pub const THREAD_SEPARATOR: &str = "\n---\n";

const IDEAS: &str = "1. Share one unpopular engineering tradeoff you changed your mind on.\n\
2. A small automation that saves your team 30 minutes daily.\n\
3. Why most dashboards hide the metric that matters.\n\
4. [THREAD] A real incident timeline and what you fixed first.\n\
5. A code review habit that reduced bugs in your team.\n\
6. How you scope features to fit one sprint.\n\
7. [THREAD] Lessons from replacing a legacy dependency.\n\
8. A practical AI workflow that actually helps coding speed.\n\
9. One dev-tool configuration most teams forget.\n\
10. What you would delete from your stack today and why.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Ideas,
    Thread,
    Single,
}

/// Output of one generate call
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub mode: GenerationMode,
    pub topic: Option<String>,
    /// Drafts created from the output, empty for ideas
    pub posts: Vec<Post>,
    pub raw: String,
}

fn thread_template(topic: &str) -> String {
    format!(
        "Most teams overcomplicate {topic}. Here is the lean approach that ships.\n---\n\
1) Set a single success metric before writing code.\n---\n\
2) Build the smallest path to prove the metric in prod.\n---\n\
3) Remove abstractions until pain appears, then add one layer.\n---\n\
4) Document tradeoffs and revisit in two weeks with real data."
    )
}

fn single_template(topic: &str) -> String {
    format!(
        "Most wins in {topic} come from reducing cycle time, not adding complexity. \
Short feedback loops beat perfect architecture."
    )
}

/// Cut `text` to at most `MAX_POST_CHARS` characters
fn truncate_post(text: &str) -> String {
    text.chars().take(MAX_POST_CHARS).collect()
}

pub struct Generator {
    db: Arc<Database>,
}

impl Generator {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Ten canned post ideas; nothing is drafted
    pub async fn ideas(&self) -> Result<GenerationOutcome> {
        self.db
            .save_generation("Generate 10 tweet ideas for this week.", IDEAS, TEMPLATE_MODEL)
            .await?;

        Ok(GenerationOutcome {
            mode: GenerationMode::Ideas,
            topic: None,
            posts: Vec::new(),
            raw: IDEAS.to_string(),
        })
    }

    /// Draft a thread about `topic`
    ///
    /// Parts share a fresh thread id and take their position from their
    /// place in the template output.
    pub async fn thread(&self, topic: &str) -> Result<GenerationOutcome> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(XpostError::InvalidArguments(
                "Usage: xpost generate thread <topic>".to_string(),
            ));
        }

        let raw = thread_template(topic);
        self.db
            .save_generation(&format!("Write a thread about: {}", topic), &raw, TEMPLATE_MODEL)
            .await?;

        let thread_id = record_id();
        let mut posts = Vec::new();
        for (pos, part) in raw.split(THREAD_SEPARATOR).enumerate() {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let post = self
                .db
                .create_post(&truncate_post(part), Some(&thread_id), pos as i64, Some(topic))
                .await?;
            posts.push(post);
        }

        info!(thread_id = %thread_id, parts = posts.len(), "Generated thread drafts");
        Ok(GenerationOutcome {
            mode: GenerationMode::Thread,
            topic: Some(topic.to_string()),
            posts,
            raw,
        })
    }

    /// Draft a single post about `topic`
    pub async fn single(&self, topic: &str) -> Result<GenerationOutcome> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(XpostError::InvalidArguments(
                "Usage: xpost generate <topic>".to_string(),
            ));
        }

        let raw = truncate_post(&single_template(topic));
        self.db
            .save_generation(&format!("Write a tweet about: {}", topic), &raw, TEMPLATE_MODEL)
            .await?;

        let post = self.db.create_post(&raw, None, 0, Some(topic)).await?;
        info!(post_id = %post.id, "Generated draft");

        Ok(GenerationOutcome {
            mode: GenerationMode::Single,
            topic: Some(topic.to_string()),
            posts: vec![post],
            raw,
        })
    }
}
