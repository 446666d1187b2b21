//! Rendering of command results
//!
//! With `--json` each invocation prints exactly one envelope on stdout.
//! Otherwise results are printed as text on stdout and errors on stderr.

use libxpost::service::{DeleteOutcome, DraftOutcome, GenerationOutcome, PostOutcome};
use libxpost::{Post, PostStatus, XpostError};
use serde_json::{json, Value};

const PREVIEW_CHARS: usize = 60;

pub struct Output {
    json: bool,
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}

fn format_time(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn success_envelope(data: &Value) -> Value {
    json!({ "ok": true, "data": data })
}

pub fn error_envelope(error: &XpostError) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": error.code(),
            "message": error.to_string(),
            "details": error.details(),
        }
    })
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn success(&self, data: &Value) {
        if self.json {
            println!("{}", success_envelope(data));
        }
    }

    pub fn failure(&self, error: &XpostError) {
        if self.json {
            println!("{}", error_envelope(error));
        } else {
            eprintln!("Error: {}", error);
        }
    }

    pub fn drafted(&self, outcome: &DraftOutcome) {
        if self.json {
            return;
        }
        if let Some(warning) = &outcome.warning {
            eprintln!("Warning: {}", warning);
        }
        println!("Saved draft {}", outcome.post.id);
        println!("  {}", outcome.post.content);
    }

    pub fn discarded(&self, post: &Post) {
        if !self.json {
            println!("Deleted {}", post.id);
        }
    }

    pub fn generated(&self, outcome: &GenerationOutcome) {
        if self.json {
            return;
        }
        if outcome.posts.is_empty() {
            println!("{}", outcome.raw);
            return;
        }
        for (i, post) in outcome.posts.iter().enumerate() {
            if post.is_thread_member() {
                println!("[{}] {} {}", i + 1, post.id, post.content);
            } else {
                println!("Generated {}", post.id);
                println!("  {}", post.content);
            }
        }
    }

    pub fn posted(&self, outcome: &PostOutcome) {
        if self.json {
            return;
        }
        match outcome {
            PostOutcome::Single {
                dry_run,
                post,
                remote,
            } => {
                let prefix = if *dry_run { "[dry-run] " } else { "" };
                println!("{}Posted {} as {}", prefix, post.id, remote.id);
            }
            PostOutcome::Thread {
                dry_run,
                posted_now,
                posts,
            } => {
                let prefix = if *dry_run { "[dry-run] " } else { "" };
                println!(
                    "{}Posted {} of {} thread posts",
                    prefix,
                    posted_now,
                    posts.len()
                );
                for post in posts {
                    println!(
                        "  [{}] {} {}",
                        post.thread_pos + 1,
                        post.id,
                        post.remote_id.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }

    pub fn listed(&self, filter: Option<PostStatus>, posts: &[Post]) {
        if self.json {
            return;
        }
        if posts.is_empty() {
            println!("No posts found");
            return;
        }
        let title = filter.map_or("all", |s| s.as_str());
        println!("{} ({})", title, posts.len());
        for post in posts {
            println!("{} [{}] {}", post.id, post.status, preview(&post.content));
        }
    }

    pub fn post_detail(&self, post: &Post) {
        if self.json {
            return;
        }
        println!("id:        {}", post.id);
        println!("status:    {}", post.status);
        println!("created:   {}", format_time(post.created_at));
        if let Some(thread_id) = &post.thread_id {
            println!("thread:    {} (position {})", thread_id, post.thread_pos + 1);
        }
        if let Some(remote_id) = &post.remote_id {
            println!("remote id: {}", remote_id);
        }
        if let Some(posted_at) = post.posted_at {
            println!("posted:    {}", format_time(posted_at));
        }
        if let Some(tags) = &post.tags {
            println!("tags:      {}", tags);
        }
        println!();
        println!("{}", post.content);
    }

    pub fn deleted(&self, outcome: &DeleteOutcome) {
        if self.json {
            return;
        }
        let prefix = if outcome.dry_run { "[dry-run] " } else { "" };
        if outcome.remote_deleted {
            println!(
                "{}Deleted {} (remote {})",
                prefix,
                outcome.post.id,
                outcome.post.remote_id.as_deref().unwrap_or("")
            );
        } else {
            println!("{}Deleted {}", prefix, outcome.post.id);
        }
    }
}
