//! xpost - draft, generate and post to X

mod output;

use clap::{Args, Parser, Subcommand};
use libxpost::logging::LoggingConfig;
use libxpost::service::XpostService;
use libxpost::{PostStatus, Result, XpostError};
use serde_json::{json, Value};

use crate::output::Output;

#[derive(Parser, Debug)]
#[command(name = "xpost")]
#[command(version, about = "Draft, generate and post to X from the command line")]
#[command(long_about = r#"Draft, generate and post to X from the command line.

Drafts and posting history live in .xpost/ under the current directory
(override with XPOST_DATA_DIR).

EXAMPLES:
    xpost draft "Shipping a new release today"
    xpost draft --edit k3j4h5g6f7d8 "Shipping two releases today"
    xpost generate thread rust tooling
    xpost post k3j4h5g6f7d8 --dry
    xpost list drafts
    xpost --json get k3j4h5g6f7d8

CREDENTIALS:
    X_API_KEY, X_API_SECRET, X_ACCESS_TOKEN, X_ACCESS_SECRET (or TWITTER_*),
    then the file named by XPOST_ENV_FILE, then ./x.env, then config.toml.

EXIT CODES:
    0 - Success
    1 - Error (not found, conflict, posting or storage failure)
    2 - Authentication failed
    3 - Invalid arguments
"#)]
struct Cli {
    /// Print a JSON envelope on stdout instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create, edit, or delete a local draft
    Draft(DraftArgs),

    /// Generate posts from templates: <topic>, thread <topic>, or ideas
    Generate {
        #[arg(required = true, num_args = 1.., value_name = "TOPIC")]
        words: Vec<String>,
    },

    /// Post a draft, or the whole thread it belongs to
    Post {
        id: String,

        /// Simulate without calling the API
        #[arg(long)]
        dry: bool,
    },

    /// List posts, newest first
    List {
        /// drafts, posted, or failed
        filter: Option<String>,
    },

    /// Show one post by local id
    Get { id: String },

    /// Delete a post locally, and remotely if it was posted
    Delete {
        id: String,

        /// Simulate the remote delete
        #[arg(long)]
        dry: bool,
    },
}

#[derive(Args, Debug)]
struct DraftArgs {
    /// Replace the content of an existing draft
    #[arg(long, value_name = "ID", conflicts_with = "delete")]
    edit: Option<String>,

    /// Discard a local record without touching X
    #[arg(long, value_name = "ID")]
    delete: Option<String>,

    /// Draft text (joined with spaces)
    text: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if e.use_stderr() {
                eprint!("{}", e);
                std::process::exit(3);
            }
            e.exit();
        }
    };

    LoggingConfig::from_env(cli.verbose).init();
    tracing::debug!("xpost started with args: {:?}", cli);

    let out = Output::new(cli.json);
    match run(cli.command, &out).await {
        Ok(data) => out.success(&data),
        Err(e) => {
            out.failure(&e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(command: Command, out: &Output) -> Result<Value> {
    let cwd = std::env::current_dir().map_err(|e| {
        XpostError::InvalidArguments(format!("Cannot determine working directory: {}", e))
    })?;
    let service = XpostService::open(&cwd).await?;

    let data = dispatch(command, &service, out).await;
    service.close().await;
    data
}

async fn dispatch(command: Command, service: &XpostService, out: &Output) -> Result<Value> {
    match command {
        Command::Draft(args) => draft(args, service, out).await,
        Command::Generate { words } => {
            let generator = service.generator();
            let outcome = match words[0].as_str() {
                "ideas" if words.len() == 1 => generator.ideas().await?,
                "thread" => generator.thread(&words[1..].join(" ")).await?,
                _ => generator.single(&words.join(" ")).await?,
            };
            out.generated(&outcome);
            Ok(json!(outcome))
        }
        Command::Post { id, dry } => {
            let outcome = service.lifecycle(dry)?.post(&id).await?;
            out.posted(&outcome);
            Ok(json!(outcome))
        }
        Command::List { filter } => {
            let status = filter
                .as_deref()
                .map(str::parse::<PostStatus>)
                .transpose()
                .map_err(XpostError::InvalidArguments)?;
            let posts = service.database().list_posts(status).await?;
            out.listed(status, &posts);
            Ok(json!({ "filter": status, "posts": posts }))
        }
        Command::Get { id } => {
            let post = service
                .database()
                .get_post(&id)
                .await?
                .ok_or(XpostError::NotFound(id))?;
            out.post_detail(&post);
            Ok(json!(post))
        }
        Command::Delete { id, dry } => {
            let outcome = service.lifecycle(dry)?.delete(&id).await?;
            out.deleted(&outcome);
            Ok(json!(outcome))
        }
    }
}

async fn draft(args: DraftArgs, service: &XpostService, out: &Output) -> Result<Value> {
    if let Some(id) = args.delete {
        let lifecycle = service.offline()?;
        let post = lifecycle.discard(&id).await?;
        out.discarded(&post);
        return Ok(json!({ "id": post.id, "deleted": true }));
    }

    let text = args.text.join(" ");
    if text.trim().is_empty() {
        return Err(XpostError::InvalidArguments(
            "Usage: xpost draft <text> | --edit <id> <text> | --delete <id>".to_string(),
        ));
    }

    let lifecycle = service.offline()?;
    let outcome = match args.edit {
        Some(id) => lifecycle.edit(&id, &text).await?,
        None => lifecycle.create_draft(&text).await?,
    };
    out.drafted(&outcome);
    Ok(json!(outcome))
}
