//! Service layer for xpost
//!
//! `XpostService` is the entry point used by the CLI. It owns the shared
//! store handle and configuration and hands out the lifecycle controller and
//! the generator.
//!
//! # Example
//!
//! ```no_run
//! use libxpost::service::XpostService;
//!
//! # async fn example() -> libxpost::Result<()> {
//! let cwd = std::env::current_dir().expect("cwd");
//! let service = XpostService::open(&cwd).await?;
//!
//! let draft = service.offline()?.create_draft("Hello world").await?;
//! service.lifecycle(true)?.post(&draft.post.id).await?;
//! service.close().await;
//! # Ok(())
//! # }
//! ```

pub mod generation;
pub mod lifecycle;

pub use generation::{GenerationMode, GenerationOutcome, Generator};
pub use lifecycle::{DeleteOutcome, DraftOutcome, PostLifecycle, PostOutcome};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::{db_path, resolve_data_dir, CredentialSources};
use crate::poster::PostingClient;
use crate::{Config, Database, OAuthCredentials, Result};

/// Shared store and configuration for one invocation
pub struct XpostService {
    db: Arc<Database>,
    config: Arc<Config>,
    data_dir: PathBuf,
    cwd: PathBuf,
}

impl XpostService {
    /// Open the data directory for `cwd`
    ///
    /// Creates the directory, the default `config.toml` and the database on
    /// first use.
    pub async fn open(cwd: &Path) -> Result<Self> {
        let data_dir = resolve_data_dir(cwd);
        debug!("Using data directory {}", data_dir.display());

        let config = Config::load_or_init(&data_dir)?;
        let db = Database::open(db_path(&data_dir)).await?;

        Ok(Self {
            db: Arc::new(db),
            config: Arc::new(config),
            data_dir,
            cwd: cwd.to_path_buf(),
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Lifecycle controller backed by the X API
    ///
    /// Credentials are resolved here rather than at open, and only when the
    /// controller can reach the network. Dry runs never read env files.
    pub fn lifecycle(&self, dry_run: bool) -> Result<PostLifecycle> {
        if dry_run {
            return self.offline();
        }
        let credentials = CredentialSources::from_process(&self.cwd)?.resolve(&self.config.twitter);
        let client = PostingClient::from_config(&self.config, credentials, dry_run)?;
        Ok(PostLifecycle::new(Arc::clone(&self.db), client))
    }

    /// Lifecycle controller for local-only work such as drafting
    ///
    /// Runs in dry-run mode with empty credentials, so it never reaches the
    /// network.
    pub fn offline(&self) -> Result<PostLifecycle> {
        let client = PostingClient::from_config(&self.config, OAuthCredentials::default(), true)?;
        Ok(PostLifecycle::new(Arc::clone(&self.db), client))
    }

    /// Lifecycle controller over an arbitrary posting client
    pub fn lifecycle_with(&self, client: PostingClient) -> PostLifecycle {
        PostLifecycle::new(Arc::clone(&self.db), client)
    }

    pub fn generator(&self) -> Generator {
        Generator::new(Arc::clone(&self.db))
    }

    /// Close the store once every controller handed out has been dropped
    pub async fn close(self) {
        match Arc::try_unwrap(self.db) {
            Ok(db) => db.close().await,
            Err(_) => debug!("Database still shared; leaving pool to close on drop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CONFIG_FILE, DATA_DIR_ENV, DB_FILE};
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    #[serial]
    async fn test_open_initializes_data_dir() {
        std::env::remove_var(DATA_DIR_ENV);
        let temp_dir = TempDir::new().unwrap();

        let service = XpostService::open(temp_dir.path()).await.unwrap();
        let data_dir = temp_dir.path().join(".xpost");

        assert_eq!(service.data_dir(), data_dir.as_path());
        assert!(data_dir.join(CONFIG_FILE).exists());
        assert!(data_dir.join(DB_FILE).exists());
        service.close().await;
    }

    #[tokio::test]
    #[serial]
    async fn test_generator_and_lifecycle_share_store() {
        std::env::remove_var(DATA_DIR_ENV);
        let temp_dir = TempDir::new().unwrap();
        let service = XpostService::open(temp_dir.path()).await.unwrap();

        let generated = service.generator().single("testing").await.unwrap();
        let lifecycle = service.lifecycle(true).unwrap();
        let outcome = lifecycle.post(&generated.posts[0].id).await.unwrap();

        assert!(matches!(outcome, PostOutcome::Single { dry_run: true, .. }));
        drop(lifecycle);
        service.close().await;
    }

    #[tokio::test]
    #[serial]
    async fn test_dry_run_ignores_broken_env_file() {
        std::env::remove_var(DATA_DIR_ENV);
        std::env::remove_var(crate::config::ENV_FILE_ENV);
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(crate::config::LOCAL_ENV_FILE),
            "X_API_KEY=\"unterminated\n",
        )
        .unwrap();
        let service = XpostService::open(temp_dir.path()).await.unwrap();

        let draft = service.offline().unwrap().create_draft("dry").await.unwrap().post;
        let lifecycle = service.lifecycle(true).unwrap();
        assert!(lifecycle.is_dry_run());
        lifecycle.post(&draft.id).await.unwrap();
        lifecycle.delete(&draft.id).await.unwrap();

        assert!(matches!(
            service.lifecycle(false),
            Err(crate::XpostError::Config(_))
        ));

        drop(lifecycle);
        service.close().await;
    }
}
