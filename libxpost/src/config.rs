//! Configuration and credential resolution for xpost
//!
//! All state lives in a data directory (`.xpost/` under the working directory
//! unless `XPOST_DATA_DIR` says otherwise) holding `config.toml` and the
//! SQLite store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::oauth::OAuthCredentials;
use crate::platforms::x::DEFAULT_API_BASE;

pub const DATA_DIR_ENV: &str = "XPOST_DATA_DIR";
pub const ENV_FILE_ENV: &str = "XPOST_ENV_FILE";
pub const DEFAULT_DATA_DIR: &str = ".xpost";
pub const LOCAL_ENV_FILE: &str = "x.env";
pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "xpost.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub twitter: TwitterConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
    pub api_base: String,
}

/// Defaults for content generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub topics: Vec<String>,
    pub tone: String,
    pub avoid: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            access_token: String::new(),
            access_secret: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            topics: vec![
                "TypeScript".to_string(),
                "AI/ML".to_string(),
                "LLMs".to_string(),
                "open source".to_string(),
                "developer tools".to_string(),
            ],
            tone: "witty, concise, technical but accessible".to_string(),
            avoid: vec![
                "engagement bait".to_string(),
                "generic advice".to_string(),
                "hashtag spam".to_string(),
            ],
        }
    }
}

impl Config {
    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            twitter: TwitterConfig::default(),
            ai: AiConfig::default(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Load `config.toml` from the data directory, writing defaults on first use
    pub fn load_or_init(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            return Self::load_from_path(&path);
        }

        let config = Self::default_config();
        config.save(&path)?;
        tracing::info!("Wrote default configuration to {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::WriteError)?;
        }
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::WriteError)?;
        Ok(())
    }
}

/// Resolve the data directory for a working directory
pub fn resolve_data_dir(cwd: &Path) -> PathBuf {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(shellexpand::tilde(&dir).to_string()),
        _ => cwd.join(DEFAULT_DATA_DIR),
    }
}

/// Path of the SQLite store inside a data directory
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE)
}

/// Environment names for each credential, in lookup order
const API_KEY_VARS: [&str; 2] = ["X_API_KEY", "TWITTER_API_KEY"];
const API_SECRET_VARS: [&str; 2] = ["X_API_SECRET", "TWITTER_API_SECRET"];
const ACCESS_TOKEN_VARS: [&str; 2] = ["X_ACCESS_TOKEN", "TWITTER_ACCESS_TOKEN"];
const ACCESS_SECRET_VARS: [&str; 2] = ["X_ACCESS_SECRET", "TWITTER_ACCESS_SECRET"];

/// Layers consulted for credentials, highest precedence first
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    /// Process environment
    pub env: HashMap<String, String>,
    /// Env file named by `XPOST_ENV_FILE`
    pub external_file: HashMap<String, String>,
    /// `x.env` in the working directory
    pub local_file: HashMap<String, String>,
}

impl CredentialSources {
    /// Gather the sources from the process environment and env files
    pub fn from_process(cwd: &Path) -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();

        let external_file = match env.get(ENV_FILE_ENV).filter(|p| !p.is_empty()) {
            Some(path) => read_env_file(Path::new(&shellexpand::tilde(path).to_string()))?,
            None => HashMap::new(),
        };

        let local_file = read_env_file(&cwd.join(LOCAL_ENV_FILE))?;

        Ok(Self {
            env,
            external_file,
            local_file,
        })
    }

    fn lookup(&self, names: &[&str]) -> Option<String> {
        [&self.env, &self.external_file, &self.local_file]
            .into_iter()
            .find_map(|layer| {
                names
                    .iter()
                    .find_map(|name| layer.get(*name).filter(|v| !v.is_empty()).cloned())
            })
    }

    /// Resolve credentials over the stored config values
    pub fn resolve(&self, stored: &TwitterConfig) -> OAuthCredentials {
        let pick = |names: &[&str], fallback: &str| {
            self.lookup(names).unwrap_or_else(|| fallback.to_string())
        };

        OAuthCredentials {
            consumer_key: pick(&API_KEY_VARS, &stored.api_key),
            consumer_secret: pick(&API_SECRET_VARS, &stored.api_secret),
            access_token: pick(&ACCESS_TOKEN_VARS, &stored.access_token),
            access_secret: pick(&ACCESS_SECRET_VARS, &stored.access_secret),
        }
    }
}

/// Parse a dotenv file; a missing file is an empty layer
fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let iter = dotenvy::from_path_iter(path).map_err(|e| ConfigError::EnvFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut values = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| ConfigError::EnvFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        values.insert(key, value);
    }
    tracing::debug!("Loaded {} entries from {}", values.len(), path.display());
    Ok(values)
}
