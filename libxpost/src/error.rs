//! Error types for xpost

use serde_json::{json, Value};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, XpostError>;

#[derive(Error, Debug)]
pub enum XpostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    #[error("{0}")]
    Remote(#[from] RemoteError),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Conflict {
        message: String,
        remote_id: Option<String>,
    },

    #[error("Failed to post {post_id}: {source}")]
    PostFailed {
        post_id: String,
        #[source]
        source: RemoteError,
    },
}

impl XpostError {
    /// Stable machine-readable code, used in the `--json` error envelope
    pub fn code(&self) -> &'static str {
        match self {
            XpostError::Config(_) => "CONFIG_ERROR",
            XpostError::Storage(_) => "STORAGE_ERROR",
            XpostError::Remote(_) => "REMOTE_ERROR",
            XpostError::InvalidArguments(_) => "INVALID_ARGS",
            XpostError::NotFound(_) => "NOT_FOUND",
            XpostError::Conflict { .. } => "CONFLICT",
            XpostError::PostFailed { .. } => "POST_FAILED",
        }
    }

    /// Structured details attached to the error, if any
    pub fn details(&self) -> Option<Value> {
        match self {
            XpostError::NotFound(id) => Some(json!({ "id": id })),
            XpostError::Conflict {
                remote_id: Some(remote_id),
                ..
            } => Some(json!({ "remote_id": remote_id })),
            XpostError::Remote(RemoteError::Api { status, detail }) => {
                Some(json!({ "status": status, "detail": detail }))
            }
            XpostError::PostFailed { post_id, source } => {
                let mut details = json!({ "id": post_id });
                if let RemoteError::Api { status, detail } = source {
                    details["status"] = json!(status);
                    details["detail"] = json!(detail);
                }
                Some(details)
            }
            _ => None,
        }
    }

    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            XpostError::InvalidArguments(_) => 3,
            XpostError::Remote(remote) | XpostError::PostFailed { source: remote, .. }
                if remote.is_auth_failure() =>
            {
                2
            }
            _ => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to write config file: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to read env file {path}: {message}")]
    EnvFile { path: String, message: String },
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt record {id}: {message}")]
    Corrupt { id: String, message: String },
}

#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    #[error("Remote API error {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from remote API: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// True when the remote rejected our credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, RemoteError::Api { status: 401 | 403, .. })
    }
}

impl From<sqlx::Error> for XpostError {
    fn from(err: sqlx::Error) -> Self {
        XpostError::Storage(DbError::SqlxError(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_arguments() {
        let error = XpostError::InvalidArguments("Empty content".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_auth_failure() {
        let error = XpostError::Remote(RemoteError::Api {
            status: 401,
            detail: "Unauthorized".to_string(),
        });
        assert_eq!(error.exit_code(), 2);

        let error = XpostError::PostFailed {
            post_id: "abc".to_string(),
            source: RemoteError::Api {
                status: 403,
                detail: "Forbidden".to_string(),
            },
        };
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_errors() {
        assert_eq!(XpostError::NotFound("abc".to_string()).exit_code(), 1);
        let conflict = XpostError::Conflict {
            message: "Already posted".to_string(),
            remote_id: None,
        };
        assert_eq!(conflict.exit_code(), 1);
        let network = XpostError::Remote(RemoteError::Network("timeout".to_string()));
        assert_eq!(network.exit_code(), 1);
    }

    #[test]
    fn test_codes() {
        assert_eq!(XpostError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(XpostError::InvalidArguments("x".into()).code(), "INVALID_ARGS");
        let db = XpostError::Storage(DbError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        )));
        assert_eq!(db.code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_remote_error_formatting() {
        let error = RemoteError::Api {
            status: 429,
            detail: "Too Many Requests".to_string(),
        };
        assert_eq!(error.to_string(), "Remote API error 429: Too Many Requests");
    }

    #[test]
    fn test_post_failed_details_carry_post_id() {
        let error = XpostError::PostFailed {
            post_id: "k3j4h5g6f7d8".to_string(),
            source: RemoteError::Api {
                status: 400,
                detail: "duplicate content".to_string(),
            },
        };
        let details = error.details().unwrap();
        assert_eq!(details["id"], "k3j4h5g6f7d8");
        assert_eq!(details["status"], 400);
        assert!(error.to_string().contains("duplicate content"));
    }

    #[test]
    fn test_conflict_details_expose_remote_id() {
        let error = XpostError::Conflict {
            message: "Already posted (remote id: 1234)".to_string(),
            remote_id: Some("1234".to_string()),
        };
        assert_eq!(error.details().unwrap()["remote_id"], "1234");
        assert_eq!(error.code(), "CONFLICT");
    }

    #[test]
    fn test_error_conversion_from_db_error() {
        let db_error = DbError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        let error: XpostError = db_error.into();

        match error {
            XpostError::Storage(_) => {}
            _ => panic!("Expected XpostError::Storage"),
        }
    }
}
