//! Error types for Followbot

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FollowbotError>;

#[derive(Error, Debug)]
pub enum FollowbotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Remote API error: {0}")]
    Remote(#[from] RemoteError),

    /// A follow run stopped on an unexpected remote error.
    #[error("Run aborted after {completed} follow(s): {source}")]
    Aborted {
        completed: usize,
        #[source]
        source: RemoteError,
    },

    #[error("The bot has not been set up: {0}")]
    NotSetUp(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FollowbotError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            FollowbotError::InvalidInput(_) => 3,
            FollowbotError::NotSetUp(_) | FollowbotError::Config(_) => 4,
            FollowbotError::Remote(e) if e.is_authentication() => 2,
            FollowbotError::Remote(_) => 1,
            FollowbotError::Aborted { .. } => 1,
            FollowbotError::Storage(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Malformed config line {line}: {content:?}")]
    MalformedLine { line: usize, content: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read snapshot {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write snapshot {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt snapshot {} at line {line}: {content:?}", path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        content: String,
    },
}

/// Failure reported by the remote social-graph API or its transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// The message string carried by the error, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            RemoteError::Api { message, .. } => message,
            RemoteError::Network(message) => message,
            RemoteError::Decode(message) => message,
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, RemoteError::Api { status: 401, .. })
    }

    /// The target account blocked us.
    pub fn is_blocked(&self) -> bool {
        self.message().to_lowercase().contains("blocked")
    }

    /// The action was already applied ("already favorited", "already retweeted").
    pub fn is_duplicate(&self) -> bool {
        let message = self.message().to_lowercase();
        message.contains("already favorited") || message.contains("already retweeted")
    }
}
