use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Request error ({status}) on {operation}: {message}")]
    Request {
        operation: String,
        status: StatusCode,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Timed out after {elapsed:?} waiting for indexer '{indexer}'")]
    Timeout { indexer: String, elapsed: Duration },

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Gave up on indexer '{indexer}' after {attempts} status polls")]
    PollLimit { indexer: String, attempts: u32 },

    #[error("Indexer '{indexer}' reported unknown run status '{status}'")]
    UnknownRunStatus { indexer: String, status: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Stable label for the error category, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Config(_) | SyncError::Toml(_) | SyncError::InvalidUrl(_) => "configuration",
            SyncError::Schema(_) => "schema",
            SyncError::Request { .. } => "request",
            SyncError::Transport(_) => "transport",
            SyncError::Timeout { .. } | SyncError::PollLimit { .. } => "timeout",
            SyncError::Cancelled(_) => "cancelled",
            SyncError::UnknownRunStatus { .. } | SyncError::Json(_) => "protocol",
            SyncError::Io(_) => "io",
        }
    }

    /// True for a request the service answered with 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Request { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        SyncError::Config(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        SyncError::Schema(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DeleteIndex,
    CreateIndex,
    RegisterDataSource,
    CreateIndexer,
    RunIndexer,
    WaitForCompletion,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::DeleteIndex => "delete-index",
            Stage::CreateIndex => "create-index",
            Stage::RegisterDataSource => "register-data-source",
            Stage::CreateIndexer => "create-indexer",
            Stage::RunIndexer => "run-indexer",
            Stage::WaitForCompletion => "wait-for-completion",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal pipeline failure, tagged with the stage that produced it
#[derive(Error, Debug)]
#[error("stage '{stage}' failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: SyncError,
}

impl StageError {
    pub fn new(stage: Stage, source: SyncError) -> Self {
        Self { stage, source }
    }
}
