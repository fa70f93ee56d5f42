//! Typed indexer status payload
//!
//! `GET indexers/{name}/status` returns the overall indexer health plus the
//! most recent execution, which is null until a run has been recorded:
//!
//! ```text
//! { "status": "running",
//!   "lastResult": { "status": "inProgress", "itemsProcessed": 120, "itemsFailed": 0, ... } }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Full status response for one indexer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerStatus {
    #[serde(default)]
    pub status: Option<IndexerHealth>,
    #[serde(default)]
    pub last_result: Option<ExecutionResult>,
}

/// Overall health of the indexer, independent of any single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexerHealth {
    Running,
    Error,
    #[serde(other)]
    Unknown,
}

/// One execution of an indexer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    #[serde(default)]
    pub status: Option<RunState>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub items_processed: Option<u64>,
    #[serde(default)]
    pub items_failed: Option<u64>,
    #[serde(default)]
    pub errors: Vec<ItemError>,
}

/// Per-document failure reported with an execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub error_message: String,
}

/// Run state of a single execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunState {
    NotStarted,
    InProgress,
    Success,
    TransientFailure,
    PersistentFailure,
    Reset,
    /// Value outside the documented set, kept verbatim
    Unknown(String),
}

impl RunState {
    pub fn as_str(&self) -> &str {
        match self {
            RunState::NotStarted => "notStarted",
            RunState::InProgress => "inProgress",
            RunState::Success => "success",
            RunState::TransientFailure => "transientFailure",
            RunState::PersistentFailure => "persistentFailure",
            RunState::Reset => "reset",
            RunState::Unknown(s) => s,
        }
    }

    /// Whether polling can stop once this state is observed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Success
                | RunState::TransientFailure
                | RunState::PersistentFailure
                | RunState::Reset
        )
    }
}

impl From<String> for RunState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "notStarted" => RunState::NotStarted,
            "inProgress" => RunState::InProgress,
            "success" => RunState::Success,
            "transientFailure" => RunState::TransientFailure,
            "persistentFailure" => RunState::PersistentFailure,
            "reset" => RunState::Reset,
            _ => RunState::Unknown(value),
        }
    }
}

impl From<RunState> for String {
    fn from(state: RunState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a status observation leaves the poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    /// No execution recorded yet
    Waiting,
    /// Execution recorded but not finished
    Running,
    /// Execution finished, successfully or not
    Finished(RunState),
    /// Execution reported a state outside the closed set, or none at all
    Unrecognized(String),
}

impl IndexerStatus {
    pub fn phase(&self) -> RunPhase {
        let Some(result) = &self.last_result else {
            return RunPhase::Waiting;
        };

        // A recorded execution must say what state it is in
        let Some(state) = result.state() else {
            return RunPhase::Unrecognized(MISSING_STATUS.to_string());
        };

        match state {
            RunState::NotStarted => RunPhase::Waiting,
            RunState::InProgress => RunPhase::Running,
            RunState::Unknown(s) => RunPhase::Unrecognized(s),
            state => RunPhase::Finished(state),
        }
    }
}

/// Reported in place of a `status` that is null or absent inside `lastResult`
pub const MISSING_STATUS: &str = "<missing>";

impl ExecutionResult {
    pub fn state(&self) -> Option<RunState> {
        self.status.clone()
    }

    pub fn items_processed(&self) -> u64 {
        self.items_processed.unwrap_or(0)
    }

    pub fn items_failed(&self) -> u64 {
        self.items_failed.unwrap_or(0)
    }
}
