//! indexsync: provision a search index and drive an indexer sync to completion
//!
//! Pipeline stages:
//! - Index lifecycle (delete, create)
//! - Data source registration
//! - Indexer definition and run trigger
//! - Status polling until the run reaches a terminal state

pub mod config;
pub mod datasource;
pub mod error;
pub mod index;
pub mod indexer;
pub mod names;
pub mod pipeline;
pub mod poller;
pub mod progress;
pub mod query;
pub mod schema;
pub mod status;
pub mod transport;

pub use config::SyncConfig;
pub use datasource::{DataSourceRegistrar, DataSourceRegistration};
pub use error::{Result, Stage, StageError, SyncError};
pub use index::{DeleteOutcome, IndexLifecycleManager, MissingIndexPolicy};
pub use indexer::{IndexerController, IndexerJob, IndexerParameters};
pub use pipeline::{PipelineReport, SyncPipeline, SyncPlan};
pub use poller::{PollPolicy, SyncResult, SyncStatusPoller};
pub use progress::SyncProgress;
pub use query::{QueryClient, SearchRequest};
pub use schema::{Field, FieldType, IndexDefinition, SchemaPreset};
pub use status::{IndexerStatus, RunPhase, RunState};
pub use transport::SearchServiceClient;
