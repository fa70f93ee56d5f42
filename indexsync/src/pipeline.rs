//! Sequential provisioning pipeline
//!
//! delete index -> create index -> register data source -> create indexer
//! -> run indexer -> wait for completion
//!
//! Each stage depends on the remote side effect of the previous one, so the
//! first failure stops the run. Completed stages are not rolled back. A
//! shutdown signal is honoured before each stage and during the status wait.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::datasource::{DataSourceRegistrar, DataSourceRegistration};
use crate::error::{Result, Stage, StageError, SyncError};
use crate::index::{DeleteOutcome, IndexLifecycleManager, MissingIndexPolicy};
use crate::indexer::{IndexerController, IndexerJob};
use crate::poller::{PollPolicy, SyncResult, SyncStatusPoller};
use crate::progress::SyncProgress;
use crate::schema::IndexDefinition;
use crate::transport::SearchServiceClient;

/// Everything one pipeline run provisions
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub index: IndexDefinition,
    pub datasource: DataSourceRegistration,
    pub indexer: IndexerJob,
    pub poll: PollPolicy,
    pub missing_index: MissingIndexPolicy,
    pub accept_replaced: bool,
}

impl SyncPlan {
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Ok(Self {
            index: config.index.definition()?,
            datasource: config.datasource.to_registration(),
            indexer: config
                .indexer
                .to_job(&config.datasource.name, &config.index.name),
            poll: config.poll.to_policy(),
            missing_index: config.index.missing_on_delete,
            accept_replaced: config.service.accept_replaced,
        })
    }
}

/// What a successful run did
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub index_deleted: DeleteOutcome,
    pub sync: SyncResult,
}

pub struct SyncPipeline {
    plan: SyncPlan,
    lifecycle: IndexLifecycleManager,
    registrar: DataSourceRegistrar,
    controller: IndexerController,
    poller: SyncStatusPoller,
    shutdown: Option<watch::Receiver<bool>>,
}

impl SyncPipeline {
    pub fn new(client: Arc<SearchServiceClient>, plan: SyncPlan) -> Self {
        let lifecycle =
            IndexLifecycleManager::new(client.clone()).with_missing_policy(plan.missing_index);
        let registrar =
            DataSourceRegistrar::new(client.clone()).accept_replaced(plan.accept_replaced);
        let controller =
            IndexerController::new(client.clone()).accept_replaced(plan.accept_replaced);
        let poller = SyncStatusPoller::new(client, plan.poll.clone());

        Self {
            plan,
            lifecycle,
            registrar,
            controller,
            poller,
            shutdown: None,
        }
    }

    /// Stop before the next stage, or during the status wait, once `true` is sent
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.poller = self.poller.with_shutdown(shutdown.clone());
        self.shutdown = Some(shutdown);
        self
    }

    pub fn with_progress(mut self, progress: SyncProgress) -> Self {
        self.poller = self.poller.with_progress(progress);
        self
    }

    pub fn plan(&self) -> &SyncPlan {
        &self.plan
    }

    pub async fn run(&self) -> std::result::Result<PipelineReport, StageError> {
        let plan = &self.plan;

        // A schema that cannot be created must not cost the existing index
        stage(Stage::CreateIndex, async { plan.index.validate() }).await?;

        info!(index = %plan.index.name, "Deleting index");
        let index_deleted = self
            .run_stage(
                Stage::DeleteIndex,
                self.lifecycle.delete_index(&plan.index.name),
            )
            .await?;

        info!(index = %plan.index.name, "Creating index");
        self.run_stage(Stage::CreateIndex, self.lifecycle.create_index(&plan.index))
            .await?;

        info!(datasource = %plan.datasource.name, "Creating indexer data source");
        self.run_stage(
            Stage::RegisterDataSource,
            self.registrar.register(&plan.datasource),
        )
        .await?;

        info!(indexer = %plan.indexer.name, "Creating indexer");
        self.run_stage(
            Stage::CreateIndexer,
            self.controller.create_indexer(&plan.indexer),
        )
        .await?;

        info!(indexer = %plan.indexer.name, "Syncing data");
        self.run_stage(
            Stage::RunIndexer,
            self.controller.run_indexer(&plan.indexer.name),
        )
        .await?;

        let sync = self
            .run_stage(
                Stage::WaitForCompletion,
                self.poller.wait_for_completion(&plan.indexer.name),
            )
            .await?;

        Ok(PipelineReport {
            index_deleted,
            sync,
        })
    }

    /// Run one remote stage unless shutdown was requested first
    async fn run_stage<T>(
        &self,
        stage_id: Stage,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> std::result::Result<T, StageError> {
        let cancelled = self.shutdown.as_ref().map(|rx| *rx.borrow()).unwrap_or(false);
        if cancelled {
            warn!(stage = %stage_id, "Shutdown requested, not starting stage");
            return Err(StageError::new(
                stage_id,
                SyncError::Cancelled(format!("stopped before stage '{}'", stage_id)),
            ));
        }
        stage(stage_id, fut).await
    }
}

async fn stage<T>(
    stage: Stage,
    fut: impl std::future::Future<Output = Result<T>>,
) -> std::result::Result<T, StageError> {
    fut.await.map_err(|e| StageError::new(stage, e))
}
