//! Indexer definition, run trigger and status query

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::datasource::upsert_statuses;
use crate::error::Result;
use crate::names::validate_name;
use crate::status::IndexerStatus;
use crate::transport::SearchServiceClient;

/// A named job binding a data source to a target index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerJob {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub data_source_name: String,
    pub target_index_name: String,
    #[serde(default)]
    pub parameters: IndexerParameters,
}

/// Failure tolerance for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerParameters {
    pub max_failed_items: i32,
    pub max_failed_items_per_batch: i32,
    pub base64_encode_keys: bool,
}

impl Default for IndexerParameters {
    fn default() -> Self {
        Self {
            max_failed_items: 10,
            max_failed_items_per_batch: 5,
            base64_encode_keys: false,
        }
    }
}

impl IndexerJob {
    pub fn new(
        name: impl Into<String>,
        data_source_name: impl Into<String>,
        target_index_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            data_source_name: data_source_name.into(),
            target_index_name: target_index_name.into(),
            parameters: IndexerParameters::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameters(mut self, parameters: IndexerParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

pub struct IndexerController {
    client: Arc<SearchServiceClient>,
    accepted: Vec<StatusCode>,
}

impl IndexerController {
    pub fn new(client: Arc<SearchServiceClient>) -> Self {
        Self {
            client,
            accepted: upsert_statuses(false),
        }
    }

    /// Also accept 204 when an existing indexer is replaced
    pub fn accept_replaced(mut self, accept: bool) -> Self {
        self.accepted = upsert_statuses(accept);
        self
    }

    /// Create or replace the indexer definition
    pub async fn create_indexer(&self, job: &IndexerJob) -> Result<()> {
        validate_name("indexer", &job.name)?;
        validate_name("data source", &job.data_source_name)?;
        validate_name("index", &job.target_index_name)?;

        let path = format!("indexers/{}", job.name);
        self.client
            .call(Method::PUT, &path, Some(job), &self.accepted)
            .await?;

        info!(
            indexer = %job.name,
            datasource = %job.data_source_name,
            index = %job.target_index_name,
            "Created indexer"
        );
        Ok(())
    }

    /// Trigger an asynchronous run. Completion is observed by polling status.
    ///
    /// The service also answers 202 when a run is already in progress, so a
    /// second trigger is treated the same as the first.
    pub async fn run_indexer(&self, name: &str) -> Result<()> {
        validate_name("indexer", name)?;

        let path = format!("indexers/{}/run", name);
        self.client
            .call_empty(Method::POST, &path, &[StatusCode::ACCEPTED])
            .await?;

        info!(indexer = %name, "Indexer run accepted");
        Ok(())
    }

    /// Fetch the current status once
    pub async fn get_status(&self, name: &str) -> Result<IndexerStatus> {
        validate_name("indexer", name)?;

        let path = format!("indexers/{}/status", name);
        let response = self
            .client
            .call_empty(Method::GET, &path, &[StatusCode::OK])
            .await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
