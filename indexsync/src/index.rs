//! Index lifecycle: delete, create, describe

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::names::validate_name;
use crate::schema::IndexDefinition;
use crate::transport::SearchServiceClient;

/// What `delete_index` found on the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// How to treat an index that is already absent when deleting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingIndexPolicy {
    /// Absent index counts as successfully removed
    #[default]
    Ignore,
    /// Absent index aborts the pipeline
    Fail,
}

pub struct IndexLifecycleManager {
    client: Arc<SearchServiceClient>,
    missing_policy: MissingIndexPolicy,
}

impl IndexLifecycleManager {
    pub fn new(client: Arc<SearchServiceClient>) -> Self {
        Self {
            client,
            missing_policy: MissingIndexPolicy::default(),
        }
    }

    pub fn with_missing_policy(mut self, policy: MissingIndexPolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    /// Delete the named index.
    ///
    /// A 404 is reported as `NotFound` unless the policy is `Fail`, in which
    /// case the service's error is returned unchanged.
    pub async fn delete_index(&self, name: &str) -> Result<DeleteOutcome> {
        validate_name("index", name)?;

        let path = format!("indexes/{}", name);
        match self
            .client
            .call_empty(Method::DELETE, &path, &[StatusCode::NO_CONTENT, StatusCode::OK])
            .await
        {
            Ok(_) => {
                info!(index = %name, "Deleted index");
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if e.is_not_found() && self.missing_policy == MissingIndexPolicy::Ignore => {
                warn!(index = %name, "Index did not exist, nothing to delete");
                Ok(DeleteOutcome::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    /// Create the index. The definition is checked locally first.
    pub async fn create_index(&self, definition: &IndexDefinition) -> Result<()> {
        validate_name("index", &definition.name)?;
        definition.validate()?;

        let path = format!("indexes/{}", definition.name);
        self.client
            .call(Method::PUT, &path, Some(definition), &[StatusCode::CREATED])
            .await?;

        info!(
            index = %definition.name,
            fields = definition.fields.len(),
            "Created index"
        );
        Ok(())
    }

    /// Fetch the definition the service holds for `name`
    pub async fn get_index(&self, name: &str) -> Result<IndexDefinition> {
        validate_name("index", name)?;

        let path = format!("indexes/{}", name);
        let response = self
            .client
            .call_empty(Method::GET, &path, &[StatusCode::OK])
            .await?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(SyncError::from)
    }

    /// Delete then create, the re-provisioning sequence used by the pipeline
    pub async fn recreate_index(&self, definition: &IndexDefinition) -> Result<DeleteOutcome> {
        definition.validate()?;
        let outcome = self.delete_index(&definition.name).await?;
        self.create_index(definition).await?;
        Ok(outcome)
    }
}
