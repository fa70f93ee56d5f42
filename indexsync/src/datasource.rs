//! Data source registration

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::names::validate_name;
use crate::transport::SearchServiceClient;

/// A named external store the indexer reads from
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceRegistration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub credentials: DataSourceCredentials,
    pub container: DataSourceContainer,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceCredentials {
    pub connection_string: String,
}

/// Source-side table or view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceContainer {
    pub name: String,
}

impl DataSourceRegistration {
    pub fn new(
        name: impl Into<String>,
        source_type: impl Into<String>,
        connection_string: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            source_type: source_type.into(),
            credentials: DataSourceCredentials {
                connection_string: connection_string.into(),
            },
            container: DataSourceContainer {
                name: container.into(),
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// Connection strings carry passwords; keep them out of logs.
impl fmt::Debug for DataSourceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceRegistration")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("source_type", &self.source_type)
            .field("credentials", &self.credentials)
            .field("container", &self.container)
            .finish()
    }
}

impl fmt::Debug for DataSourceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceCredentials")
            .field("connection_string", &"<redacted>")
            .finish()
    }
}

pub struct DataSourceRegistrar {
    client: Arc<SearchServiceClient>,
    accepted: Vec<StatusCode>,
}

impl DataSourceRegistrar {
    pub fn new(client: Arc<SearchServiceClient>) -> Self {
        Self {
            client,
            accepted: vec![StatusCode::CREATED],
        }
    }

    /// Also accept 204, which the service returns when replacing an existing source
    pub fn accept_replaced(mut self, accept: bool) -> Self {
        self.accepted = upsert_statuses(accept);
        self
    }

    /// Create or replace the data source keyed by its name
    pub async fn register(&self, registration: &DataSourceRegistration) -> Result<()> {
        validate_name("data source", &registration.name)?;

        let path = format!("datasources/{}", registration.name);
        let response = self
            .client
            .call(Method::PUT, &path, Some(registration), &self.accepted)
            .await?;

        info!(
            datasource = %registration.name,
            container = %registration.container.name,
            status = %response.status(),
            "Registered data source"
        );
        Ok(())
    }
}

pub(crate) fn upsert_statuses(accept_replaced: bool) -> Vec<StatusCode> {
    if accept_replaced {
        vec![StatusCode::CREATED, StatusCode::NO_CONTENT]
    } else {
        vec![StatusCode::CREATED]
    }
}
