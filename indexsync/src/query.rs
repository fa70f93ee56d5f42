//! Ad-hoc queries against a provisioned index

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::names::validate_name;
use crate::transport::SearchServiceClient;

pub type Document = Map<String, Value>;

/// Free-text query with optional filter and projection
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Comma-separated list of fields to return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            search: query.into(),
            ..Default::default()
        }
    }

    /// An empty filter string means no filter
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = (!filter.is_empty()).then_some(filter);
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = fields
            .into_iter()
            .map(|f| f.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.select = (!joined.is_empty()).then_some(joined);
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<Document>,
}

pub struct QueryClient {
    client: Arc<SearchServiceClient>,
    index: String,
}

impl QueryClient {
    pub fn new(client: Arc<SearchServiceClient>, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }

    /// Run the query; search metadata (`@search.*`) is stripped from results
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>> {
        validate_name("index", &self.index)?;

        let path = format!("indexes/{}/docs/search", self.index);
        let response = self
            .client
            .call(Method::POST, &path, Some(request), &[StatusCode::OK])
            .await?;

        let body: SearchResponse = serde_json::from_str(&response.text().await?)?;
        debug!(index = %self.index, hits = body.value.len(), "search completed");

        Ok(body
            .value
            .into_iter()
            .map(|mut doc| {
                doc.retain(|k, _| !k.starts_with("@search."));
                doc
            })
            .collect())
    }
}
