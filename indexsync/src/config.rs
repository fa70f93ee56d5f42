//! Configuration for a sync run
//!
//! Default config location: ./indexsync.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::datasource::DataSourceRegistration;
use crate::error::{Result, SyncError};
use crate::index::MissingIndexPolicy;
use crate::indexer::{IndexerJob, IndexerParameters};
use crate::names::validate_name;
use crate::poller::PollPolicy;
use crate::schema::{Field, IndexDefinition, SchemaPreset};
use crate::transport::DEFAULT_API_VERSION;

pub const DEFAULT_CONFIG_FILE: &str = "indexsync.toml";

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SyncConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub datasource: DataSourceConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service name, expanded to https://{name}.search.windows.net
    #[serde(default)]
    pub name: Option<String>,
    /// Full endpoint URL; wins over `name`
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Accept 204 from data source and indexer upserts that replace an existing definition
    #[serde(default)]
    pub accept_replaced: bool,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            endpoint: None,
            api_key: String::new(),
            api_version: default_api_version(),
            request_timeout_ms: default_request_timeout(),
            accept_replaced: false,
        }
    }
}

impl ServiceConfig {
    pub fn base_url(&self) -> Result<String> {
        match (&self.endpoint, &self.name) {
            (Some(endpoint), _) if !endpoint.is_empty() => Ok(endpoint.clone()),
            (_, Some(name)) if !name.is_empty() => {
                Ok(format!("https://{}.search.windows.net", name))
            }
            _ => Err(SyncError::config(
                "search service endpoint is not set (service.name or service.endpoint)",
            )),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,
    /// Built-in schema, used when `fields` is empty
    #[serde(default = "default_preset")]
    pub preset: Option<SchemaPreset>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub missing_on_delete: MissingIndexPolicy,
}

fn default_index_name() -> String {
    "features".to_string()
}

fn default_preset() -> Option<SchemaPreset> {
    Some(SchemaPreset::Geonames)
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            preset: default_preset(),
            fields: Vec::new(),
            missing_on_delete: MissingIndexPolicy::default(),
        }
    }
}

impl IndexConfig {
    /// Inline fields if declared, otherwise the preset
    pub fn definition(&self) -> Result<IndexDefinition> {
        if !self.fields.is_empty() {
            return Ok(IndexDefinition::new(&self.name, self.fields.clone()));
        }
        match self.preset {
            Some(preset) => Ok(preset.definition(&self.name)),
            None => Err(SyncError::config(format!(
                "index '{}' has neither a preset nor inline fields",
                self.name
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataSourceConfig {
    #[serde(default = "default_datasource_name")]
    pub name: String,
    #[serde(default = "default_datasource_description")]
    pub description: String,
    #[serde(rename = "type", default = "default_datasource_type")]
    pub source_type: String,
    #[serde(default)]
    pub connection_string: String,
    #[serde(default = "default_container")]
    pub container: String,
}

fn default_datasource_name() -> String {
    "usgs-datasource".to_string()
}

fn default_datasource_description() -> String {
    "USGS Dataset".to_string()
}

fn default_datasource_type() -> String {
    "azuresql".to_string()
}

fn default_container() -> String {
    "GeoNamesRI".to_string()
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            name: default_datasource_name(),
            description: default_datasource_description(),
            source_type: default_datasource_type(),
            connection_string: String::new(),
            container: default_container(),
        }
    }
}

impl DataSourceConfig {
    pub fn to_registration(&self) -> DataSourceRegistration {
        DataSourceRegistration::new(
            &self.name,
            &self.source_type,
            &self.connection_string,
            &self.container,
        )
        .with_description(&self.description)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
    #[serde(default = "default_indexer_name")]
    pub name: String,
    #[serde(default = "default_indexer_description")]
    pub description: String,
    #[serde(default = "default_max_failed_items")]
    pub max_failed_items: i32,
    #[serde(default = "default_max_failed_items_per_batch")]
    pub max_failed_items_per_batch: i32,
    #[serde(default)]
    pub base64_encode_keys: bool,
}

fn default_indexer_name() -> String {
    "usgs-indexer".to_string()
}

fn default_indexer_description() -> String {
    "USGS data indexer".to_string()
}

fn default_max_failed_items() -> i32 {
    10
}

fn default_max_failed_items_per_batch() -> i32 {
    5
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            name: default_indexer_name(),
            description: default_indexer_description(),
            max_failed_items: default_max_failed_items(),
            max_failed_items_per_batch: default_max_failed_items_per_batch(),
            base64_encode_keys: false,
        }
    }
}

impl IndexerConfig {
    pub fn to_job(&self, datasource: &str, index: &str) -> IndexerJob {
        IndexerJob::new(&self.name, datasource, index)
            .with_description(&self.description)
            .with_parameters(IndexerParameters {
                max_failed_items: self.max_failed_items,
                max_failed_items_per_batch: self.max_failed_items_per_batch,
                base64_encode_keys: self.base64_encode_keys,
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_poll_interval")]
    pub max_interval_ms: u64,
    /// No deadline when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// 0 = unbounded
    #[serde(default)]
    pub max_attempts: u32,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_poll_interval() -> u64 {
    30_000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            backoff_multiplier: default_backoff_multiplier(),
            max_interval_ms: default_max_poll_interval(),
            timeout_secs: None,
            max_attempts: 0,
        }
    }
}

impl PollConfig {
    pub fn to_policy(&self) -> PollPolicy {
        let mut policy = PollPolicy::fixed(Duration::from_millis(self.interval_ms)).with_backoff(
            self.backoff_multiplier,
            Duration::from_millis(self.max_interval_ms),
        );
        if let Some(secs) = self.timeout_secs {
            policy = policy.with_timeout(Duration::from_secs(secs));
        }
        if self.max_attempts > 0 {
            policy = policy.with_max_attempts(self.max_attempts);
        }
        policy
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl SyncConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load config from file path, or fall back to defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SyncError::config(format!("cannot serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Check everything that can be checked without talking to the service
    pub fn validate(&self) -> Result<()> {
        self.service.base_url()?;
        if self.service.api_key.is_empty() {
            return Err(SyncError::config(
                "search service API key is not set (service.api_key or INDEXSYNC_API_KEY)",
            ));
        }

        validate_name("index", &self.index.name)?;
        validate_name("data source", &self.datasource.name)?;
        validate_name("indexer", &self.indexer.name)?;

        if self.datasource.connection_string.is_empty() {
            return Err(SyncError::config(
                "data source connection string is not set (datasource.connection_string or INDEXSYNC_CONNECTION_STRING)",
            ));
        }
        if self.datasource.container.is_empty() {
            return Err(SyncError::config("data source container is not set"));
        }
        if self.poll.interval_ms == 0 {
            return Err(SyncError::config("poll.interval_ms must be greater than zero"));
        }
        let multiplier = self.poll.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(SyncError::config(format!(
                "poll.backoff_multiplier must be a finite number of at least 1.0, got {}",
                multiplier
            )));
        }

        self.index.definition()?.validate()
    }
}
