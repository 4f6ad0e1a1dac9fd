//! Document index connection settings

use reqwest::Client;
use std::time::Duration;

use crate::StoreError;

/// Elasticsearch connection configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the cluster (default: http://localhost:9200)
    pub url: String,
    /// Index holding department scores
    pub index: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum documents returned by a fetch
    pub search_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "department_scores".to_string(),
            timeout_secs: 30,
            search_size: 1000,
        }
    }
}

impl StoreConfig {
    pub fn new(url: &str, index: &str) -> Self {
        Self {
            url: url.to_string(),
            index: index.to_string(),
            ..Default::default()
        }
    }

    pub fn with_search_size(mut self, size: usize) -> Self {
        self.search_size = size;
        self
    }

    /// `{url}/{index}{path}` with any trailing slash on the base removed
    pub fn index_url(&self, path: &str) -> String {
        format!("{}/{}{}", self.url.trim_end_matches('/'), self.index, path)
    }
}

/// Create an HTTP client for the index
pub fn create_http_client(config: &StoreConfig) -> Result<Client, StoreError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| StoreError::ClientBuild(e.to_string()))
}
