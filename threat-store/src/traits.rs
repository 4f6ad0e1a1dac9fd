//! Score store interface

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use threat_core::{DepartmentScores, ThreatScore};

/// Errors from score store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Index '{index}' returned status {status}: {body}")]
    Status {
        index: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Index '{0}' does not exist")]
    MissingIndex(String),
}

/// Outcome of [`ScoreStore::ensure_schema`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    Created,
    AlreadyExists,
}

/// Backing store for per-department threat observations
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Create the backing structure if absent; no-op otherwise
    async fn ensure_schema(&self) -> Result<SchemaStatus, StoreError>;

    /// All indexed observations grouped by department
    async fn fetch_department_scores(&self) -> Result<DepartmentScores, StoreError>;

    /// Append one observation
    async fn store_score(&self, department: &str, score: ThreatScore) -> Result<(), StoreError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Thread-safe reference to a score store
pub type SharedStore = Arc<dyn ScoreStore>;
