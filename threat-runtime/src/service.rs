//! Score service
//!
//! Owns no global state: the store is passed in at construction and
//! lives as long as the service.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use threat_core::{
    aggregate_weighted, AggregatedScore, AggregationStrategy, DepartmentScores, ScoreError,
    ScoreRecord, WeightedDepartmentScoreSet, DEFAULT_IMPORTANCE,
};
use threat_store::{SchemaStatus, SharedStore, StoreError};

/// Errors from a reporting cycle
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Per-department importance with a fallback for unlisted departments
#[derive(Debug, Clone)]
pub struct ImportanceTable {
    weights: HashMap<String, f64>,
    default_importance: f64,
}

impl Default for ImportanceTable {
    fn default() -> Self {
        Self {
            weights: HashMap::new(),
            default_importance: DEFAULT_IMPORTANCE,
        }
    }
}

impl ImportanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, department: &str, importance: f64) -> Self {
        self.weights.insert(department.to_string(), importance);
        self
    }

    pub fn with_default(mut self, importance: f64) -> Self {
        self.default_importance = importance;
        self
    }

    pub fn importance(&self, department: &str) -> f64 {
        self.weights
            .get(department)
            .copied()
            .unwrap_or(self.default_importance)
    }

    /// Attach importance to every department, validating each weight
    pub fn apply(
        &self,
        scores: DepartmentScores,
    ) -> Result<Vec<WeightedDepartmentScoreSet>, ScoreError> {
        let mut departments: Vec<_> = scores.into_iter().collect();
        departments.sort_by(|a, b| a.0.cmp(&b.0));

        departments
            .into_iter()
            .map(|(department, set)| {
                if set.is_empty() {
                    return Err(ScoreError::EmptyInput(Some(department)));
                }
                WeightedDepartmentScoreSet::new(self.importance(&department), set)
            })
            .collect()
    }
}

/// Observation summary for one department
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentSummary {
    pub department: String,
    pub observations: usize,
    pub mean: Option<f64>,
    pub importance: Option<f64>,
}

/// Result of one reporting cycle
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub generated_at: DateTime<Utc>,
    /// "robust", "strict" or "weighted"
    pub method: String,
    pub departments: Vec<DepartmentSummary>,
    pub score: AggregatedScore,
}

impl ScoreReport {
    fn new(
        method: &str,
        scores: &DepartmentScores,
        importance: Option<&ImportanceTable>,
        score: AggregatedScore,
    ) -> Self {
        let mut departments: Vec<_> = scores
            .iter()
            .map(|(department, set)| DepartmentSummary {
                department: department.clone(),
                observations: set.len(),
                mean: set.mean(),
                importance: importance.map(|table| table.importance(department)),
            })
            .collect();
        departments.sort_by(|a, b| a.department.cmp(&b.department));

        Self {
            generated_at: Utc::now(),
            method: method.to_string(),
            departments,
            score,
        }
    }

    pub fn observation_count(&self) -> usize {
        self.departments.iter().map(|d| d.observations).sum()
    }
}

/// Fetch, aggregate and store department threat scores
pub struct ScoreService {
    store: SharedStore,
}

impl ScoreService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Make sure the backing index exists
    pub async fn prepare(&self) -> Result<SchemaStatus, RuntimeError> {
        let status = self.store.ensure_schema().await?;
        debug!("Schema on {}: {:?}", self.store.name(), status);
        Ok(status)
    }

    /// Unweighted aggregation over every department
    pub async fn aggregate(&self, strategy: AggregationStrategy) -> Result<ScoreReport, RuntimeError> {
        let scores = self.store.fetch_department_scores().await?;
        let score = strategy.aggregate(scores.values())?;

        info!(
            "Aggregated {} departments ({}): {}",
            scores.len(),
            strategy,
            score
        );
        Ok(ScoreReport::new(&strategy.to_string(), &scores, None, score))
    }

    /// Importance-weighted aggregation over every department
    pub async fn aggregate_weighted(
        &self,
        importance: &ImportanceTable,
    ) -> Result<ScoreReport, RuntimeError> {
        let scores = self.store.fetch_department_scores().await?;
        let weighted = importance.apply(scores.clone())?;
        let score = aggregate_weighted(&weighted)?;

        info!("Weighted aggregate of {} departments: {}", scores.len(), score);
        Ok(ScoreReport::new("weighted", &scores, Some(importance), score))
    }

    /// Store records with at most `max_concurrent` writes in flight
    pub async fn ingest(
        &self,
        records: Vec<ScoreRecord>,
        max_concurrent: usize,
    ) -> Result<usize, RuntimeError> {
        let total = records.len();
        let store = &self.store;

        stream::iter(records)
            .map(|record| async move {
                store
                    .store_score(&record.department, record.threat_score)
                    .await
                    .map_err(|e| {
                        warn!("Failed to store score for {}: {}", record.department, e);
                        e
                    })
            })
            .buffer_unordered(max_concurrent.max(1))
            .try_collect::<Vec<_>>()
            .await?;

        info!("Stored {} scores in {}", total, store.name());
        Ok(total)
    }
}
