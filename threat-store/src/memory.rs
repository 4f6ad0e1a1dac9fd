//! In-process score store

use async_trait::async_trait;
use parking_lot::RwLock;

use threat_core::{DepartmentScoreSet, DepartmentScores, ThreatScore};

use crate::{SchemaStatus, ScoreStore, StoreError};

/// Score store held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    scores: RwLock<Option<DepartmentScores>>,
}

impl MemoryStore {
    /// A store whose schema has not been created yet
    pub fn new() -> Self {
        Self::default()
    }

    /// A ready store seeded with existing scores
    pub fn with_scores(scores: DepartmentScores) -> Self {
        Self {
            scores: RwLock::new(Some(scores)),
        }
    }

    /// Total observations across all departments
    pub fn observation_count(&self) -> usize {
        self.scores
            .read()
            .as_ref()
            .map(|s| s.values().map(DepartmentScoreSet::len).sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<SchemaStatus, StoreError> {
        let mut scores = self.scores.write();
        if scores.is_some() {
            return Ok(SchemaStatus::AlreadyExists);
        }
        *scores = Some(DepartmentScores::new());
        Ok(SchemaStatus::Created)
    }

    async fn fetch_department_scores(&self) -> Result<DepartmentScores, StoreError> {
        self.scores
            .read()
            .clone()
            .ok_or_else(|| StoreError::MissingIndex("memory".to_string()))
    }

    async fn store_score(&self, department: &str, score: ThreatScore) -> Result<(), StoreError> {
        let mut scores = self.scores.write();
        let scores = scores
            .as_mut()
            .ok_or_else(|| StoreError::MissingIndex("memory".to_string()))?;
        scores.entry(department.to_string()).or_default().push(score);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
