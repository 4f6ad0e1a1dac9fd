//! Elasticsearch score store
//!
//! Talks to the index over its REST API:
//! - `HEAD /{index}` / `PUT /{index}` for the schema
//! - `POST /{index}/_search` with `match_all` to fetch
//! - `POST /{index}/_doc` to append an observation

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use threat_core::{DepartmentScores, ThreatScore};

use crate::{create_http_client, SchemaStatus, ScoreStore, StoreConfig, StoreError};

/// Score store backed by an Elasticsearch index
pub struct ElasticStore {
    client: Client,
    config: StoreConfig,
}

impl ElasticStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = create_http_client(&config)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn check_status(&self, response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::MissingIndex(self.config.index.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                index: self.config.index.clone(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Index mapping: keyword department, integer score
pub fn index_mapping() -> serde_json::Value {
    serde_json::json!({
        "mappings": {
            "properties": {
                "department": {"type": "keyword"},
                "threat_score": {"type": "integer"}
            }
        }
    })
}

/// Interpret a `HEAD /{index}` status: present, absent, or an error
pub(crate) fn head_index_exists(index: &str, status: StatusCode) -> Result<bool, StoreError> {
    if status.is_success() {
        Ok(true)
    } else if status == StatusCode::NOT_FOUND {
        Ok(false)
    } else {
        Err(StoreError::Status {
            index: index.to_string(),
            status: status.as_u16(),
            body: String::new(),
        })
    }
}

/// Index creation lost a race with another client
pub(crate) fn is_already_exists(status: StatusCode, body: &str) -> bool {
    status == StatusCode::BAD_REQUEST && body.contains("resource_already_exists_exception")
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: HitSource,
}

#[derive(Debug, Deserialize)]
struct HitSource {
    department: String,
    threat_score: i64,
}

/// Group search hits by department, dropping out-of-range scores
pub(crate) fn group_hits(response: SearchResponse) -> DepartmentScores {
    let mut grouped = DepartmentScores::new();
    for hit in response.hits.hits {
        let HitSource {
            department,
            threat_score,
        } = hit.source;

        match ThreatScore::new(threat_score) {
            Ok(score) => grouped.entry(department).or_default().push(score),
            Err(e) => warn!("Skipping document for {}: {}", department, e),
        }
    }
    grouped
}

#[async_trait]
impl ScoreStore for ElasticStore {
    async fn ensure_schema(&self) -> Result<SchemaStatus, StoreError> {
        let url = self.config.index_url("");

        let head = self.client.head(&url).send().await?;
        if head_index_exists(&self.config.index, head.status())? {
            info!("Index '{}' already exists", self.config.index);
            return Ok(SchemaStatus::AlreadyExists);
        }

        let response = self.client.put(&url).json(&index_mapping()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_already_exists(status, &body) {
                info!("Index '{}' created concurrently", self.config.index);
                return Ok(SchemaStatus::AlreadyExists);
            }
            return Err(StoreError::Status {
                index: self.config.index.clone(),
                status: status.as_u16(),
                body,
            });
        }

        info!("Index '{}' created", self.config.index);
        Ok(SchemaStatus::Created)
    }

    async fn fetch_department_scores(&self) -> Result<DepartmentScores, StoreError> {
        let body = serde_json::json!({
            "query": {"match_all": {}},
            "size": self.config.search_size,
        });

        debug!("Searching index '{}'", self.config.index);

        let response = self
            .client
            .post(self.config.index_url("/_search"))
            .json(&body)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        let grouped = group_hits(parsed);
        debug!("Fetched scores for {} departments", grouped.len());
        Ok(grouped)
    }

    async fn store_score(&self, department: &str, score: ThreatScore) -> Result<(), StoreError> {
        let document = serde_json::json!({
            "department": department,
            "threat_score": score.value(),
        });

        let response = self
            .client
            .post(self.config.index_url("/_doc"))
            .json(&document)
            .send()
            .await?;
        self.check_status(response).await?;

        debug!("Indexed score {} for {}", score, department);
        Ok(())
    }

    fn name(&self) -> &str {
        "elasticsearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_shape() {
        let mapping = index_mapping();
        assert_eq!(
            mapping["mappings"]["properties"]["department"]["type"],
            "keyword"
        );
        assert_eq!(
            mapping["mappings"]["properties"]["threat_score"]["type"],
            "integer"
        );
    }

    #[test]
    fn test_head_status_classification() {
        assert!(head_index_exists("scores", StatusCode::OK).unwrap());
        assert!(!head_index_exists("scores", StatusCode::NOT_FOUND).unwrap());

        for status in [StatusCode::UNAUTHORIZED, StatusCode::SERVICE_UNAVAILABLE] {
            match head_index_exists("scores", status) {
                Err(StoreError::Status { status: code, .. }) => assert_eq!(code, status.as_u16()),
                other => panic!("expected status error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_already_exists_response() {
        let body = r#"{"error":{"root_cause":[{"type":"resource_already_exists_exception","reason":"index [department_scores/abc] already exists"}],"type":"resource_already_exists_exception"},"status":400}"#;
        assert!(is_already_exists(StatusCode::BAD_REQUEST, body));
        assert!(!is_already_exists(StatusCode::BAD_REQUEST, r#"{"error":{"type":"mapper_parsing_exception"}}"#));
        assert!(!is_already_exists(StatusCode::INTERNAL_SERVER_ERROR, body));
    }

    #[test]
    fn test_group_hits() {
        let raw = r#"{
            "took": 3,
            "hits": {
                "total": {"value": 4, "relation": "eq"},
                "hits": [
                    {"_index": "department_scores", "_id": "1", "_source": {"department": "it", "threat_score": 40}},
                    {"_index": "department_scores", "_id": "2", "_source": {"department": "hr", "threat_score": 10}},
                    {"_index": "department_scores", "_id": "3", "_source": {"department": "it", "threat_score": 60}},
                    {"_index": "department_scores", "_id": "4", "_source": {"department": "hr", "threat_score": 400}}
                ]
            }
        }"#;
        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        let grouped = group_hits(response);

        assert_eq!(grouped["it"].scores(), &[40, 60]);
        assert_eq!(grouped["hr"].scores(), &[10]);
    }

    #[test]
    fn test_group_hits_empty_index() {
        let response: SearchResponse = serde_json::from_str(r#"{"hits": {}}"#).unwrap();
        assert!(group_hits(response).is_empty());
    }

    #[test]
    fn test_new_store() {
        let store = ElasticStore::new(StoreConfig::default()).unwrap();
        assert_eq!(store.name(), "elasticsearch");
        assert_eq!(store.config().index, "department_scores");
    }
}
