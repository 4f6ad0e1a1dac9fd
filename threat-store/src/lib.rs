//! Threat Score Store
//!
//! Persistence boundary for department threat scores:
//! - [`ScoreStore`] trait: ensure schema, fetch grouped scores, append one
//! - Elasticsearch document index backend over its REST API
//! - In-memory backend for tests and dry runs
//! - CSV ingestion of `department,threat_score` rows

pub mod traits;
pub mod config;
pub mod elastic;
pub mod memory;
pub mod ingest;

pub use traits::*;
pub use config::*;
pub use elastic::*;
pub use memory::*;
pub use ingest::*;
