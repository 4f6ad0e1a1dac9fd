//! Threat Score Runtime
//!
//! Orchestrates one reporting cycle against an injected score store:
//! fetch per-department scores, aggregate, and report.

pub mod service;

pub use service::*;
