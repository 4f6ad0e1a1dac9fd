//! Threat Score Core - domain model and scoring algorithms
//!
//! This crate provides the pure, I/O-free pieces:
//! - Validated threat scores and per-department score sets
//! - Aggregation strategies (robust, strict, importance-weighted)
//! - Bounded synthetic score generation for testing
//! - Cyclic hour-of-day encoding

pub mod error;
pub mod scores;
pub mod aggregate;
pub mod generator;
pub mod cyclic;

pub use error::*;
pub use scores::*;
pub use aggregate::*;
pub use generator::*;
pub use cyclic::*;

/// Lowest valid threat score
pub const MIN_SCORE: u8 = 0;

/// Highest valid threat score
pub const MAX_SCORE: u8 = 90;

/// Hours in one cycle of the time encoder
pub const HOURS_PER_DAY: i32 = 24;

/// Importance given to departments missing from an importance table
pub const DEFAULT_IMPORTANCE: f64 = 1.0;
