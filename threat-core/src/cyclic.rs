//! Cyclic time encoding
//!
//! Maps hour-of-day onto the unit circle so that 23:00 and 01:00 sit
//! next to each other instead of at opposite ends of a linear scale.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::{ScoreError, HOURS_PER_DAY};

/// A point on the unit circle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CyclicPoint {
    pub sin: f64,
    pub cos: f64,
}

impl CyclicPoint {
    /// Euclidean distance to another point
    pub fn distance(&self, other: &CyclicPoint) -> f64 {
        ((self.sin - other.sin).powi(2) + (self.cos - other.cos).powi(2)).sqrt()
    }
}

/// Encode an hour in [0, 24)
pub fn encode(hour: i64) -> Result<CyclicPoint, ScoreError> {
    if !(0..HOURS_PER_DAY as i64).contains(&hour) {
        return Err(ScoreError::OutOfRange(hour));
    }

    Ok(point_for(hour as f64))
}

/// Encode the hour of a UTC timestamp
pub fn encode_datetime(at: &DateTime<Utc>) -> CyclicPoint {
    point_for(at.hour() as f64)
}

fn point_for(hour: f64) -> CyclicPoint {
    let angle = 2.0 * PI * hour / HOURS_PER_DAY as f64;
    CyclicPoint {
        sin: angle.sin(),
        cos: angle.cos(),
    }
}
