//! Append-only tracked path with incremental distance accumulation.
//!
//! The path is the ordered sequence of accepted fixes for one session.
//! Insertion order is chronological order; nothing is ever reordered or
//! deduplicated, and length only grows while the session is active.

use crate::geo_utils::haversine_km;
use crate::GeoPoint;

/// Accumulates a session's path and its cumulative distance.
#[derive(Debug, Clone, Default)]
pub struct PathAccumulator {
    points: Vec<GeoPoint>,
    distance_km: f64,
}

impl PathAccumulator {
    /// Empty path (session started before the first fix arrived).
    pub fn new() -> Self {
        Self::default()
    }

    /// Path seeded with the initial fix.
    pub fn with_initial(point: GeoPoint) -> Self {
        Self {
            points: vec![point],
            distance_km: 0.0,
        }
    }

    /// Append a fix and return the distance delta in kilometres.
    ///
    /// The first fix contributes 0; every later fix contributes the
    /// great-circle distance from the previous last point. Fixes are taken
    /// as-is: no deduplication, no bounds checking.
    pub fn accept(&mut self, point: GeoPoint) -> f64 {
        let delta = match self.points.last() {
            Some(last) => haversine_km(last, &point),
            None => 0.0,
        };
        self.points.push(point);
        self.distance_km += delta;
        delta
    }

    /// The accepted fixes, in arrival order.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Cumulative distance in kilometres.
    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
