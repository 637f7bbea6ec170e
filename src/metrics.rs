//! Derived session metrics: elapsed time, distance, speed.
//!
//! Metrics are recomputed on each new sample or timer tick and are never
//! persisted on their own, only as part of a finished session snapshot.

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

/// Live metrics of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SessionMetrics {
    /// Whole seconds since the session started, frozen when it leaves Active.
    pub elapsed_seconds: u64,
    /// Cumulative path distance in kilometres.
    pub distance_km: f64,
    /// Most recent provider-reported speed in km/h (0 when none was supplied).
    pub speed_kmh: f64,
}

impl SessionMetrics {
    /// Average speed over the whole session in km/h.
    ///
    /// Guarded for the degenerate zero-elapsed case: reports 0 rather than
    /// letting a division by zero produce NaN or infinity.
    pub fn average_speed_kmh(&self) -> f64 {
        if self.elapsed_seconds == 0 {
            return 0.0;
        }
        self.distance_km / (self.elapsed_seconds as f64 / 3600.0)
    }
}

/// Whole seconds elapsed between two instants, floored, never negative.
pub fn elapsed_seconds(started_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let ms = now.signed_duration_since(started_at).num_milliseconds();
    if ms <= 0 {
        0
    } else {
        (ms / 1000) as u64
    }
}

/// Estimated climb in meters for a given distance.
///
/// A flat per-kilometre proxy, not an elevation model.
pub fn elevation_estimate_m(distance_km: f64, m_per_km: f64) -> u32 {
    (distance_km * m_per_km).round() as u32
}
