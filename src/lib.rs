//! # Ride Tracker
//!
//! GPS ride tracking session engine for the CicloNova cycling app.
//!
//! This library provides:
//! - A tracking session state machine (active ride, finish/cancel prompts, save or discard)
//! - Append-only path accumulation with incremental Haversine distance
//! - Elapsed-time and speed metrics derivation
//! - Read-modify-write persistence of finished rides to a key-value store
//!
//! ## Features
//!
//! - **`persistence`** - SQLite-backed key-value store
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use ride_tracker::{GeoPoint, PositionSample, SessionEvent, TrackingSession};
//!
//! let started = Utc::now();
//! let mut session = TrackingSession::new(started, None, None);
//!
//! session.apply(SessionEvent::Sample(PositionSample::new(
//!     GeoPoint::new(51.5074, -0.1278),
//!     None,
//! )));
//! session.apply(SessionEvent::Sample(PositionSample::new(
//!     GeoPoint::new(51.5090, -0.1300),
//!     Some(5.2),
//! )));
//! session.apply(SessionEvent::Tick {
//!     now: started + Duration::seconds(12),
//! });
//!
//! assert!(session.metrics().distance_km > 0.0);
//! assert_eq!(session.metrics().elapsed_seconds, 12);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TrackingError};

// Geographic utilities (Haversine distance, path length)
pub mod geo_utils;
pub use geo_utils::{haversine_km, path_distance_km};

// Append-only tracked path with incremental distance
pub mod path;
pub use path::PathAccumulator;

// Derived session metrics (elapsed time, distance, speed)
pub mod metrics;
pub use metrics::SessionMetrics;

// Tracking session state machine (pure core: events in, commands out)
pub mod session;
pub use session::{
    SaveRequest, SaveSummary, SessionCommand, SessionEvent, SessionStatus, TrackingSession,
};

// Location feed adapter (consumed collaborator)
pub mod location;
pub use location::{AccuracyTier, LocationProvider, PermissionStatus, WatchHandle, WatchOptions};

// Map rendering surface (produced-to collaborator, write-only)
pub mod map;
pub use map::{MapSurface, MapViewState};

// Saved-route records and the key-value persistence adapter
pub mod store;
pub use store::{
    append_saved_route, load_saved_routes, Difficulty, KeyValueStore, MemoryStore, RouteSource,
    SavedRouteRecord,
};
#[cfg(feature = "persistence")]
pub use store::SqliteStore;

// Imperative shell: owns the location subscription and timer, runs the session
pub mod engine;
pub use engine::{
    install_engine, take_engine, with_engine, TimerHandle, TimerSource, TrackingEngine, ENGINE,
};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RideTrackerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// Immutable once recorded; carries no identity beyond its coordinates.
///
/// # Example
/// ```
/// use ride_tracker::GeoPoint;
/// let point = GeoPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A single location fix delivered by the platform's location provider.
///
/// The provider may report an instantaneous speed in meters/second;
/// stationary or low-quality fixes come without one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PositionSample {
    pub point: GeoPoint,
    pub speed_mps: Option<f64>,
}

impl PositionSample {
    /// Create a new sample from a fix and an optional provider speed.
    pub fn new(point: GeoPoint, speed_mps: Option<f64>) -> Self {
        Self { point, speed_mps }
    }

    /// Provider speed converted to km/h, 0 when the provider supplied none.
    pub fn speed_kmh(&self) -> f64 {
        self.speed_mps.map_or(0.0, |mps| mps * 3.6)
    }
}

/// Bounding box for a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points. Returns `None` for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// A map camera region: a center point with latitude/longitude spans in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Region {
    pub center: GeoPoint,
    pub lat_span: f64,
    pub lng_span: f64,
}

impl Region {
    /// Region of a fixed span centred on a single point (follow-the-rider camera).
    pub fn around(point: GeoPoint, span_deg: f64) -> Self {
        Self {
            center: point,
            lat_span: span_deg,
            lng_span: span_deg,
        }
    }

    /// Region framing the whole bounds, padded so the path doesn't touch the
    /// screen edge, never tighter than `min_span_deg`.
    pub fn framing(bounds: &Bounds, min_span_deg: f64) -> Self {
        let pad = 1.2;
        Self {
            center: bounds.center(),
            lat_span: ((bounds.max_lat - bounds.min_lat) * pad).max(min_span_deg),
            lng_span: ((bounds.max_lng - bounds.min_lng) * pad).max(min_span_deg),
        }
    }
}

/// Configuration for a tracking session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TrackingConfig {
    /// Options passed to the location provider's watch subscription.
    pub watch: WatchOptions,

    /// Cadence of the session timer in milliseconds.
    /// Default: 1000
    pub timer_interval_ms: u64,

    /// Rides longer than this are classified `Hard`.
    /// Default: 20.0 km
    pub hard_distance_km: f64,

    /// Rides longer than this (but not `Hard`) are classified `Moderate`.
    /// Default: 10.0 km
    pub moderate_distance_km: f64,

    /// Meters of climb estimated per tracked kilometre (a simple proxy,
    /// not an elevation model).
    /// Default: 15.0
    pub elevation_m_per_km: f64,

    /// Key under which the saved-route collection lives in the store.
    /// Default: "savedRoutes"
    pub storage_key: String,

    /// Paths longer than this are thinned before being published to the map.
    /// Default: 500
    pub map_max_points: u32,

    /// Tolerance for Douglas-Peucker thinning of the published path (degrees).
    /// Default: 0.0001 (~11 meters)
    pub map_simplify_tolerance: f64,

    /// Span in degrees of the follow-the-rider map region.
    /// Default: 0.01
    pub region_span_deg: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            watch: WatchOptions::default(),
            timer_interval_ms: 1000,
            hard_distance_km: 20.0,
            moderate_distance_km: 10.0,
            elevation_m_per_km: 15.0,
            storage_key: "savedRoutes".to_string(),
            map_max_points: 500,
            map_simplify_tolerance: 0.0001,
            region_span_deg: 0.01,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
