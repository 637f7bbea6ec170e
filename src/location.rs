//! Location feed adapter consumed by the tracking engine.
//!
//! Platform hosts (the mobile shell, or a simulator in tests) implement
//! [`LocationProvider`]. The engine asks for permission, takes one initial
//! fix, opens a watch subscription and then receives samples as events;
//! the subscription handle is owned exclusively by the engine and cancelled
//! exactly once at teardown.

use crate::error::Result;
use crate::PositionSample;

/// Outcome of a platform permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Requested accuracy for the watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum AccuracyTier {
    /// Coarse, battery-friendly fixes.
    Low,
    /// Platform default.
    Balanced,
    /// Best available fixes (navigation).
    High,
}

/// Options for a watch subscription.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct WatchOptions {
    /// Minimum movement in meters before the provider reports a new fix.
    /// Default: 10.0
    pub min_distance_m: f64,
    /// Minimum interval between fixes in milliseconds.
    /// Default: 1000
    pub min_interval_ms: u64,
    /// Requested accuracy tier.
    /// Default: High
    pub accuracy: AccuracyTier,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            min_distance_m: 10.0,
            min_interval_ms: 1000,
            accuracy: AccuracyTier::High,
        }
    }
}

/// The platform location service, as seen by the engine.
pub trait LocationProvider: Send {
    /// Ask the user for location permission. Never retried automatically.
    fn request_permission(&mut self) -> PermissionStatus;

    /// One-shot current position, used as the session's initial fix.
    fn current_position(&mut self) -> Result<PositionSample>;

    /// Open a continuous watch subscription. Samples are delivered to the
    /// engine by the host event loop, not through this trait.
    fn watch_position(&mut self, options: &WatchOptions) -> Result<Box<dyn WatchHandle>>;
}

/// Handle to an open watch subscription.
pub trait WatchHandle: Send {
    /// Stop the platform subscription. Called at most once by the engine.
    fn cancel(&mut self);
}
