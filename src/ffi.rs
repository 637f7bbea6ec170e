//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose the tracking engine
//! to Kotlin and Swift. The host supplies its platform services as callback
//! interfaces (location feed, interval timer, storage bridge, map surface);
//! the engine owns the subscription and timer handles on the Rust side and
//! releases them on every exit path. All FFI functions are prefixed with
//! `session_` and operate on the global engine singleton.

use std::sync::Arc;

use chrono::Utc;
use log::info;

use crate::engine::{
    install_engine, take_engine, with_engine, TimerHandle, TimerSource, TrackingEngine,
};
use crate::error::TrackingError;
use crate::location::{LocationProvider, PermissionStatus, WatchHandle, WatchOptions};
use crate::map::{MapSurface, MapViewState};
use crate::session::{SaveRequest, SaveSummary, SessionStatus};
use crate::store::KeyValueStore;
use crate::{GeoPoint, PositionSample, SessionMetrics, TrackingConfig};

// ============================================================================
// Host Callback Interfaces
// ============================================================================

/// Platform location service. Implement this in Kotlin/Swift.
///
/// Fixes from the watch are not returned through this interface; the host
/// delivers them with [`session_push_sample`] so everything funnels through
/// the same event queue.
#[uniffi::export(callback_interface)]
pub trait LocationDelegate: Send + Sync {
    /// Ask the user for location permission; `true` when granted.
    fn request_permission(&self) -> bool;
    /// One-shot current position, used as the initial fix.
    fn current_position(&self) -> Option<PositionSample>;
    /// Start the platform watch with the given options.
    fn start_watch(&self, options: WatchOptions);
    /// Stop the platform watch.
    fn stop_watch(&self);
}

/// Platform interval timer. The host calls [`session_tick`] on each fire.
#[uniffi::export(callback_interface)]
pub trait TimerDelegate: Send + Sync {
    fn start_timer(&self, interval_ms: u64);
    fn stop_timer(&self);
}

/// Host key-value storage bridge (the device's local storage).
#[uniffi::export(callback_interface)]
pub trait StorageDelegate: Send + Sync {
    fn read(&self, key: String) -> Option<String>;
    /// Returns `false` when the host could not persist the value.
    fn write(&self, key: String, value: String) -> bool;
}

/// Host map component; receives the session overlay after each fix.
#[uniffi::export(callback_interface)]
pub trait MapDelegate: Send + Sync {
    fn render(&self, view: MapViewState);
}

// ============================================================================
// Delegate Adapters
// ============================================================================

struct DelegateLocationProvider {
    delegate: Arc<dyn LocationDelegate>,
}

impl LocationProvider for DelegateLocationProvider {
    fn request_permission(&mut self) -> PermissionStatus {
        if self.delegate.request_permission() {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    fn current_position(&mut self) -> crate::Result<PositionSample> {
        self.delegate
            .current_position()
            .ok_or_else(|| TrackingError::provider("host returned no current position"))
    }

    fn watch_position(&mut self, options: &WatchOptions) -> crate::Result<Box<dyn WatchHandle>> {
        self.delegate.start_watch(options.clone());
        Ok(Box::new(DelegateWatchHandle {
            delegate: Arc::clone(&self.delegate),
        }))
    }
}

struct DelegateWatchHandle {
    delegate: Arc<dyn LocationDelegate>,
}

impl WatchHandle for DelegateWatchHandle {
    fn cancel(&mut self) {
        self.delegate.stop_watch();
    }
}

struct DelegateTimerSource {
    delegate: Arc<dyn TimerDelegate>,
}

impl TimerSource for DelegateTimerSource {
    fn start(&mut self, interval_ms: u64) -> Box<dyn TimerHandle> {
        self.delegate.start_timer(interval_ms);
        Box::new(DelegateTimerHandle {
            delegate: Arc::clone(&self.delegate),
        })
    }
}

struct DelegateTimerHandle {
    delegate: Arc<dyn TimerDelegate>,
}

impl TimerHandle for DelegateTimerHandle {
    fn cancel(&mut self) {
        self.delegate.stop_timer();
    }
}

struct DelegateStore {
    delegate: Arc<dyn StorageDelegate>,
}

impl KeyValueStore for DelegateStore {
    fn read(&self, key: &str) -> crate::Result<Option<String>> {
        Ok(self.delegate.read(key.to_string()))
    }

    fn write(&mut self, key: &str, value: &str) -> crate::Result<()> {
        if self.delegate.write(key.to_string(), value.to_string()) {
            Ok(())
        } else {
            Err(TrackingError::storage("host storage rejected the write"))
        }
    }
}

struct DelegateMap {
    delegate: Arc<dyn MapDelegate>,
}

impl MapSurface for DelegateMap {
    fn render(&mut self, view: &MapViewState) {
        self.delegate.render(view.clone());
    }
}

fn no_session(operation: &str) -> TrackingError {
    TrackingError::InvalidState {
        operation: operation.to_string(),
        status: "NoSession".to_string(),
    }
}

// ============================================================================
// Session Lifecycle
// ============================================================================

/// Start a tracking session, replacing (and tearing down) any previous one.
#[uniffi::export]
pub fn session_start(
    location: Box<dyn LocationDelegate>,
    timer: Box<dyn TimerDelegate>,
    storage: Box<dyn StorageDelegate>,
    map: Box<dyn MapDelegate>,
    reference_route: Option<Vec<GeoPoint>>,
    config: Option<TrackingConfig>,
) -> Result<(), TrackingError> {
    crate::init_logging();

    if take_engine().is_some() {
        info!("[RideTrackerRust] Replacing previous session");
    }

    let engine = TrackingEngine::start(
        Box::new(DelegateLocationProvider {
            delegate: Arc::from(location),
        }),
        Box::new(DelegateStore {
            delegate: Arc::from(storage),
        }),
        Box::new(DelegateMap {
            delegate: Arc::from(map),
        }),
        Box::new(DelegateTimerSource {
            delegate: Arc::from(timer),
        }),
        reference_route,
        config.unwrap_or_default(),
        Utc::now(),
    )?;

    install_engine(engine);
    info!("[RideTrackerRust] Session started");
    Ok(())
}

/// Deliver a fix from the platform watch.
#[uniffi::export]
pub fn session_push_sample(sample: PositionSample) {
    with_engine(|e| e.handle_sample(sample));
}

/// Deliver a timer fire.
#[uniffi::export]
pub fn session_tick() {
    with_engine(|e| e.tick(Utc::now()));
}

/// Rider tapped "finish".
#[uniffi::export]
pub fn session_request_finish() {
    with_engine(|e| e.request_finish());
}

/// Rider dismissed the finish prompt.
#[uniffi::export]
pub fn session_dismiss_finish() {
    with_engine(|e| e.dismiss_finish());
}

/// Rider confirmed the finish prompt.
#[uniffi::export]
pub fn session_confirm_finish() {
    with_engine(|e| e.confirm_finish());
}

/// Rider confirmed cancelling the route.
#[uniffi::export]
pub fn session_cancel_route() {
    with_engine(|e| e.cancel_route());
}

/// Hardware back pressed while riding.
#[uniffi::export]
pub fn session_back_pressed() {
    with_engine(|e| e.back_pressed());
}

/// The platform location subsystem reported a failure.
#[uniffi::export]
pub fn session_report_provider_error(message: String) {
    with_engine(|e| e.report_provider_error(&message));
}

/// Persist the ride. Returns the saved record as JSON and ends the session.
/// Validation and write failures leave the session open for a retry.
#[uniffi::export]
pub fn session_save(request: SaveRequest) -> Result<String, TrackingError> {
    let record = match with_engine(|e| e.save(request, Utc::now())) {
        Some(Ok(record)) => record,
        Some(Err(err)) => return Err(err),
        None => return Err(no_session("save")),
    };

    // terminal state reached; free the singleton slot
    take_engine();

    serde_json::to_string(&record)
        .map_err(|err| TrackingError::storage(format!("could not encode record: {err}")))
}

/// Throw the ride away and end the session.
#[uniffi::export]
pub fn session_discard() -> Result<(), TrackingError> {
    match with_engine(|e| e.discard()) {
        Some(Ok(())) => {
            take_engine();
            Ok(())
        }
        Some(Err(err)) => Err(err),
        None => Err(no_session("discard")),
    }
}

/// Dispose the session from any state (navigation-away). Releases the watch
/// subscription and the timer.
#[uniffi::export]
pub fn session_teardown() {
    if take_engine().is_some() {
        info!("[RideTrackerRust] Session torn down");
    }
}

// ============================================================================
// Session Queries
// ============================================================================

/// Current lifecycle state, `None` when no session is live.
#[uniffi::export]
pub fn session_status() -> Option<SessionStatus> {
    with_engine(|e| e.status())
}

/// Live metrics of the current session.
#[uniffi::export]
pub fn session_metrics() -> Option<SessionMetrics> {
    with_engine(|e| e.metrics())
}

/// Figures for the save prompt.
#[uniffi::export]
pub fn session_save_summary() -> Option<SaveSummary> {
    with_engine(|e| e.save_summary())
}

/// The current map overlay.
#[uniffi::export]
pub fn session_map_view() -> Option<MapViewState> {
    with_engine(|e| e.map_view())
}

/// Re-frame the camera on the whole tracked path.
#[uniffi::export]
pub fn session_recenter() {
    with_engine(|e| e.recenter());
}

/// Previously saved rides as JSON (`[]` when none or no session).
#[uniffi::export]
pub fn session_saved_routes_json() -> String {
    with_engine(|e| {
        serde_json::to_string(&e.saved_routes()).unwrap_or_else(|_| "[]".to_string())
    })
    .unwrap_or_else(|| "[]".to_string())
}
