//! # Tracking Engine
//!
//! Imperative shell around the pure session state machine.
//!
//! The engine owns the two asynchronous resources a live session needs - the
//! location watch subscription and the 1-second timer - plus the adapters it
//! talks to (store, map surface). It feeds events into
//! [`TrackingSession`] and executes the commands that come back.
//!
//! ## Resource discipline
//!
//! Handles are acquired when the session starts and released exactly once,
//! on whichever exit path comes first: save, discard, or plain disposal.
//! [`TrackingEngine::teardown`] is idempotent (`Option::take` per handle)
//! and also runs on `Drop`, so a subscription can never outlive its screen.
//!
//! Mobile hosts interact through the global singleton (see [`ENGINE`] and
//! the FFI layer); Rust hosts can own an engine directly.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use once_cell::sync::Lazy;

use crate::error::{Result, TrackingError};
use crate::location::{LocationProvider, PermissionStatus, WatchHandle};
use crate::map::{thin_for_display, MapSurface, MapViewState};
use crate::metrics::SessionMetrics;
use crate::session::{
    SaveRequest, SaveSummary, SessionCommand, SessionEvent, SessionStatus, TrackingSession,
};
use crate::store::{append_saved_route, load_saved_routes, KeyValueStore, SavedRouteRecord};
use crate::{Bounds, GeoPoint, PositionSample, Region, TrackingConfig};

// ============================================================================
// Timer Source
// ============================================================================

/// Host scheduler for the session timer. The host delivers the actual ticks
/// back through [`TrackingEngine::tick`]; the handle only controls the
/// platform-side interval.
pub trait TimerSource: Send {
    fn start(&mut self, interval_ms: u64) -> Box<dyn TimerHandle>;
}

/// Handle to a running interval timer.
pub trait TimerHandle: Send {
    /// Stop the platform interval. Called at most once by the engine.
    fn cancel(&mut self);
}

// ============================================================================
// Tracking Engine
// ============================================================================

/// Owns one tracking session and its resources from start to save-or-discard.
pub struct TrackingEngine {
    session: TrackingSession,
    config: TrackingConfig,
    provider: Box<dyn LocationProvider>,
    store: Box<dyn KeyValueStore>,
    map: Box<dyn MapSurface>,
    timers: Box<dyn TimerSource>,
    watch: Option<Box<dyn WatchHandle>>,
    timer: Option<Box<dyn TimerHandle>>,
}

impl std::fmt::Debug for TrackingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingEngine")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("watch_active", &self.watch.is_some())
            .field("timer_active", &self.timer.is_some())
            .finish_non_exhaustive()
    }
}

impl TrackingEngine {
    /// Start a new session: ask for permission, take an initial fix, open the
    /// watch subscription and the timer, publish the first map view.
    ///
    /// A denied permission aborts the whole flow. A failed initial fix does
    /// not: the session starts with an empty path and fills up as samples
    /// arrive.
    pub fn start(
        mut provider: Box<dyn LocationProvider>,
        store: Box<dyn KeyValueStore>,
        map: Box<dyn MapSurface>,
        mut timers: Box<dyn TimerSource>,
        reference_route: Option<Vec<GeoPoint>>,
        config: TrackingConfig,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if provider.request_permission() == PermissionStatus::Denied {
            return Err(TrackingError::permission_denied("location"));
        }

        let initial_fix = match provider.current_position() {
            Ok(sample) => Some(sample),
            Err(err) => {
                warn!("no initial fix, starting with an empty path: {err}");
                None
            }
        };

        let watch = provider.watch_position(&config.watch)?;
        let timer = timers.start(config.timer_interval_ms);

        let session = TrackingSession::new(now, initial_fix, reference_route);
        info!(
            "session started at {} ({} initial fix)",
            now,
            if session.path().is_empty() { "no" } else { "with" }
        );

        let mut engine = Self {
            session,
            config,
            provider,
            store,
            map,
            timers,
            watch: Some(watch),
            timer: Some(timer),
        };
        engine.publish_map();
        Ok(engine)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// A location fix arrived from the platform watch.
    pub fn handle_sample(&mut self, sample: PositionSample) {
        let accepting = matches!(
            self.session.status(),
            SessionStatus::Active | SessionStatus::PendingFinishConfirm
        );
        let commands = self.session.apply(SessionEvent::Sample(sample));
        self.run(commands);
        if accepting {
            self.publish_map();
        }
    }

    /// The host timer fired.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        let commands = self.session.apply(SessionEvent::Tick { now });
        self.run(commands);
    }

    /// Rider tapped "finish".
    pub fn request_finish(&mut self) {
        let commands = self.session.apply(SessionEvent::FinishRequested);
        self.run(commands);
    }

    /// Rider dismissed the finish prompt.
    pub fn dismiss_finish(&mut self) {
        let commands = self.session.apply(SessionEvent::FinishDismissed);
        self.run(commands);
    }

    /// Rider confirmed the finish prompt.
    pub fn confirm_finish(&mut self) {
        let commands = self.session.apply(SessionEvent::FinishConfirmed);
        self.run(commands);
    }

    /// Rider confirmed cancelling the route.
    pub fn cancel_route(&mut self) {
        let commands = self.session.apply(SessionEvent::RouteCancelConfirmed);
        self.run(commands);
    }

    /// Hardware back while riding.
    pub fn back_pressed(&mut self) {
        let commands = self.session.apply(SessionEvent::BackPressed);
        self.run(commands);
    }

    /// The location subsystem failed mid-session. The session keeps its state
    /// and last-known metrics; the host shows a non-blocking notice and the
    /// subscription is not retried automatically.
    pub fn report_provider_error(&mut self, message: &str) {
        warn!("location provider fault (session continues): {message}");
    }

    // ========================================================================
    // Save / Discard
    // ========================================================================

    /// Persist the ride and finish the session.
    ///
    /// Validation failures and write failures both leave the session in
    /// `PendingSave` so the rider can correct the name or retry.
    pub fn save(&mut self, request: SaveRequest, now: DateTime<Utc>) -> Result<SavedRouteRecord> {
        let record = self.session.prepare_record(&request, now, &self.config)?;
        append_saved_route(
            self.store.as_mut(),
            &self.config.storage_key,
            record.clone(),
        )?;
        let commands = self.session.confirm_saved();
        self.run(commands);
        self.teardown();
        info!("session saved: {} ({:.2} km)", record.name, record.distance_km);
        Ok(record)
    }

    /// Finish the session without writing anything.
    pub fn discard(&mut self) -> Result<()> {
        let commands = self.session.discard()?;
        self.run(commands);
        self.teardown();
        info!("session discarded");
        Ok(())
    }

    // ========================================================================
    // Map Publishing
    // ========================================================================

    /// What the map should currently show.
    pub fn map_view(&self) -> MapViewState {
        let points = self.session.path().points();
        let user_path = if points.len() > self.config.map_max_points as usize {
            thin_for_display(
                points,
                self.config.map_simplify_tolerance,
                self.config.map_max_points as usize,
            )
        } else {
            points.to_vec()
        };

        MapViewState {
            user_path,
            reference_route: self.session.reference_route().map(|r| r.to_vec()),
            region: points
                .last()
                .map(|last| Region::around(*last, self.config.region_span_deg)),
        }
    }

    /// Re-frame the camera on the whole tracked path.
    pub fn recenter(&mut self) {
        let mut view = self.map_view();
        if let Some(bounds) = Bounds::from_points(self.session.path().points()) {
            view.region = Some(Region::framing(&bounds, self.config.region_span_deg));
        }
        self.map.render(&view);
    }

    fn publish_map(&mut self) {
        let view = self.map_view();
        self.map.render(&view);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn metrics(&self) -> SessionMetrics {
        self.session.metrics()
    }

    pub fn save_summary(&self) -> SaveSummary {
        self.session.save_summary()
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Previously saved rides, straight from the store.
    pub fn saved_routes(&self) -> Vec<SavedRouteRecord> {
        load_saved_routes(self.store.as_ref(), &self.config.storage_key)
    }

    // ========================================================================
    // Resource Release
    // ========================================================================

    /// Release the location subscription and the timer. Idempotent: each
    /// handle is cancelled at most once, and later calls are no-ops.
    pub fn teardown(&mut self) {
        if let Some(mut watch) = self.watch.take() {
            watch.cancel();
            debug!("location watch cancelled");
        }
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
            debug!("session timer stopped");
        }
    }

    fn run(&mut self, commands: Vec<SessionCommand>) {
        for command in commands {
            match command {
                SessionCommand::SuspendTimer => {
                    if let Some(mut timer) = self.timer.take() {
                        timer.cancel();
                    }
                }
                SessionCommand::ResumeTimer => {
                    if self.timer.is_none() {
                        self.timer = Some(self.timers.start(self.config.timer_interval_ms));
                    }
                }
                SessionCommand::StopTracking => {
                    if let Some(mut watch) = self.watch.take() {
                        watch.cancel();
                    }
                    if let Some(mut timer) = self.timer.take() {
                        timer.cancel();
                    }
                }
            }
        }
    }
}

impl Drop for TrackingEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ============================================================================
// Global Singleton
// ============================================================================

/// The active session engine, if any.
///
/// This singleton lets FFI calls reach the running session without passing
/// state back and forth across the FFI boundary. At most one session is live
/// at a time; installing a new one drops (and thereby tears down) the old.
pub static ENGINE: Lazy<Mutex<Option<TrackingEngine>>> = Lazy::new(|| Mutex::new(None));

/// Run `f` against the active engine. Returns `None` when no session is live.
pub fn with_engine<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut TrackingEngine) -> R,
{
    let mut engine = ENGINE.lock().unwrap();
    engine.as_mut().map(f)
}

/// Make `engine` the active session, tearing down any previous one.
pub fn install_engine(engine: TrackingEngine) {
    let mut slot = ENGINE.lock().unwrap();
    *slot = Some(engine);
}

/// Remove and return the active session engine, if any. Dropping the returned
/// value releases its resources.
pub fn take_engine() -> Option<TrackingEngine> {
    ENGINE.lock().unwrap().take()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::WatchOptions;
    use crate::store::MemoryStore;
    use crate::GeoPoint;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Counters {
        watch_started: Arc<AtomicUsize>,
        watch_cancelled: Arc<AtomicUsize>,
        timer_started: Arc<AtomicUsize>,
        timer_cancelled: Arc<AtomicUsize>,
    }

    struct MockProvider {
        grant: bool,
        fix: Option<PositionSample>,
        counters: Counters,
    }

    impl LocationProvider for MockProvider {
        fn request_permission(&mut self) -> PermissionStatus {
            if self.grant {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            }
        }

        fn current_position(&mut self) -> Result<PositionSample> {
            self.fix
                .ok_or_else(|| TrackingError::provider("no fix available"))
        }

        fn watch_position(&mut self, _options: &WatchOptions) -> Result<Box<dyn WatchHandle>> {
            self.counters.watch_started.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockWatch {
                counters: self.counters.clone(),
            }))
        }
    }

    struct MockWatch {
        counters: Counters,
    }

    impl WatchHandle for MockWatch {
        fn cancel(&mut self) {
            self.counters.watch_cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MockTimers {
        counters: Counters,
    }

    impl TimerSource for MockTimers {
        fn start(&mut self, _interval_ms: u64) -> Box<dyn TimerHandle> {
            self.counters.timer_started.fetch_add(1, Ordering::SeqCst);
            Box::new(MockTimerHandle {
                counters: self.counters.clone(),
            })
        }
    }

    struct MockTimerHandle {
        counters: Counters,
    }

    impl TimerHandle for MockTimerHandle {
        fn cancel(&mut self) {
            self.counters.timer_cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Clone, Default)]
    struct RecordingMap {
        views: Arc<Mutex<Vec<MapViewState>>>,
    }

    impl MapSurface for RecordingMap {
        fn render(&mut self, view: &MapViewState) {
            self.views.lock().unwrap().push(view.clone());
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn start_point() -> GeoPoint {
        GeoPoint::new(51.5074, -0.1278)
    }

    fn start_engine(
        grant: bool,
        fix: Option<PositionSample>,
    ) -> (Result<TrackingEngine>, Counters, MemoryStore, RecordingMap) {
        let counters = Counters::default();
        let store = MemoryStore::new();
        let map = RecordingMap::default();
        let engine = TrackingEngine::start(
            Box::new(MockProvider {
                grant,
                fix,
                counters: counters.clone(),
            }),
            Box::new(store.clone()),
            Box::new(map.clone()),
            Box::new(MockTimers {
                counters: counters.clone(),
            }),
            None,
            TrackingConfig::default(),
            t0(),
        );
        (engine, counters, store, map)
    }

    #[test]
    fn test_start_publishes_initial_view() {
        let (engine, counters, _store, map) =
            start_engine(true, Some(PositionSample::new(start_point(), None)));
        let engine = engine.unwrap();

        assert_eq!(engine.status(), SessionStatus::Active);
        assert_eq!(counters.watch_started.load(Ordering::SeqCst), 1);
        assert_eq!(counters.timer_started.load(Ordering::SeqCst), 1);

        let views = map.views.lock().unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].user_path.len(), 1);
        assert!(views[0].region.is_some());
    }

    #[test]
    fn test_permission_denied_aborts() {
        let (engine, counters, _store, _map) = start_engine(false, None);
        assert!(matches!(
            engine.unwrap_err(),
            TrackingError::PermissionDenied { .. }
        ));
        assert_eq!(counters.watch_started.load(Ordering::SeqCst), 0);
        assert_eq!(counters.timer_started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_initial_fix_starts_empty() {
        let (engine, _counters, _store, _map) = start_engine(true, None);
        let mut engine = engine.unwrap();
        assert!(engine.session().path().is_empty());

        engine.handle_sample(PositionSample::new(start_point(), None));
        assert_eq!(engine.session().path().len(), 1);
        assert_eq!(engine.metrics().distance_km, 0.0);
    }

    #[test]
    fn test_samples_publish_to_map() {
        let (engine, _counters, _store, map) =
            start_engine(true, Some(PositionSample::new(start_point(), None)));
        let mut engine = engine.unwrap();

        engine.handle_sample(PositionSample::new(GeoPoint::new(51.5090, -0.1300), Some(5.0)));
        assert_eq!(engine.metrics().speed_kmh, 18.0);

        let views = map.views.lock().unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views.last().unwrap().user_path.len(), 2);
    }

    #[test]
    fn test_dismissed_prompt_restarts_timer() {
        let (engine, counters, _store, _map) =
            start_engine(true, Some(PositionSample::new(start_point(), None)));
        let mut engine = engine.unwrap();

        engine.request_finish();
        assert_eq!(counters.timer_cancelled.load(Ordering::SeqCst), 1);

        engine.dismiss_finish();
        assert_eq!(counters.timer_started.load(Ordering::SeqCst), 2);
        assert_eq!(engine.status(), SessionStatus::Active);
    }

    #[test]
    fn test_save_appends_one_record_and_tears_down() {
        let (engine, counters, store, _map) =
            start_engine(true, Some(PositionSample::new(start_point(), None)));
        let mut engine = engine.unwrap();

        engine.handle_sample(PositionSample::new(GeoPoint::new(51.5090, -0.1300), None));
        engine.tick(t0() + Duration::seconds(125));
        engine.request_finish();
        engine.confirm_finish();

        let record = engine
            .save(
                SaveRequest {
                    name: "Morning Ride".to_string(),
                    rating: 4,
                    note: String::new(),
                },
                t0() + Duration::seconds(130),
            )
            .unwrap();

        assert_eq!(engine.status(), SessionStatus::Saved);
        assert_eq!(record.duration_minutes, 2);

        let records = load_saved_routes(&store, "savedRoutes");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Morning Ride");

        assert_eq!(counters.watch_cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(counters.timer_cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_validation_leaves_session_retryable() {
        let (engine, _counters, store, _map) =
            start_engine(true, Some(PositionSample::new(start_point(), None)));
        let mut engine = engine.unwrap();

        engine.cancel_route();
        let err = engine
            .save(
                SaveRequest {
                    name: String::new(),
                    rating: 0,
                    note: String::new(),
                },
                t0() + Duration::seconds(10),
            )
            .unwrap_err();

        assert!(matches!(err, TrackingError::Validation { .. }));
        assert_eq!(engine.status(), SessionStatus::PendingSave);
        assert!(load_saved_routes(&store, "savedRoutes").is_empty());

        // corrected name goes through
        engine
            .save(
                SaveRequest {
                    name: "Short Loop".to_string(),
                    rating: 2,
                    note: String::new(),
                },
                t0() + Duration::seconds(10),
            )
            .unwrap();
        assert_eq!(load_saved_routes(&store, "savedRoutes").len(), 1);
    }

    #[test]
    fn test_discard_writes_nothing() {
        let (engine, counters, store, _map) =
            start_engine(true, Some(PositionSample::new(start_point(), None)));
        let mut engine = engine.unwrap();

        engine.cancel_route();
        engine.discard().unwrap();

        assert_eq!(engine.status(), SessionStatus::Discarded);
        assert!(load_saved_routes(&store, "savedRoutes").is_empty());
        assert_eq!(counters.watch_cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_teardown_is_idempotent_including_drop() {
        let (engine, counters, _store, _map) =
            start_engine(true, Some(PositionSample::new(start_point(), None)));
        let mut engine = engine.unwrap();

        engine.teardown();
        engine.teardown();
        drop(engine);

        assert_eq!(counters.watch_cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(counters.timer_cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_mid_ride_releases_resources() {
        let (engine, counters, _store, _map) =
            start_engine(true, Some(PositionSample::new(start_point(), None)));
        let mut engine = engine.unwrap();
        engine.handle_sample(PositionSample::new(GeoPoint::new(51.51, -0.13), None));

        drop(engine);

        assert_eq!(counters.watch_cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(counters.timer_cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_recenter_frames_whole_path() {
        let (engine, _counters, _store, map) =
            start_engine(true, Some(PositionSample::new(start_point(), None)));
        let mut engine = engine.unwrap();
        engine.handle_sample(PositionSample::new(GeoPoint::new(51.52, -0.10), None));

        engine.recenter();

        let views = map.views.lock().unwrap();
        let region = views.last().unwrap().region.unwrap();
        // framed region spans the whole ride, not just the follow span
        assert!(region.lat_span > TrackingConfig::default().region_span_deg);
    }
}
