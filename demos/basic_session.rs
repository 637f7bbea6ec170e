//! Simulated ride session from start to save.
//!
//! Run with: `cargo run --example basic_session`

use chrono::{Duration, Utc};
use ride_tracker::{
    GeoPoint, LocationProvider, MapSurface, MapViewState, MemoryStore, PermissionStatus,
    PositionSample, SaveRequest, TimerHandle, TimerSource, TrackingConfig, TrackingEngine,
    WatchHandle, WatchOptions,
};

struct DemoProvider;

impl LocationProvider for DemoProvider {
    fn request_permission(&mut self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn current_position(&mut self) -> ride_tracker::Result<PositionSample> {
        Ok(PositionSample::new(GeoPoint::new(51.5074, -0.1278), None))
    }

    fn watch_position(
        &mut self,
        options: &WatchOptions,
    ) -> ride_tracker::Result<Box<dyn WatchHandle>> {
        println!(
            "watch opened (min {}m, every {}ms)",
            options.min_distance_m, options.min_interval_ms
        );
        Ok(Box::new(DemoWatch))
    }
}

struct DemoWatch;

impl WatchHandle for DemoWatch {
    fn cancel(&mut self) {
        println!("watch cancelled");
    }
}

struct DemoTimers;

impl TimerSource for DemoTimers {
    fn start(&mut self, interval_ms: u64) -> Box<dyn TimerHandle> {
        println!("timer started ({interval_ms}ms)");
        Box::new(DemoTimer)
    }
}

struct DemoTimer;

impl TimerHandle for DemoTimer {
    fn cancel(&mut self) {
        println!("timer stopped");
    }
}

struct DemoMap;

impl MapSurface for DemoMap {
    fn render(&mut self, view: &MapViewState) {
        println!("map: {} points on screen", view.user_path.len());
    }
}

fn main() {
    let started = Utc::now();
    let store = MemoryStore::new();

    let mut engine = TrackingEngine::start(
        Box::new(DemoProvider),
        Box::new(store.clone()),
        Box::new(DemoMap),
        Box::new(DemoTimers),
        None,
        TrackingConfig::default(),
        started,
    )
    .expect("session should start");

    // A short ride up the Strand, one fix every ~30 seconds
    let fixes = [
        (51.5082, -0.1260, 4.6),
        (51.5090, -0.1240, 5.2),
        (51.5098, -0.1221, 5.0),
        (51.5106, -0.1202, 4.8),
    ];

    for (i, (lat, lng, speed)) in fixes.iter().enumerate() {
        engine.handle_sample(PositionSample::new(GeoPoint::new(*lat, *lng), Some(*speed)));
        engine.tick(started + Duration::seconds(30 * (i as i64 + 1)));

        let metrics = engine.metrics();
        println!(
            "  {:>4}s  {:.3} km  {:.1} km/h",
            metrics.elapsed_seconds, metrics.distance_km, metrics.speed_kmh
        );
    }

    engine.request_finish();
    engine.confirm_finish();

    let summary = engine.save_summary();
    println!(
        "ride over: {:.3} km in {}s (avg {:.1} km/h)",
        summary.distance_km, summary.elapsed_seconds, summary.average_speed_kmh
    );

    let record = engine
        .save(
            SaveRequest {
                name: "Strand Hop".to_string(),
                rating: 4,
                note: "demo ride".to_string(),
            },
            started + Duration::seconds(125),
        )
        .expect("save should succeed");

    println!(
        "saved \"{}\" ({:?}, {} min, ~{} m climb)",
        record.name, record.difficulty, record.duration_minutes, record.elevation_estimate_m
    );
    println!(
        "store now holds:\n{}",
        serde_json::to_string_pretty(&ride_tracker::load_saved_routes(&store, "savedRoutes"))
            .unwrap()
    );
}
