//! Saved-route records and the key-value persistence adapter.
//!
//! A finished session is persisted as one [`SavedRouteRecord`] appended to a
//! JSON array kept under a single key. Saving is read-modify-write: read the
//! existing array (missing or unreadable data counts as empty, never as an
//! error), append, write the whole array back. Single-user, single-device
//! scope; last write wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};
use crate::{GeoPoint, TrackingConfig};

// ============================================================================
// Record Types
// ============================================================================

/// Ride difficulty, classified from the tracked distance at save time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

impl Difficulty {
    /// Classify a ride by distance. Boundaries fall to the easier class:
    /// exactly 20 km is Moderate, exactly 10 km is Easy.
    pub fn for_distance(distance_km: f64, config: &TrackingConfig) -> Self {
        if distance_km > config.hard_distance_km {
            Difficulty::Hard
        } else if distance_km > config.moderate_distance_km {
            Difficulty::Moderate
        } else {
            Difficulty::Easy
        }
    }
}

/// Where a saved route came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    /// Recorded live by a tracking session.
    Tracked,
    /// Imported from elsewhere (route catalog, file import).
    Imported,
}

/// Persisted snapshot of a finished session.
///
/// Owned exclusively by the store once written; a session produces exactly
/// one record on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRouteRecord {
    pub id: String,
    pub name: String,
    pub distance_km: f64,
    pub duration_minutes: u64,
    pub difficulty: Difficulty,
    pub elevation_estimate_m: u32,
    pub source_type: RouteSource,
    /// 0-5 stars.
    pub rating: u8,
    pub path: Vec<GeoPoint>,
    pub note: String,
    /// Date component only, ISO formatted on disk.
    #[serde(rename = "createdAtDate")]
    pub created_at: NaiveDate,
}

// ============================================================================
// Key-Value Store
// ============================================================================

/// Flat string key-value store, the shape of a mobile device's local storage.
pub trait KeyValueStore: Send {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store. Clones share contents, which makes it easy for tests to
/// inspect what the engine wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// Saved-Route Collection
// ============================================================================

/// Load the saved-route collection under `key`.
///
/// Missing or unreadable data is "no prior data", never an error: the save
/// path stays available even if the stored blob is corrupt.
pub fn load_saved_routes(store: &dyn KeyValueStore, key: &str) -> Vec<SavedRouteRecord> {
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!("could not read saved routes, treating as empty: {err}");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(err) => {
            warn!("stored route collection is unreadable, treating as empty: {err}");
            Vec::new()
        }
    }
}

/// Append one record to the collection under `key` (read-modify-write).
pub fn append_saved_route(
    store: &mut dyn KeyValueStore,
    key: &str,
    record: SavedRouteRecord,
) -> Result<()> {
    let mut records = load_saved_routes(store, key);
    records.push(record);
    let raw = serde_json::to_string(&records)
        .map_err(|err| TrackingError::storage(format!("could not encode saved routes: {err}")))?;
    store.write(key, &raw)
}

// ============================================================================
// SQLite Store
// ============================================================================

/// SQLite-backed key-value store, the on-device storage backend.
#[cfg(feature = "persistence")]
pub struct SqliteStore {
    db: rusqlite::Connection,
}

#[cfg(feature = "persistence")]
impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = rusqlite::Connection::open(db_path)
            .map_err(|err| TrackingError::storage(format!("could not open store: {err}")))?;
        db.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(|err| TrackingError::storage(format!("could not init schema: {err}")))?;
        Ok(Self { db })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }
}

#[cfg(feature = "persistence")]
impl KeyValueStore for SqliteStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;

        self.db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|err| TrackingError::storage(format!("read failed: {err}")))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.db
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                [key, value],
            )
            .map(|_| ())
            .map_err(|err| TrackingError::storage(format!("write failed: {err}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
