//! Tracking session state machine.
//!
//! This is the pure core of the engine: events in, state plus commands out.
//! It owns no I/O and no clocks; the imperative shell ([`crate::engine`])
//! holds the location subscription and the timer and executes the commands
//! emitted here. Every reachable state is an explicit enum variant, so the
//! whole lifecycle is enumerable and unit-testable.
//!
//! Lifecycle: `Active` → (`PendingFinishConfirm` ⇄ back) → `PendingSave` →
//! `Saved` or `Discarded`. Saving is two-phase: [`TrackingSession::prepare_record`]
//! validates and builds the record, the shell persists it, and only then
//! [`TrackingSession::confirm_saved`] moves the session to its terminal state.
//! A failed write therefore leaves the session in `PendingSave`, ready to
//! retry.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Result, TrackingError};
use crate::metrics::{elapsed_seconds, elevation_estimate_m, SessionMetrics};
use crate::path::PathAccumulator;
use crate::store::{Difficulty, RouteSource, SavedRouteRecord};
use crate::{GeoPoint, PositionSample, TrackingConfig};

// ============================================================================
// States, Events, Commands
// ============================================================================

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum SessionStatus {
    /// Tracking: samples append, the timer ticks.
    Active,
    /// The finish prompt is open. Samples still append; the timer is
    /// suspended until the prompt is dismissed or confirmed.
    PendingFinishConfirm,
    /// Tracking has stopped and metrics are frozen; waiting for the rider
    /// to save or discard.
    PendingSave,
    /// Terminal: the ride was written to the store.
    Saved,
    /// Terminal: the ride was thrown away, nothing written.
    Discarded,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Saved | SessionStatus::Discarded)
    }
}

/// An external happening the session reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A location fix arrived from the provider.
    Sample(PositionSample),
    /// The 1-second session timer fired.
    Tick { now: DateTime<Utc> },
    /// The rider tapped "finish".
    FinishRequested,
    /// The rider confirmed the finish prompt.
    FinishConfirmed,
    /// The rider dismissed the finish prompt; the ride goes on.
    FinishDismissed,
    /// The rider confirmed cancelling the route (secondary confirmation is
    /// host-side).
    RouteCancelConfirmed,
    /// Hardware back while riding; routed to the finish prompt so an
    /// in-progress session is never silently lost.
    BackPressed,
}

/// Resource instruction for the imperative shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Stop timer ticks while a prompt is open.
    SuspendTimer,
    /// Restart timer ticks after a dismissed prompt.
    ResumeTimer,
    /// Tracking is over: cancel the location watch and the timer.
    StopTracking,
}

/// What the rider submits on the save prompt.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SaveRequest {
    pub name: String,
    /// 0-5 stars; values above 5 are clamped.
    pub rating: u8,
    pub note: String,
}

/// Figures shown on the save prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SaveSummary {
    pub distance_km: f64,
    pub elapsed_seconds: u64,
    pub average_speed_kmh: f64,
}

// ============================================================================
// Tracking Session
// ============================================================================

/// One continuous tracking interval, from start of navigation to save or
/// discard.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    status: SessionStatus,
    path: PathAccumulator,
    started_at: DateTime<Utc>,
    metrics: SessionMetrics,
    reference_route: Option<Vec<GeoPoint>>,
}

impl TrackingSession {
    /// Start a session at `started_at`, seeded with the initial fix when the
    /// provider produced one.
    pub fn new(
        started_at: DateTime<Utc>,
        initial_fix: Option<PositionSample>,
        reference_route: Option<Vec<GeoPoint>>,
    ) -> Self {
        let (path, speed_kmh) = match initial_fix {
            Some(sample) => (
                PathAccumulator::with_initial(sample.point),
                sample.speed_kmh(),
            ),
            None => (PathAccumulator::new(), 0.0),
        };

        Self {
            status: SessionStatus::Active,
            path,
            started_at,
            metrics: SessionMetrics {
                elapsed_seconds: 0,
                distance_km: 0.0,
                speed_kmh,
            },
            reference_route,
        }
    }

    /// Feed one event through the state machine.
    ///
    /// Events that do not apply to the current state are ignored; stale
    /// samples after tracking stopped, a stray tick while a prompt is open
    /// and duplicate taps all fall through without effect.
    pub fn apply(&mut self, event: SessionEvent) -> Vec<SessionCommand> {
        match event {
            SessionEvent::Sample(sample) => {
                if matches!(
                    self.status,
                    SessionStatus::Active | SessionStatus::PendingFinishConfirm
                ) {
                    self.path.accept(sample.point);
                    self.metrics.distance_km = self.path.distance_km();
                    self.metrics.speed_kmh = sample.speed_kmh();
                }
                Vec::new()
            }
            SessionEvent::Tick { now } => {
                if self.status == SessionStatus::Active {
                    let elapsed = elapsed_seconds(self.started_at, now);
                    // monotonic even if the host clock steps backwards
                    self.metrics.elapsed_seconds = elapsed.max(self.metrics.elapsed_seconds);
                }
                Vec::new()
            }
            SessionEvent::FinishRequested | SessionEvent::BackPressed => {
                if self.status == SessionStatus::Active {
                    self.status = SessionStatus::PendingFinishConfirm;
                    vec![SessionCommand::SuspendTimer]
                } else {
                    Vec::new()
                }
            }
            SessionEvent::FinishConfirmed => {
                if self.status == SessionStatus::PendingFinishConfirm {
                    self.status = SessionStatus::PendingSave;
                    vec![SessionCommand::StopTracking]
                } else {
                    Vec::new()
                }
            }
            SessionEvent::FinishDismissed => {
                if self.status == SessionStatus::PendingFinishConfirm {
                    self.status = SessionStatus::Active;
                    vec![SessionCommand::ResumeTimer]
                } else {
                    Vec::new()
                }
            }
            SessionEvent::RouteCancelConfirmed => {
                if self.status == SessionStatus::Active {
                    self.status = SessionStatus::PendingSave;
                    vec![SessionCommand::StopTracking]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Validate the save request and build the record to persist.
    ///
    /// Pure: does not change the session. The shell writes the record and
    /// then calls [`confirm_saved`](Self::confirm_saved), so a failed write
    /// leaves the session in `PendingSave` for a retry.
    pub fn prepare_record(
        &self,
        request: &SaveRequest,
        now: DateTime<Utc>,
        config: &TrackingConfig,
    ) -> Result<SavedRouteRecord> {
        if self.status != SessionStatus::PendingSave {
            return Err(TrackingError::invalid_state("save", self.status));
        }

        let name = request.name.trim();
        if name.is_empty() {
            return Err(TrackingError::validation("route name must not be empty"));
        }

        let distance_km = self.metrics.distance_km;
        Ok(SavedRouteRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            distance_km,
            duration_minutes: (self.metrics.elapsed_seconds as f64 / 60.0).round() as u64,
            difficulty: Difficulty::for_distance(distance_km, config),
            elevation_estimate_m: elevation_estimate_m(distance_km, config.elevation_m_per_km),
            source_type: RouteSource::Tracked,
            rating: request.rating.min(5),
            path: self.path.points().to_vec(),
            note: request.note.clone(),
            created_at: now.date_naive(),
        })
    }

    /// The record was written; move to the terminal `Saved` state.
    pub fn confirm_saved(&mut self) -> Vec<SessionCommand> {
        if self.status == SessionStatus::PendingSave {
            self.status = SessionStatus::Saved;
        }
        Vec::new()
    }

    /// Throw the ride away without writing anything.
    pub fn discard(&mut self) -> Result<Vec<SessionCommand>> {
        if self.status != SessionStatus::PendingSave {
            return Err(TrackingError::invalid_state("discard", self.status));
        }
        self.status = SessionStatus::Discarded;
        Ok(Vec::new())
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn metrics(&self) -> SessionMetrics {
        self.metrics
    }

    pub fn path(&self) -> &PathAccumulator {
        &self.path
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn reference_route(&self) -> Option<&[GeoPoint]> {
        self.reference_route.as_deref()
    }

    /// Figures for the save prompt. The zero-elapsed case reports an average
    /// speed of 0 rather than NaN.
    pub fn save_summary(&self) -> SaveSummary {
        SaveSummary {
            distance_km: self.metrics.distance_km,
            elapsed_seconds: self.metrics.elapsed_seconds,
            average_speed_kmh: self.metrics.average_speed_kmh(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
