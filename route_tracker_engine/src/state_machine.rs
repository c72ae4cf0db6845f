//! The tracking lifecycle state machine.
//!
//! Owns the route buffer, the incremental distance total and the elapsed
//! timer. All transitions are synchronous and never block; the serialized
//! async facade in [`crate::tracker`] drives them.

use std::fmt;

use route_tracker_lib::{distance::haversine_m, geo_fix::GeoFix, session::Session};

use crate::error::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Tracking,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Tracking => write!(f, "tracking"),
            Phase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Result of applying one fix while tracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    Appended { delta_m: f64 },
    /// Timestamp was not newer than the previous fix. The fix is appended
    /// anyway; distance accuracy may be skewed.
    OutOfOrder { delta_m: f64 },
}

#[derive(Debug)]
pub struct TrackingState {
    phase: Phase,
    route: Vec<GeoFix>,
    total_distance_m: f64,
    started_at_ms: Option<i64>,
    elapsed_ms: i64,
    last_tick_ms: Option<i64>,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            route: Vec::new(),
            total_distance_m: 0.0,
            started_at_ms: None,
            elapsed_ms: 0,
            last_tick_ms: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn route(&self) -> &[GeoFix] {
        &self.route
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    /// Wall-clock start of the current attempt; `None` while idle.
    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    /// Whole elapsed seconds, for display. The millisecond accumulator is
    /// kept internally so a saved session can carry one decimal.
    pub fn elapsed_sec(&self) -> u64 {
        (self.elapsed_ms / 1000).max(0) as u64
    }

    pub fn can_save(&self) -> bool {
        self.route.len() >= 2
    }

    /// Begins a new tracking attempt. Valid from idle or stopped; clears
    /// any retained route, distance and timer.
    pub fn start(&mut self, now_ms: i64) -> Result<(), TrackerError> {
        match self.phase {
            Phase::Idle | Phase::Stopped => {
                self.route.clear();
                self.total_distance_m = 0.0;
                self.elapsed_ms = 0;
                self.started_at_ms = Some(now_ms);
                self.last_tick_ms = Some(now_ms);
                self.phase = Phase::Tracking;
                Ok(())
            }
            phase => Err(TrackerError::InvalidTransition {
                phase,
                action: "start",
            }),
        }
    }

    /// Applies one incoming fix, in arrival order. Must be called exactly
    /// once per fix; the first fix only seeds the route, every later one
    /// adds the great-circle delta to the running total.
    pub fn apply_fix(&mut self, fix: GeoFix) -> Result<FixOutcome, TrackerError> {
        if self.phase != Phase::Tracking {
            return Err(TrackerError::InvalidTransition {
                phase: self.phase,
                action: "apply a fix",
            });
        }

        if !fix.has_valid_coordinates() {
            return Err(TrackerError::InvalidFix {
                latitude: fix.latitude,
                longitude: fix.longitude,
            });
        }

        let (delta_m, out_of_order) = match self.route.last() {
            Some(last) => (
                haversine_m(last.position(), fix.position()),
                fix.timestamp_ms <= last.timestamp_ms,
            ),
            None => (0.0, false),
        };

        self.route.push(fix);
        self.total_distance_m += delta_m;

        if out_of_order {
            Ok(FixOutcome::OutOfOrder { delta_m })
        } else {
            Ok(FixOutcome::Appended { delta_m })
        }
    }

    /// Advances the elapsed timer by the wall-clock delta since the last
    /// tick. Derived from timestamps, not call counts, so a delayed tick
    /// catches up instead of drifting.
    pub fn tick(&mut self, now_ms: i64) -> Result<(), TrackerError> {
        if self.phase != Phase::Tracking {
            return Err(TrackerError::InvalidTransition {
                phase: self.phase,
                action: "tick",
            });
        }

        if let Some(last) = self.last_tick_ms {
            // A host clock stepping backwards must not rewind the timer.
            self.elapsed_ms += (now_ms - last).max(0);
        }
        self.last_tick_ms = Some(now_ms);
        Ok(())
    }

    /// Freezes the route, distance and timer.
    pub fn stop(&mut self) -> Result<(), TrackerError> {
        if self.phase != Phase::Tracking {
            return Err(TrackerError::InvalidTransition {
                phase: self.phase,
                action: "stop",
            });
        }
        self.phase = Phase::Stopped;
        Ok(())
    }

    /// Produces the immutable session record for persistence. Pure: does
    /// not reset, so a failed persist keeps everything for a retry.
    pub fn finalize_session(&self, session_id: i64) -> Result<Session, TrackerError> {
        if self.phase != Phase::Stopped {
            return Err(TrackerError::InvalidTransition {
                phase: self.phase,
                action: "save",
            });
        }
        if self.route.len() < 2 {
            return Err(TrackerError::InsufficientData {
                points: self.route.len(),
            });
        }
        Ok(Session::from_route(
            session_id,
            &self.route,
            self.total_distance_m,
            self.elapsed_ms,
        ))
    }

    /// Throws the current attempt away without persisting.
    pub fn discard(&mut self) -> Result<(), TrackerError> {
        match self.phase {
            Phase::Tracking | Phase::Stopped => {
                self.reset_to_idle();
                Ok(())
            }
            phase => Err(TrackerError::InvalidTransition {
                phase,
                action: "discard",
            }),
        }
    }

    pub(crate) fn reset_to_idle(&mut self) {
        self.route.clear();
        self.total_distance_m = 0.0;
        self.started_at_ms = None;
        self.elapsed_ms = 0;
        self.last_tick_ms = None;
        self.phase = Phase::Idle;
    }
}
