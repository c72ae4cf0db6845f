//! Error types for the tracking session engine.

use thiserror::Error;

use crate::state_machine::Phase;

#[derive(Debug, Error, PartialEq)]
pub enum TrackerError {
    /// Fix coordinates out of range or non-finite. The fix is dropped and
    /// the tracking state is left untouched.
    #[error("invalid fix dropped: latitude {latitude}, longitude {longitude}")]
    InvalidFix { latitude: f64, longitude: f64 },

    /// A transition was requested from a phase that does not permit it.
    #[error("cannot {action} while {phase}")]
    InvalidTransition { phase: Phase, action: &'static str },

    /// Save requested with fewer than two route points.
    #[error("cannot save a session with {points} route point(s), need at least 2")]
    InsufficientData { points: usize },

    /// Session store read/write failure. The in-memory session survives so
    /// the caller can retry.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// The position stream is unavailable; the engine stays idle.
    #[error("location permission denied")]
    PermissionDenied,
}
