//! Error types for attach-time configuration and event dispatch.
//!
//! Only setup paths return these. Raw engine callbacks never fail; their
//! problems go through [`crate::diagnostics::Diagnostics`].

use serde::{Deserialize, Serialize};

use crate::ids::EventId;

/// Malformed authoring data detected while building an entity's tables.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ConfigError {
    /// The same event was registered twice in one table.
    #[error("Duplicate event '{name}' (id {id})")]
    DuplicateEvent { id: EventId, name: String },

    /// Two different names hash (or were assigned) to the same id.
    #[error("Event id {id} collides: '{existing}' and '{incoming}'")]
    EventIdCollision {
        id: EventId,
        existing: String,
        incoming: String,
    },

    /// An action was bound to a key the authored table does not contain.
    #[error("Unknown event id {id}")]
    UnknownEvent { id: EventId },

    /// Curve sampling was requested on a curve with no keyframes.
    #[error("Curve driving parameter '{param}' has no keyframes")]
    EmptyCurve { param: String },

    /// Keyframe times must be non-decreasing.
    #[error("Curve driving parameter '{param}' has unsorted keyframes")]
    UnsortedCurve { param: String },

    /// Normalized-time thresholds are authored in [0, 1].
    #[error("Normalized time threshold {threshold} is outside [0, 1]")]
    ThresholdOutOfRange { threshold: f32 },
}

/// Runtime lookup failure. The event is dropped; the frame goes on.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("Event id {id} not found")]
    NotFound { id: EventId },
}

/// Failure while loading authoring assets from their serialized form.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum AuthoringError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ConfigError {
    /// Get error category for logging/metrics
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::DuplicateEvent { .. }
            | Self::EventIdCollision { .. }
            | Self::UnknownEvent { .. } => "events",
            Self::EmptyCurve { .. } | Self::UnsortedCurve { .. } => "curve",
            Self::ThresholdOutOfRange { .. } => "validation",
        }
    }
}
