//! Output contracts from the per-entity host.
//!
//! Actions run during the flush itself; the report only tells adapters what
//! was flushed and what went wrong this frame.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::ids::EventId;

/// Returned by `AnimatedEntity::end_frame()` / `AnimatedEntity::update()`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FrameReport {
    /// Ids flushed this frame, in invocation order.
    #[serde(default)]
    pub flushed: Vec<EventId>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    /// Diagnostics over the per-frame cap (logged, not retained).
    #[serde(default)]
    pub diagnostics_dropped: usize,
}

impl FrameReport {
    #[inline]
    pub fn clear(&mut self) {
        self.flushed.clear();
        self.diagnostics.clear();
        self.diagnostics_dropped = 0;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flushed.is_empty() && self.diagnostics.is_empty() && self.diagnostics_dropped == 0
    }
}
