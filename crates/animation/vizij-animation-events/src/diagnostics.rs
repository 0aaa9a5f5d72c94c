//! Non-throwing diagnostic channel.
//!
//! Everything that goes wrong inside an engine callback ends up here: it is
//! logged through `tracing` and retained until the frame report drains it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::DiagnosticsCfg;
use crate::ids::EventId;
use crate::inputs::RawCallback;
use crate::lifecycle::Phase;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Diagnostic {
    /// A fired key had no entry in the dispatch table; the event was dropped.
    LookupMiss { id: EventId },
    /// A raw callback arrived in a phase where it cannot happen.
    PhaseSequence {
        phase: Phase,
        previous: Phase,
        callback: RawCallback,
    },
    /// A raw callback targeted a state with no behaviours attached.
    UnknownState { layer: u32, state: u32 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::LookupMiss { id } => write!(f, "event id [{id}] not found"),
            Diagnostic::PhaseSequence {
                phase,
                previous,
                callback,
            } => write!(
                f,
                "raw {callback:?} received in phase {phase:?} (previous {previous:?})"
            ),
            Diagnostic::UnknownState { layer, state } => {
                write!(f, "no behaviours on layer {layer} state {state:#x}")
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    cfg: DiagnosticsCfg,
    entries: Vec<Diagnostic>,
    dropped: usize,
}

impl Diagnostics {
    pub fn new(cfg: DiagnosticsCfg) -> Self {
        Self {
            cfg,
            entries: Vec::new(),
            dropped: 0,
        }
    }

    /// Log and retain one diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        warn!(target: "vizij_animation_events", "{diagnostic}");
        if !self.cfg.enabled {
            return;
        }
        if self.entries.len() >= self.cfg.max_per_frame {
            self.dropped += 1;
        } else {
            self.entries.push(diagnostic);
        }
    }

    #[inline]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.dropped == 0
    }

    /// Hand over everything retained since the last drain, plus the overflow count.
    pub fn drain(&mut self) -> (Vec<Diagnostic>, usize) {
        let dropped = std::mem::take(&mut self.dropped);
        (std::mem::take(&mut self.entries), dropped)
    }
}
