//! Normalized-time triggers shared by timed events and parameter rules.
//!
//! A [`Threshold`] is authored data. The matching [`NextThreshold`] is the
//! per-occupancy counter and always lives with the state instance, never in
//! the shared definition.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lifecycle::Phase;

/// When a normalized-time trigger fires and how it behaves across loops.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threshold {
    /// Threshold within one loop, in [0, 1].
    #[serde(default)]
    pub normalized_time: f32,
    /// Fire once per loop instead of once per occupancy.
    #[serde(default)]
    pub repeat: bool,
    /// Fire on ExitTransitionEnd if the threshold was never reached.
    #[serde(default, alias = "executeOnExitEnds")]
    pub at_least_once: bool,
    /// Never fire while the exit transition is running.
    #[serde(default)]
    pub never_while_exit: bool,
}

impl Threshold {
    pub fn at(normalized_time: f32) -> Self {
        Self {
            normalized_time,
            ..Self::default()
        }
    }

    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn at_least_once(mut self) -> Self {
        self.at_least_once = true;
        self
    }

    pub fn never_while_exit(mut self) -> Self {
        self.never_while_exit = true;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.normalized_time;
        if !t.is_finite() || !(0.0..=1.0).contains(&t) {
            return Err(ConfigError::ThresholdOutOfRange { threshold: t });
        }
        Ok(())
    }
}

/// Per-instance progress of one [`Threshold`] during an occupancy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NextThreshold {
    /// Next firing targets `normalized_time + offset`.
    Pending(u32),
    /// Fired and not repeating; done until the occupancy ends.
    Spent,
}

impl Default for NextThreshold {
    fn default() -> Self {
        NextThreshold::Pending(0)
    }
}

impl NextThreshold {
    /// Check the trigger for this tick. Fires at most once per call, so a
    /// large jump in normalized time advances a repeating trigger by one loop.
    pub fn poll(&mut self, threshold: &Threshold, normalized_time: f32, phase: Phase) -> bool {
        if threshold.never_while_exit && phase == Phase::ExitTransitioning {
            return false;
        }
        let NextThreshold::Pending(offset) = *self else {
            return false;
        };
        if normalized_time >= threshold.normalized_time + offset as f32 {
            *self = if threshold.repeat {
                NextThreshold::Pending(offset.saturating_add(1))
            } else {
                NextThreshold::Spent
            };
            true
        } else {
            false
        }
    }

    /// Nothing fired yet in this occupancy.
    #[inline]
    pub fn untouched(&self) -> bool {
        *self == NextThreshold::Pending(0)
    }

    /// Close the occupancy. Returns whether an at-least-once firing is owed,
    /// then rewinds so the next visit starts the schedule over.
    pub fn finish(&mut self, threshold: &Threshold) -> bool {
        let owed = threshold.at_least_once && self.untouched();
        *self = NextThreshold::Pending(0);
        owed
    }
}
