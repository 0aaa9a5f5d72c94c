//! Core configuration for vizij-animation-events.

use serde::{Deserialize, Serialize};

/// Per-entity configuration, fixed at attach time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial capacity of the per-frame dispatch queue.
    pub queue_capacity: usize,

    /// Trace every enqueued event id at debug level.
    pub debug_events: bool,

    pub diagnostics: DiagnosticsCfg,
}

/// Diagnostic channel settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsCfg {
    /// When false diagnostics are still logged but not retained for the frame report.
    pub enabled: bool,
    /// Retained diagnostics per frame; the rest are only counted.
    pub max_per_frame: usize,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        DiagnosticsCfg {
            enabled: true,
            max_per_frame: 256,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            debug_events: false,
            diagnostics: DiagnosticsCfg::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "debug_events": true }"#).unwrap();
        assert!(cfg.debug_events);
        assert_eq!(cfg.queue_capacity, 64);
        assert_eq!(cfg.diagnostics, DiagnosticsCfg::default());
    }
}
