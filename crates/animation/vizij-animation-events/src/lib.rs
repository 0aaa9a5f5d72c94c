//! Vizij Animation Events (engine-agnostic)
//!
//! State-machine behaviours for animation graphs. Coarse engine callbacks
//! (Enter/Update/Exit plus a transition flag and token) are normalized into
//! five lifecycle events per state occupancy; on top of that this crate
//! provides timed event scheduling, a per-entity event dispatch table with an
//! end-of-frame FIFO flush, and a declarative parameter driver.
//!
//! Adapters own the engine side: they feed raw callbacks into an
//! [`AnimatedEntity`] and call [`AnimatedEntity::end_frame`] once the frame's
//! pose is committed.

pub mod authoring;
pub mod config;
pub mod curve;
pub mod diagnostics;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod ids;
pub mod inputs;
pub mod lifecycle;
pub mod outputs;
pub mod params;
pub mod threshold;
pub mod timed;

// Re-exports for consumers (adapters)
pub use authoring::{
    parse_entity_asset_json, parse_event_table_json, parse_param_rules_json,
    parse_state_events_json, EntityAsset, StateAsset,
};
pub use config::{Config, DiagnosticsCfg};
pub use curve::{Curve, Keyframe};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use dispatch::{EventAction, EventDef, EventElement, EventTable, EventTableDef};
pub use entity::AnimatedEntity;
pub use error::{AuthoringError, ConfigError, DispatchError};
pub use ids::{stable_hash, EventId, InstId, LayerId, StateId, TransitionId};
pub use inputs::{FrameInputs, RawCallback, StateCallback, StateFrame};
pub use lifecycle::{Behaviour, Lifecycle, LifecycleEvent, NodeContext, Phase, StateNode};
pub use outputs::FrameReport;
pub use params::{ParamKind, ParamRule, ParamTarget, ParamValue, Parameters, SetParamState, When};
pub use threshold::{NextThreshold, Threshold};
pub use timed::{AnimatorEventState, EventHook, StateEvents, TimedEvent, TimedEventScheduler};
