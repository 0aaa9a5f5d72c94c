//! Timed Event Scheduler.
//!
//! [`StateEvents`] is the authored, immutable list of events attached to one
//! state: four lifecycle-boundary arrays, a per-frame array and a
//! normalized-time array. It is shared (`Arc`) between every instance of the
//! state; the per-occupancy counters live in [`TimedEventScheduler`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::ids::EventId;
use crate::lifecycle::{NodeContext, Phase, StateNode};
use crate::threshold::{NextThreshold, Threshold};

/// One authored event. Boundary and per-frame arrays ignore the threshold.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedEvent {
    #[serde(flatten)]
    pub threshold: Threshold,
    #[serde(default)]
    pub callback_id: EventId,
    /// Name-only key from older assets; see [`StateEvents::resolve_legacy_ids`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

impl TimedEvent {
    pub fn new(callback_id: EventId) -> Self {
        Self {
            callback_id,
            ..Self::default()
        }
    }

    pub fn at(callback_id: EventId, threshold: Threshold) -> Self {
        Self {
            threshold,
            callback_id,
            callback: None,
        }
    }

    /// Legacy entry keyed only by name.
    pub fn legacy(name: impl Into<String>, threshold: Threshold) -> Self {
        Self {
            threshold,
            callback_id: EventId::UNSET,
            callback: Some(name.into()),
        }
    }
}

/// Which authored array an event belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventHook {
    EnterTransitionStart,
    EnterTransitionEnd,
    Update,
    NormalizedTime,
    ExitTransitionStart,
    ExitTransitionEnd,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateEvents {
    pub on_state_enter_transition_start: Vec<TimedEvent>,
    pub on_state_enter_transition_end: Vec<TimedEvent>,
    pub on_state_exit_transition_start: Vec<TimedEvent>,
    pub on_state_exit_transition_end: Vec<TimedEvent>,
    pub on_state_updated: Vec<TimedEvent>,
    pub on_normalized_time_reached: Vec<TimedEvent>,
}

impl StateEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(&self, hook: EventHook) -> &[TimedEvent] {
        match hook {
            EventHook::EnterTransitionStart => &self.on_state_enter_transition_start,
            EventHook::EnterTransitionEnd => &self.on_state_enter_transition_end,
            EventHook::Update => &self.on_state_updated,
            EventHook::NormalizedTime => &self.on_normalized_time_reached,
            EventHook::ExitTransitionStart => &self.on_state_exit_transition_start,
            EventHook::ExitTransitionEnd => &self.on_state_exit_transition_end,
        }
    }

    fn hook_mut(&mut self, hook: EventHook) -> &mut Vec<TimedEvent> {
        match hook {
            EventHook::EnterTransitionStart => &mut self.on_state_enter_transition_start,
            EventHook::EnterTransitionEnd => &mut self.on_state_enter_transition_end,
            EventHook::Update => &mut self.on_state_updated,
            EventHook::NormalizedTime => &mut self.on_normalized_time_reached,
            EventHook::ExitTransitionStart => &mut self.on_state_exit_transition_start,
            EventHook::ExitTransitionEnd => &mut self.on_state_exit_transition_end,
        }
    }

    /// Append `event` to the array of `hook`. Authoring order is firing order.
    pub fn register(&mut self, hook: EventHook, event: TimedEvent) -> &mut Self {
        self.hook_mut(hook).push(event);
        self
    }

    fn all_mut(&mut self) -> impl Iterator<Item = &mut TimedEvent> + '_ {
        self.on_state_enter_transition_start
            .iter_mut()
            .chain(self.on_state_enter_transition_end.iter_mut())
            .chain(self.on_state_updated.iter_mut())
            .chain(self.on_normalized_time_reached.iter_mut())
            .chain(self.on_state_exit_transition_start.iter_mut())
            .chain(self.on_state_exit_transition_end.iter_mut())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for ev in &self.on_normalized_time_reached {
            ev.threshold.validate()?;
        }
        Ok(())
    }

    /// Give every name-only entry the id derived from its name.
    /// Returns how many entries were migrated.
    pub fn resolve_legacy_ids(&mut self) -> usize {
        self.resolve_legacy_ids_with(|_| None)
    }

    /// Like [`resolve_legacy_ids`](Self::resolve_legacy_ids), but names the
    /// authored table knows take its id; only unknown names are hashed.
    pub fn resolve_legacy_ids_with(&mut self, lookup: impl Fn(&str) -> Option<EventId>) -> usize {
        let mut migrated = 0;
        for ev in self.all_mut() {
            if !ev.callback_id.is_unset() {
                continue;
            }
            let Some(name) = ev.callback.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };
            ev.callback_id = lookup(name).unwrap_or_else(|| EventId::from_name(name));
            warn!(
                callback = name,
                id = %ev.callback_id,
                "timed event referenced by name only; re-save the asset to store its id"
            );
            migrated += 1;
        }
        migrated
    }
}

/// Per-instance scheduler over shared [`StateEvents`].
#[derive(Clone, Debug)]
pub struct TimedEventScheduler {
    defs: Arc<StateEvents>,
    next: Vec<NextThreshold>,
}

impl TimedEventScheduler {
    pub fn new(defs: Arc<StateEvents>) -> Self {
        let next = vec![NextThreshold::default(); defs.on_normalized_time_reached.len()];
        Self { defs, next }
    }

    #[inline]
    pub fn definitions(&self) -> &StateEvents {
        &self.defs
    }

    /// Add an event to this instance. Definitions shared with other
    /// instances are copied first, never mutated in place.
    pub fn register(&mut self, hook: EventHook, event: TimedEvent) {
        Arc::make_mut(&mut self.defs).register(hook, event);
        self.next
            .resize(self.defs.on_normalized_time_reached.len(), NextThreshold::default());
    }

    /// Counters of the normalized-time array, index-aligned with it.
    #[inline]
    pub fn progress(&self) -> &[NextThreshold] {
        &self.next
    }

    /// Ids of a lifecycle-boundary array, in authoring order.
    pub fn boundary(&self, hook: EventHook) -> impl Iterator<Item = EventId> + '_ {
        self.defs.hook(hook).iter().map(|ev| ev.callback_id)
    }

    /// One Update tick: the per-frame set, then every normalized-time event
    /// whose threshold has been reached.
    pub fn advance(&mut self, normalized_time: f32, phase: Phase) -> Vec<EventId> {
        let mut out = Vec::new();
        self.advance_into(normalized_time, phase, &mut out);
        out
    }

    /// Like [`advance`](Self::advance) but appends into a caller buffer.
    pub fn advance_into(&mut self, normalized_time: f32, phase: Phase, out: &mut Vec<EventId>) {
        out.extend(self.defs.on_state_updated.iter().map(|ev| ev.callback_id));
        for (ev, next) in self
            .defs
            .on_normalized_time_reached
            .iter()
            .zip(self.next.iter_mut())
        {
            if next.poll(&ev.threshold, normalized_time, phase) {
                out.push(ev.callback_id);
            }
        }
    }

    /// Close the occupancy: at-least-once events that never fired are
    /// returned (authoring order) and every counter rewinds.
    pub fn finish_occupancy(&mut self) -> Vec<EventId> {
        let mut owed = Vec::new();
        for (ev, next) in self
            .defs
            .on_normalized_time_reached
            .iter()
            .zip(self.next.iter_mut())
        {
            if next.finish(&ev.threshold) {
                owed.push(ev.callback_id);
            }
        }
        owed
    }
}

/// State behaviour that fires authored events through the entity's dispatch table.
#[derive(Clone, Debug)]
pub struct AnimatorEventState {
    scheduler: TimedEventScheduler,
    scratch: Vec<EventId>,
}

impl AnimatorEventState {
    pub fn new(defs: Arc<StateEvents>) -> Self {
        Self {
            scheduler: TimedEventScheduler::new(defs),
            scratch: Vec::new(),
        }
    }

    #[inline]
    pub fn scheduler(&self) -> &TimedEventScheduler {
        &self.scheduler
    }

    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut TimedEventScheduler {
        &mut self.scheduler
    }

    fn fire_boundary(&self, hook: EventHook, ctx: &mut NodeContext<'_>) {
        for id in self.scheduler.boundary(hook) {
            ctx.fire(id);
        }
    }
}

impl StateNode for AnimatorEventState {
    fn enter_transition_start(&mut self, ctx: &mut NodeContext<'_>) {
        self.fire_boundary(EventHook::EnterTransitionStart, ctx);
    }

    fn enter_transition_end(&mut self, ctx: &mut NodeContext<'_>) {
        self.fire_boundary(EventHook::EnterTransitionEnd, ctx);
    }

    fn update(&mut self, ctx: &mut NodeContext<'_>) {
        self.scratch.clear();
        self.scheduler
            .advance_into(ctx.frame.normalized_time, ctx.phase, &mut self.scratch);
        for id in &self.scratch {
            ctx.fire(*id);
        }
    }

    fn exit_transition_start(&mut self, ctx: &mut NodeContext<'_>) {
        self.fire_boundary(EventHook::ExitTransitionStart, ctx);
    }

    fn exit_transition_end(&mut self, ctx: &mut NodeContext<'_>) {
        self.fire_boundary(EventHook::ExitTransitionEnd, ctx);
        for id in self.scheduler.finish_occupancy() {
            ctx.fire(id);
        }
    }
}
