//! Lifecycle normalization for animation state nodes.
//!
//! Engines only expose coarse Enter/Update/Exit callbacks plus a
//! "layer is in transition" flag and a transition identity. [`Lifecycle`]
//! turns that stream into five well-ordered events per state occupancy:
//!
//! ```text
//! EnterTransitionStart -> EnterTransitionEnd -> Update*
//!     -> ExitTransitionStart -> ExitTransitionEnd
//! ```
//!
//! Transition boundaries are inferred by comparing the flag and the token
//! across consecutive frames. Self-transitions and very short states can
//! deliver the Enter of a new occupancy before the Exit of the previous one;
//! the previous occupancy is then closed out retroactively and its final
//! `ExitTransitionEnd` is emitted when that late Exit arrives.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::dispatch::EventTable;
use crate::error::DispatchError;
use crate::ids::{EventId, TransitionId};
use crate::inputs::{RawCallback, StateFrame};
use crate::params::ParamTarget;

/// Derived lifecycle phase of one state instance.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    EnterTransitioning,
    SteadyUpdating,
    ExitTransitioning,
}

/// Events produced by the normalizer, in emission order within an occupancy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEvent {
    EnterTransitionStart,
    EnterTransitionEnd,
    Update,
    ExitTransitionStart,
    ExitTransitionEnd,
}

/// Everything a node may touch while handling one lifecycle event.
///
/// The dispatch table and parameter target belong to the owning entity and
/// are handed in explicitly on every callback; nodes never look them up.
pub struct NodeContext<'a> {
    pub frame: StateFrame,
    /// Phase of the instance at the moment the hook runs.
    pub phase: Phase,
    pub events: &'a mut EventTable,
    pub params: &'a mut dyn ParamTarget,
    pub diagnostics: &'a mut Diagnostics,
}

impl<'a> NodeContext<'a> {
    pub fn new(
        frame: StateFrame,
        events: &'a mut EventTable,
        params: &'a mut dyn ParamTarget,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            frame,
            phase: Phase::Idle,
            events,
            params,
            diagnostics,
        }
    }

    /// Queue an event for the end-of-frame flush. Misses are reported and dropped.
    pub fn fire(&mut self, id: EventId) {
        if let Err(DispatchError::NotFound { id }) = self.events.enqueue(id) {
            self.diagnostics.report(Diagnostic::LookupMiss { id });
        }
    }
}

/// A state-machine node driven by normalized lifecycle events.
pub trait StateNode {
    fn enter_transition_start(&mut self, ctx: &mut NodeContext<'_>);
    fn enter_transition_end(&mut self, ctx: &mut NodeContext<'_>);
    fn update(&mut self, ctx: &mut NodeContext<'_>);
    fn exit_transition_start(&mut self, ctx: &mut NodeContext<'_>);
    fn exit_transition_end(&mut self, ctx: &mut NodeContext<'_>);
}

/// Object-safe view of a normalized node, used by the entity to store
/// heterogeneous behaviours per state.
pub trait Behaviour {
    fn raw_enter(&mut self, ctx: &mut NodeContext<'_>);
    fn raw_update(&mut self, ctx: &mut NodeContext<'_>);
    fn raw_exit(&mut self, ctx: &mut NodeContext<'_>);
    fn phase(&self) -> Phase;
}

/// Adapter turning raw engine callbacks into [`StateNode`] hooks.
///
/// One per state node instance; reused across visits of the state.
#[derive(Debug, Clone)]
pub struct Lifecycle<N> {
    node: N,
    current: Phase,
    previous: Phase,
    transition: TransitionId,
}

impl<N: StateNode> Lifecycle<N> {
    pub fn new(node: N) -> Self {
        Self {
            node,
            current: Phase::Idle,
            previous: Phase::Idle,
            transition: TransitionId::default(),
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.current
    }

    /// Phase of the previous occupancy while it is still being closed out.
    #[inline]
    pub fn previous_phase(&self) -> Phase {
        self.previous
    }

    #[inline]
    pub fn node(&self) -> &N {
        &self.node
    }

    #[inline]
    pub fn node_mut(&mut self) -> &mut N {
        &mut self.node
    }

    pub fn into_inner(self) -> N {
        self.node
    }

    /// Raw Enter. Always runs one Update pass on the same callback.
    pub fn raw_enter(&mut self, ctx: &mut NodeContext<'_>) {
        let in_transition = ctx.frame.in_transition;
        if in_transition {
            // The previous occupancy may still be open: close what the engine skipped.
            self.previous = self.current;
            self.current = Phase::Idle;

            if self.previous == Phase::EnterTransitioning {
                self.previous = Phase::SteadyUpdating;
                self.emit(LifecycleEvent::EnterTransitionEnd, ctx);
            }
            if self.previous == Phase::SteadyUpdating {
                self.previous = Phase::ExitTransitioning;
                self.emit(LifecycleEvent::ExitTransitionStart, ctx);
            }
        }

        self.current = Phase::EnterTransitioning;
        self.emit(LifecycleEvent::EnterTransitionStart, ctx);
        if !in_transition {
            self.current = Phase::SteadyUpdating;
            self.emit(LifecycleEvent::EnterTransitionEnd, ctx);
        } else {
            self.transition = ctx.frame.transition_id;
        }

        self.emit(LifecycleEvent::Update, ctx);
    }

    /// Raw Update.
    pub fn raw_update(&mut self, ctx: &mut NodeContext<'_>) {
        if self.current == Phase::Idle {
            ctx.diagnostics.report(Diagnostic::PhaseSequence {
                phase: self.current,
                previous: self.previous,
                callback: RawCallback::Update,
            });
            // The engine clearly considers the state occupied.
            self.raw_enter(ctx);
            return;
        }

        let frame = ctx.frame;
        if self.current == Phase::EnterTransitioning
            && (!frame.in_transition || frame.transition_id != self.transition)
        {
            self.emit(LifecycleEvent::EnterTransitionEnd, ctx);
            self.current = Phase::SteadyUpdating;
        }

        self.emit(LifecycleEvent::Update, ctx);

        if self.current == Phase::SteadyUpdating && frame.in_transition {
            self.current = Phase::ExitTransitioning;
            self.emit(LifecycleEvent::ExitTransitionStart, ctx);
        }
    }

    /// Raw Exit. Either finalizes a previous occupancy that was closed out
    /// retroactively, or drives the current one through every skipped phase.
    pub fn raw_exit(&mut self, ctx: &mut NodeContext<'_>) {
        if self.previous == Phase::ExitTransitioning {
            self.previous = Phase::Idle;
            self.emit(LifecycleEvent::ExitTransitionEnd, ctx);
            return;
        }

        if self.current == Phase::Idle {
            ctx.diagnostics.report(Diagnostic::PhaseSequence {
                phase: self.current,
                previous: self.previous,
                callback: RawCallback::Exit,
            });
            return;
        }

        if self.current == Phase::EnterTransitioning {
            self.current = Phase::SteadyUpdating;
            self.emit(LifecycleEvent::EnterTransitionEnd, ctx);
            self.emit(LifecycleEvent::Update, ctx);
        }
        if self.current == Phase::SteadyUpdating {
            self.current = Phase::ExitTransitioning;
            self.emit(LifecycleEvent::ExitTransitionStart, ctx);
        }

        self.current = Phase::Idle;
        self.emit(LifecycleEvent::ExitTransitionEnd, ctx);
    }

    fn emit(&mut self, event: LifecycleEvent, ctx: &mut NodeContext<'_>) {
        trace!(?event, phase = ?self.current, "lifecycle");
        ctx.phase = self.current;
        match event {
            LifecycleEvent::EnterTransitionStart => self.node.enter_transition_start(ctx),
            LifecycleEvent::EnterTransitionEnd => self.node.enter_transition_end(ctx),
            LifecycleEvent::Update => self.node.update(ctx),
            LifecycleEvent::ExitTransitionStart => self.node.exit_transition_start(ctx),
            LifecycleEvent::ExitTransitionEnd => self.node.exit_transition_end(ctx),
        }
    }
}

impl<N: StateNode> Behaviour for Lifecycle<N> {
    fn raw_enter(&mut self, ctx: &mut NodeContext<'_>) {
        Lifecycle::raw_enter(self, ctx)
    }

    fn raw_update(&mut self, ctx: &mut NodeContext<'_>) {
        Lifecycle::raw_update(self, ctx)
    }

    fn raw_exit(&mut self, ctx: &mut NodeContext<'_>) {
        Lifecycle::raw_exit(self, ctx)
    }

    fn phase(&self) -> Phase {
        self.current
    }
}
