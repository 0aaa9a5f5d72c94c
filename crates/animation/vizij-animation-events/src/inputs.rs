//! Input contracts from the animation engine.
//!
//! The engine reports, per active state and layer, its raw Enter/Update/Exit
//! callbacks together with a small frame snapshot. Adapters either call the
//! `AnimatedEntity::state_*` methods directly or batch the callbacks into
//! [`FrameInputs`] for `AnimatedEntity::update()`.

use serde::{Deserialize, Serialize};

use crate::ids::{LayerId, StateId, TransitionId};

/// What the engine knows about a state when it calls back.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateFrame {
    /// Playback position; the integer part counts completed loops.
    pub normalized_time: f32,
    /// The layer is blending through a transition right now.
    pub in_transition: bool,
    /// Identity of that transition (meaningless when `in_transition` is false).
    #[serde(default)]
    pub transition_id: TransitionId,
}

impl StateFrame {
    /// Frame fully inside a state.
    pub fn steady(normalized_time: f32) -> Self {
        Self {
            normalized_time,
            in_transition: false,
            transition_id: TransitionId::default(),
        }
    }

    /// Frame inside the transition identified by `transition`.
    pub fn transitioning(normalized_time: f32, transition: TransitionId) -> Self {
        Self {
            normalized_time,
            in_transition: true,
            transition_id: transition,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawCallback {
    Enter,
    Update,
    Exit,
}

/// One raw callback delivered by the engine.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateCallback {
    pub layer: LayerId,
    pub state: StateId,
    pub kind: RawCallback,
    pub frame: StateFrame,
}

/// All callbacks of one frame in engine order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FrameInputs {
    #[serde(default)]
    pub callbacks: Vec<StateCallback>,
}

impl FrameInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(mut self, layer: LayerId, state: StateId, frame: StateFrame) -> Self {
        self.push(layer, state, RawCallback::Enter, frame);
        self
    }

    pub fn update(mut self, layer: LayerId, state: StateId, frame: StateFrame) -> Self {
        self.push(layer, state, RawCallback::Update, frame);
        self
    }

    pub fn exit(mut self, layer: LayerId, state: StateId, frame: StateFrame) -> Self {
        self.push(layer, state, RawCallback::Exit, frame);
        self
    }

    #[inline]
    pub fn push(&mut self, layer: LayerId, state: StateId, kind: RawCallback, frame: StateFrame) {
        self.callbacks.push(StateCallback {
            layer,
            state,
            kind,
            frame,
        });
    }
}
