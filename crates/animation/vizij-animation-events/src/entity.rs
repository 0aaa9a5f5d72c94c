//! Per-entity host: owns the dispatch table, the parameters, the diagnostic
//! channel and every behaviour instance, and routes raw engine callbacks.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use tracing::debug;

use crate::config::Config;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::dispatch::{EventAction, EventTable, EventTableDef};
use crate::error::{ConfigError, DispatchError};
use crate::ids::{EventId, IdAllocator, InstId, LayerId, StateId};
use crate::inputs::{FrameInputs, RawCallback, StateFrame};
use crate::lifecycle::{Behaviour, Lifecycle, NodeContext, Phase, StateNode};
use crate::outputs::FrameReport;
use crate::params::{ParamRule, Parameters, SetParamState};
use crate::timed::{AnimatorEventState, StateEvents};

struct Instance {
    id: InstId,
    layer: LayerId,
    state: StateId,
    behaviour: Box<dyn Behaviour>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("layer", &self.layer)
            .field("state", &self.state)
            .field("phase", &self.behaviour.phase())
            .finish()
    }
}

#[derive(Debug)]
pub struct AnimatedEntity {
    cfg: Config,
    ids: IdAllocator,
    events: EventTable,
    params: Parameters,
    diagnostics: Diagnostics,
    instances: Vec<Instance>,
    by_state: HashMap<(LayerId, StateId), Vec<InstId>>,

    // Per-frame output
    report: FrameReport,
}

impl AnimatedEntity {
    /// Entity with an empty dispatch table.
    pub fn new(cfg: Config) -> Self {
        Self {
            events: EventTable::with_config(&cfg),
            diagnostics: Diagnostics::new(cfg.diagnostics.clone()),
            cfg,
            ids: IdAllocator::new(),
            params: Parameters::new(),
            instances: Vec::new(),
            by_state: HashMap::new(),
            report: FrameReport::default(),
        }
    }

    /// Build the entity and its dispatch table. A malformed table fails the
    /// whole attach; nothing is partially set up.
    pub fn attach(cfg: Config, table: &EventTableDef) -> Result<Self, ConfigError> {
        let events = EventTable::from_def(table, &cfg)?;
        let mut entity = Self::new(cfg);
        entity.events = events;
        Ok(entity)
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    #[inline]
    pub fn events(&self) -> &EventTable {
        &self.events
    }

    /// Register a gameplay event under the id derived from `name`.
    pub fn register_event(
        &mut self,
        name: &str,
        action: impl EventAction + 'static,
    ) -> Result<EventId, ConfigError> {
        self.events.register(name, action)
    }

    /// Bind the action of an authored event.
    pub fn bind_event(
        &mut self,
        id: EventId,
        action: impl EventAction + 'static,
    ) -> Result<(), ConfigError> {
        self.events.bind(id, action)
    }

    /// Attach a node to a state. Behaviours on one state run in the order they were added.
    pub fn add_behaviour<N: StateNode + 'static>(
        &mut self,
        layer: LayerId,
        state: StateId,
        node: N,
    ) -> InstId {
        let id = self.ids.alloc_inst();
        self.instances.push(Instance {
            id,
            layer,
            state,
            behaviour: Box::new(Lifecycle::new(node)),
        });
        self.by_state.entry((layer, state)).or_default().push(id);
        id
    }

    /// Attach authored timed events to a state.
    pub fn add_state_events(
        &mut self,
        layer: LayerId,
        state: StateId,
        defs: Arc<StateEvents>,
    ) -> Result<InstId, ConfigError> {
        defs.validate()?;
        Ok(self.add_behaviour(layer, state, AnimatorEventState::new(defs)))
    }

    /// Attach an authored parameter rule to a state.
    pub fn add_param_rule(
        &mut self,
        layer: LayerId,
        state: StateId,
        rule: Arc<ParamRule>,
    ) -> Result<InstId, ConfigError> {
        let node = SetParamState::try_new(rule)?;
        Ok(self.add_behaviour(layer, state, node))
    }

    /// Instances attached to `(layer, state)`, in run order.
    pub fn behaviours_on(&self, layer: LayerId, state: StateId) -> &[InstId] {
        self.by_state
            .get(&(layer, state))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn phase(&self, inst: InstId) -> Option<Phase> {
        self.instance(inst).map(|i| i.behaviour.phase())
    }

    fn instance(&self, inst: InstId) -> Option<&Instance> {
        self.instances
            .get(inst.0 as usize)
            .filter(|i| i.id == inst)
    }

    #[inline]
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    #[inline]
    pub fn params_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    /// Raw Enter from the engine.
    pub fn state_enter(&mut self, layer: LayerId, state: StateId, frame: StateFrame) {
        self.route(layer, state, RawCallback::Enter, frame);
    }

    /// Raw Update from the engine.
    pub fn state_update(&mut self, layer: LayerId, state: StateId, frame: StateFrame) {
        self.route(layer, state, RawCallback::Update, frame);
    }

    /// Raw Exit from the engine.
    pub fn state_exit(&mut self, layer: LayerId, state: StateId, frame: StateFrame) {
        self.route(layer, state, RawCallback::Exit, frame);
    }

    fn route(&mut self, layer: LayerId, state: StateId, kind: RawCallback, frame: StateFrame) {
        let Some(insts) = self.by_state.get(&(layer, state)) else {
            self.diagnostics.report(Diagnostic::UnknownState {
                layer: layer.0,
                state: state.0,
            });
            return;
        };
        for iid in insts {
            let Some(inst) = self.instances.get_mut(iid.0 as usize) else {
                continue;
            };
            let mut ctx = NodeContext::new(
                frame,
                &mut self.events,
                &mut self.params,
                &mut self.diagnostics,
            );
            match kind {
                RawCallback::Enter => inst.behaviour.raw_enter(&mut ctx),
                RawCallback::Update => inst.behaviour.raw_update(&mut ctx),
                RawCallback::Exit => inst.behaviour.raw_exit(&mut ctx),
            }
        }
    }

    /// Gameplay-side firing; queued like any state event.
    pub fn invoke(&mut self, id: EventId) -> Result<(), DispatchError> {
        let res = self.events.enqueue(id);
        if let Err(DispatchError::NotFound { id }) = res {
            self.diagnostics.report(Diagnostic::LookupMiss { id });
        }
        res
    }

    /// Fire by name. The table's id for `name` wins over its hash.
    pub fn invoke_name(&mut self, name: &str) -> Result<(), DispatchError> {
        let id = self
            .events
            .id_of(name)
            .unwrap_or_else(|| EventId::from_name(name));
        self.invoke(id)
    }

    /// Apply a frame's callbacks in engine order, then close the frame.
    pub fn update(&mut self, inputs: FrameInputs) -> &FrameReport {
        for cb in inputs.callbacks {
            self.route(cb.layer, cb.state, cb.kind, cb.frame);
        }
        self.end_frame()
    }

    /// Flush the dispatch queue (FIFO) and drain the frame's diagnostics.
    /// Call exactly once per frame, after every state callback.
    pub fn end_frame(&mut self) -> &FrameReport {
        self.report.clear();
        self.events.flush_into(&mut self.report.flushed);
        let (diagnostics, dropped) = self.diagnostics.drain();
        self.report.diagnostics = diagnostics;
        self.report.diagnostics_dropped = dropped;
        if !self.report.diagnostics.is_empty() {
            debug!(
                count = self.report.diagnostics.len(),
                dropped, "frame closed with diagnostics"
            );
        }
        &self.report
    }

    /// Report of the last closed frame.
    #[inline]
    pub fn last_report(&self) -> &FrameReport {
        &self.report
    }
}
