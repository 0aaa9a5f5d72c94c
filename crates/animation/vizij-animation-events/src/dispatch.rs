//! Event dispatch table: stable key -> action, with a per-frame FIFO queue.
//!
//! Firings are queued rather than invoked on the spot so actions observe the
//! pose the engine has committed for the frame, whatever layer or lifecycle
//! phase produced them. The host calls [`EventTable::flush`] once per frame
//! after every state callback has been processed.

use std::collections::VecDeque;
use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{ConfigError, DispatchError};
use crate::ids::EventId;

/// Side effect run when a queued event is flushed.
pub trait EventAction {
    fn invoke(&mut self);
}

impl<F: FnMut()> EventAction for F {
    fn invoke(&mut self) {
        self()
    }
}

/// Authoring record of one event: its name and the id derived from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDef {
    pub name: String,
    pub id: EventId,
}

impl EventDef {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let id = EventId::from_name(&name);
        Self { name, id }
    }
}

/// Authoring table of events (serialized with the asset; actions are bound at attach).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTableDef {
    #[serde(default)]
    pub events: Vec<EventDef>,
}

impl EventTableDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name` if missing and return its id. Adding the same name again
    /// returns the id it already has.
    pub fn ensure(&mut self, name: &str) -> Result<EventId, ConfigError> {
        if let Some(existing) = self.find_name(name) {
            return Ok(existing.id);
        }
        let def = EventDef::new(name);
        if let Some(other) = self.find(def.id) {
            return Err(ConfigError::EventIdCollision {
                id: def.id,
                existing: other.name.clone(),
                incoming: def.name,
            });
        }
        let id = def.id;
        self.events.push(def);
        Ok(id)
    }

    /// Names and ids must both be unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, ev) in self.events.iter().enumerate() {
            for earlier in &self.events[..i] {
                if earlier.name == ev.name {
                    return Err(ConfigError::DuplicateEvent {
                        id: ev.id,
                        name: ev.name.clone(),
                    });
                }
                if earlier.id == ev.id {
                    return Err(ConfigError::EventIdCollision {
                        id: ev.id,
                        existing: earlier.name.clone(),
                        incoming: ev.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn find(&self, id: EventId) -> Option<&EventDef> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn find_name(&self, name: &str) -> Option<&EventDef> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Names in alphabetical order, as offered by pickers.
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.events.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Runtime entry of the dispatch table.
pub struct EventElement {
    name: String,
    id: EventId,
    action: Option<Box<dyn EventAction>>,
}

impl EventElement {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn id(&self) -> EventId {
        self.id
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.action.is_some()
    }
}

impl fmt::Debug for EventElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventElement")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("bound", &self.action.is_some())
            .finish()
    }
}

/// Per-entity key -> action table plus the frame's pending firings.
#[derive(Debug, Default)]
pub struct EventTable {
    elements: Vec<EventElement>,
    by_id: HashMap<EventId, usize>,
    queue: VecDeque<usize>,
    debug: bool,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(cfg: &Config) -> Self {
        Self {
            queue: VecDeque::with_capacity(cfg.queue_capacity),
            debug: cfg.debug_events,
            ..Self::default()
        }
    }

    /// Build the table from authored data. Any duplicate key fails the whole table.
    pub fn from_def(def: &EventTableDef, cfg: &Config) -> Result<Self, ConfigError> {
        let mut table = Self::with_config(cfg);
        for ev in &def.events {
            table.insert(ev.name.clone(), ev.id, None)?;
        }
        Ok(table)
    }

    /// Register a new event under the id derived from `name`.
    pub fn register(
        &mut self,
        name: &str,
        action: impl EventAction + 'static,
    ) -> Result<EventId, ConfigError> {
        let id = EventId::from_name(name);
        self.insert(name.to_string(), id, Some(Box::new(action)))?;
        Ok(id)
    }

    /// Attach (or replace) the action of an authored event.
    pub fn bind(
        &mut self,
        id: EventId,
        action: impl EventAction + 'static,
    ) -> Result<(), ConfigError> {
        let idx = *self
            .by_id
            .get(&id)
            .ok_or(ConfigError::UnknownEvent { id })?;
        self.elements[idx].action = Some(Box::new(action));
        Ok(())
    }

    fn insert(
        &mut self,
        name: String,
        id: EventId,
        action: Option<Box<dyn EventAction>>,
    ) -> Result<(), ConfigError> {
        if let Some(&idx) = self.by_id.get(&id) {
            let existing = &self.elements[idx].name;
            return Err(if *existing == name {
                ConfigError::DuplicateEvent { id, name }
            } else {
                ConfigError::EventIdCollision {
                    id,
                    existing: existing.clone(),
                    incoming: name,
                }
            });
        }
        if self.elements.iter().any(|e| e.name == name) {
            return Err(ConfigError::DuplicateEvent { id, name });
        }
        self.by_id.insert(id, self.elements.len());
        self.elements.push(EventElement { name, id, action });
        Ok(())
    }

    pub fn resolve(&self, id: EventId) -> Option<&EventElement> {
        self.by_id.get(&id).map(|&idx| &self.elements[idx])
    }

    pub fn id_of(&self, name: &str) -> Option<EventId> {
        self.elements.iter().find(|e| e.name == name).map(|e| e.id)
    }

    /// Queue `id` for the next flush. Unknown keys are rejected and nothing is queued.
    pub fn enqueue(&mut self, id: EventId) -> Result<(), DispatchError> {
        let idx = *self.by_id.get(&id).ok_or(DispatchError::NotFound { id })?;
        if self.debug {
            debug!(id = %id, name = %self.elements[idx].name, "event queued");
        }
        self.queue.push_back(idx);
        Ok(())
    }

    /// Ids currently waiting for the flush, in enqueue order.
    pub fn queued(&self) -> impl Iterator<Item = EventId> + '_ {
        self.queue.iter().map(|&idx| self.elements[idx].id)
    }

    /// Run every queued action in FIFO order and clear the queue.
    /// Returns how many queued events were processed.
    pub fn flush(&mut self) -> usize {
        self.drain_queue(|_| {})
    }

    /// Same as [`flush`](Self::flush), also appending each flushed id to `out`.
    pub fn flush_into(&mut self, out: &mut Vec<EventId>) -> usize {
        self.drain_queue(|id| out.push(id))
    }

    fn drain_queue(&mut self, mut seen: impl FnMut(EventId)) -> usize {
        let mut flushed = 0;
        while let Some(idx) = self.queue.pop_front() {
            let element = &mut self.elements[idx];
            if let Some(action) = element.action.as_mut() {
                action.invoke();
            }
            seen(element.id);
            flushed += 1;
        }
        if flushed > 0 {
            debug!(flushed, "event queue flushed");
        }
        flushed
    }

    /// Authoring view of the table, ids preserved.
    pub fn to_def(&self) -> EventTableDef {
        EventTableDef {
            events: self
                .elements
                .iter()
                .map(|e| EventDef {
                    name: e.name.clone(),
                    id: e.id,
                })
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
