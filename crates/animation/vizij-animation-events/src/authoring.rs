//! Authoring assets in their serialized (JSON) form.
//!
//! Loading validates everything that would otherwise fail at attach time and
//! migrates legacy name-only event references to stable ids.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::dispatch::EventTableDef;
use crate::entity::AnimatedEntity;
use crate::error::{AuthoringError, ConfigError};
use crate::ids::{InstId, LayerId, StateId};
use crate::params::ParamRule;
use crate::timed::StateEvents;

/// Behaviours authored on one state of one layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateAsset {
    #[serde(default)]
    pub layer: LayerId,
    /// Full path of the state; hashed into its [`StateId`].
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<StateEvents>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamRule>,
}

impl StateAsset {
    #[inline]
    pub fn state_id(&self) -> StateId {
        StateId::from_name(&self.state)
    }
}

/// Everything authored for one entity: its event table and its state behaviours.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAsset {
    #[serde(default)]
    pub events: EventTableDef,
    #[serde(default)]
    pub states: Vec<StateAsset>,
}

impl EntityAsset {
    /// Migrate legacy references through this asset's event table;
    /// returns how many entries were migrated.
    pub fn resolve_legacy_ids(&mut self) -> usize {
        let table = &self.events;
        self.states
            .iter_mut()
            .filter_map(|s| s.events.as_mut())
            .map(|ev| ev.resolve_legacy_ids_with(|name| table.find_name(name).map(|d| d.id)))
            .sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.events.validate()?;
        for s in &self.states {
            if let Some(ev) = &s.events {
                ev.validate()?;
            }
            for rule in &s.params {
                rule.validate()?;
            }
        }
        Ok(())
    }

    /// Attach an entity and instantiate every authored behaviour.
    /// Returns the instances in authoring order.
    pub fn instantiate(&self, cfg: Config) -> Result<(AnimatedEntity, Vec<InstId>), ConfigError> {
        let mut entity = AnimatedEntity::attach(cfg, &self.events)?;
        let mut insts = Vec::new();
        for s in &self.states {
            let state = s.state_id();
            if let Some(ev) = &s.events {
                insts.push(entity.add_state_events(s.layer, state, Arc::new(ev.clone()))?);
            }
            for rule in &s.params {
                insts.push(entity.add_param_rule(s.layer, state, Arc::new(rule.clone()))?);
            }
        }
        Ok((entity, insts))
    }
}

pub fn parse_event_table_json(s: &str) -> Result<EventTableDef, AuthoringError> {
    let def: EventTableDef = serde_json::from_str(s)?;
    def.validate()?;
    Ok(def)
}

pub fn parse_state_events_json(s: &str) -> Result<StateEvents, AuthoringError> {
    let mut events: StateEvents = serde_json::from_str(s)?;
    events.resolve_legacy_ids();
    events.validate()?;
    Ok(events)
}

/// Accepts a single rule object or an array of rules.
pub fn parse_param_rules_json(s: &str) -> Result<Vec<ParamRule>, AuthoringError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<ParamRule>),
        One(ParamRule),
    }

    let parsed: OneOrMany = serde_json::from_str(s)?;
    let rules = match parsed {
        OneOrMany::Many(rules) => rules,
        OneOrMany::One(rule) => vec![rule],
    };
    for rule in &rules {
        rule.validate()?;
    }
    Ok(rules)
}

pub fn parse_entity_asset_json(s: &str) -> Result<EntityAsset, AuthoringError> {
    let mut asset: EntityAsset = serde_json::from_str(s)?;
    asset.resolve_legacy_ids();
    asset.validate()?;
    Ok(asset)
}

/// Serialize any authoring asset back to pretty JSON.
pub fn to_json_pretty<T: Serialize>(asset: &T) -> Result<String, AuthoringError> {
    Ok(serde_json::to_string_pretty(asset)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EventId;

    #[test]
    fn event_table_round_trips_with_ids() {
        let json = r#"{
            "events": [ { "name": "Footstep", "id": 12 }, { "name": "Land", "id": 7 } ]
        }"#;
        let def = parse_event_table_json(json).unwrap();
        assert_eq!(def.find(EventId(12)).map(|e| e.name.as_str()), Some("Footstep"));
        let back = parse_event_table_json(&to_json_pretty(&def).unwrap()).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn duplicate_names_fail_loading() {
        let json = r#"{ "events": [ { "name": "A", "id": 1 }, { "name": "A", "id": 2 } ] }"#;
        let err = parse_event_table_json(json).unwrap_err();
        assert!(matches!(
            err,
            AuthoringError::Config(ConfigError::DuplicateEvent { .. })
        ));
    }

    #[test]
    fn legacy_callbacks_are_migrated_on_load() {
        let json = r#"{
            "onStateUpdated": [ { "callback": "Breathe" } ],
            "onNormalizedTimeReached": [
                { "normalizedTime": 0.5, "callbackId": 99, "repeat": true }
            ]
        }"#;
        let events = parse_state_events_json(json).unwrap();
        assert_eq!(
            events.on_state_updated[0].callback_id,
            EventId::from_name("Breathe")
        );
        assert_eq!(events.on_normalized_time_reached[0].callback_id, EventId(99));
        assert!(events.on_normalized_time_reached[0].threshold.repeat);
    }

    #[test]
    fn legacy_callbacks_take_the_authored_table_id() {
        let json = r#"{
            "events": { "events": [ { "name": "Footstep", "id": 12 } ] },
            "states": [
                {
                    "state": "Base.Walk",
                    "events": {
                        "onStateUpdated": [ { "callback": "Footstep" }, { "callback": "Other" } ]
                    }
                }
            ]
        }"#;
        let asset = parse_entity_asset_json(json).unwrap();
        let updated = &asset.states[0].events.as_ref().unwrap().on_state_updated;
        assert_eq!(updated[0].callback_id, EventId(12));
        assert_eq!(updated[1].callback_id, EventId::from_name("Other"));
    }

    #[test]
    fn param_rules_accept_one_or_many() {
        let one = r#"{
            "when": "OnStateEnterTransitionStarts",
            "what": "Bool",
            "paramName": "A",
            "wantedBool": true
        }"#;
        assert_eq!(parse_param_rules_json(one).unwrap().len(), 1);
        let many = format!("[{one}, {one}]");
        assert_eq!(parse_param_rules_json(&many).unwrap().len(), 2);
        assert!(parse_param_rules_json("{").is_err());
    }

    #[test]
    fn entity_asset_instantiates_every_behaviour() {
        let json = r#"{
            "events": { "events": [ { "name": "Step", "id": 5 } ] },
            "states": [
                {
                    "layer": 0,
                    "state": "Base.Walk",
                    "events": { "onStateEnterTransitionStart": [ { "callbackId": 5 } ] },
                    "params": [ { "when": "WhileUpdating", "what": "Float", "paramName": "Speed",
                                  "curve": { "keys": [ { "time": 0.0, "value": 1.0 } ] } } ]
                }
            ]
        }"#;
        let asset = parse_entity_asset_json(json).unwrap();
        let (entity, insts) = asset.instantiate(Config::default()).unwrap();
        assert_eq!(insts.len(), 2);
        assert_eq!(
            entity.behaviours_on(LayerId(0), StateId::from_name("Base.Walk")),
            &insts[..]
        );
    }
}
