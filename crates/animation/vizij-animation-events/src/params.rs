//! Parameter Driver.
//!
//! A [`ParamRule`] writes one animator parameter either on a lifecycle
//! boundary (literal value), when a normalized-time threshold is reached
//! (literal value, same bookkeeping as timed events) or on every Update tick
//! (value sampled from a curve and coerced to the parameter's kind).

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::curve::Curve;
use crate::error::ConfigError;
use crate::lifecycle::{NodeContext, StateNode};
use crate::threshold::{NextThreshold, Threshold};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    #[default]
    Bool,
    Int,
    Float,
    Trigger,
}

/// Value written to (or stored for) a parameter. `Trigger(true)` is a set
/// trigger waiting to be consumed.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Trigger(bool),
}

impl ParamValue {
    #[inline]
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Trigger(_) => ParamKind::Trigger,
        }
    }

    /// Coerce a sampled curve value into `kind`.
    pub fn coerce(kind: ParamKind, sample: f32) -> Self {
        match kind {
            ParamKind::Bool => ParamValue::Bool(sample > 0.0),
            ParamKind::Int => ParamValue::Int(sample.round_ties_even() as i32),
            ParamKind::Float => ParamValue::Float(sample),
            ParamKind::Trigger => ParamValue::Trigger(sample > 0.0),
        }
    }
}

/// Write primitives the driver needs from whatever owns the parameters.
pub trait ParamTarget {
    fn set_bool(&mut self, name: &str, value: bool);
    fn set_int(&mut self, name: &str, value: i32);
    fn set_float(&mut self, name: &str, value: f32);
    fn set_trigger(&mut self, name: &str);
    fn reset_trigger(&mut self, name: &str);

    fn write(&mut self, name: &str, value: ParamValue) {
        match value {
            ParamValue::Bool(v) => self.set_bool(name, v),
            ParamValue::Int(v) => self.set_int(name, v),
            ParamValue::Float(v) => self.set_float(name, v),
            ParamValue::Trigger(true) => self.set_trigger(name),
            ParamValue::Trigger(false) => self.reset_trigger(name),
        }
    }
}

/// Named parameters with declared kinds.
///
/// Writes to an undeclared name, or with a value of another kind, are logged
/// and ignored.
#[derive(Clone, Debug, Default)]
pub struct Parameters {
    values: HashMap<String, ParamValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` with its initial value (which fixes its kind).
    pub fn declare(&mut self, name: impl Into<String>, initial: ParamValue) -> &mut Self {
        self.values.insert(name.into(), initial);
        self
    }

    pub fn kind(&self, name: &str) -> Option<ParamKind> {
        self.values.get(name).map(ParamValue::kind)
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).copied()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ParamValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            ParamValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            ParamValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_trigger_set(&self, name: &str) -> bool {
        matches!(self.get(name), Some(ParamValue::Trigger(true)))
    }

    /// Read and clear a trigger. Returns whether it was set.
    pub fn consume_trigger(&mut self, name: &str) -> bool {
        match self.values.get_mut(name) {
            Some(ParamValue::Trigger(set)) => std::mem::take(set),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn store(&mut self, name: &str, value: ParamValue) {
        match self.values.get_mut(name) {
            Some(slot) if slot.kind() == value.kind() => *slot = value,
            Some(slot) => warn!(
                param = name,
                declared = ?slot.kind(),
                written = ?value.kind(),
                "parameter kind mismatch; write ignored"
            ),
            None => warn!(param = name, "parameter not declared; write ignored"),
        }
    }
}

impl ParamTarget for Parameters {
    fn set_bool(&mut self, name: &str, value: bool) {
        self.store(name, ParamValue::Bool(value));
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.store(name, ParamValue::Int(value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.store(name, ParamValue::Float(value));
    }

    fn set_trigger(&mut self, name: &str) {
        self.store(name, ParamValue::Trigger(true));
    }

    fn reset_trigger(&mut self, name: &str) {
        self.store(name, ParamValue::Trigger(false));
    }
}

/// When a rule writes its parameter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum When {
    #[default]
    OnStateEnterTransitionStarts,
    OnStateEnterTransitionEnds,
    OnStateExitTransitionStarts,
    OnStateExitTransitionEnds,
    OnNormalizedTimeReached,
    WhileUpdating,
}

/// Authored parameter rule.
///
/// `repeat` (inside the threshold) is shared by both timed modes: it makes a
/// threshold fire once per loop, and wraps curve sampling modulo the time of
/// the last keyframe.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamRule {
    #[serde(default)]
    pub when: When,
    #[serde(default)]
    pub what: ParamKind,
    pub param_name: String,
    /// Literal for bool parameters; for triggers `true` sets and `false` resets.
    #[serde(default)]
    pub wanted_bool: bool,
    #[serde(default)]
    pub wanted_int: i32,
    #[serde(default)]
    pub wanted_float: f32,
    #[serde(flatten)]
    pub threshold: Threshold,
    #[serde(default)]
    pub curve: Curve,
}

impl ParamRule {
    fn named(when: When, param: &str, what: ParamKind) -> Self {
        Self {
            when,
            what,
            param_name: param.to_string(),
            ..Self::default()
        }
    }

    fn with_literal(mut self, value: ParamValue) -> Self {
        match value {
            ParamValue::Bool(v) | ParamValue::Trigger(v) => self.wanted_bool = v,
            ParamValue::Int(v) => self.wanted_int = v,
            ParamValue::Float(v) => self.wanted_float = v,
        }
        self
    }

    /// Write `value` on a lifecycle boundary.
    pub fn set(when: When, param: &str, value: ParamValue) -> Self {
        Self::named(when, param, value.kind()).with_literal(value)
    }

    /// Write `value` when `threshold` is reached.
    pub fn at(threshold: Threshold, param: &str, value: ParamValue) -> Self {
        let mut rule =
            Self::named(When::OnNormalizedTimeReached, param, value.kind()).with_literal(value);
        rule.threshold = threshold;
        rule
    }

    /// Drive `param` from `curve` on every Update tick.
    pub fn drive(param: &str, kind: ParamKind, curve: Curve, repeat: bool) -> Self {
        let mut rule = Self::named(When::WhileUpdating, param, kind);
        rule.curve = curve;
        rule.threshold.repeat = repeat;
        rule
    }

    /// Literal value of a discrete rule.
    pub fn literal(&self) -> ParamValue {
        match self.what {
            ParamKind::Bool => ParamValue::Bool(self.wanted_bool),
            ParamKind::Int => ParamValue::Int(self.wanted_int),
            ParamKind::Float => ParamValue::Float(self.wanted_float),
            ParamKind::Trigger => ParamValue::Trigger(self.wanted_bool),
        }
    }

    /// Curve value at `normalized_time`, coerced to the parameter kind.
    pub fn sample(&self, normalized_time: f32) -> ParamValue {
        let v = self
            .curve
            .evaluate_wrapped(normalized_time, self.threshold.repeat);
        ParamValue::coerce(self.what, v)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.when {
            When::OnNormalizedTimeReached => self.threshold.validate(),
            When::WhileUpdating => {
                if self.threshold.repeat && self.curve.is_empty() {
                    return Err(ConfigError::EmptyCurve {
                        param: self.param_name.clone(),
                    });
                }
                self.curve.validate(&self.param_name)
            }
            _ => Ok(()),
        }
    }
}

/// State behaviour applying one [`ParamRule`] to the entity's parameters.
#[derive(Clone, Debug)]
pub struct SetParamState {
    rule: Arc<ParamRule>,
    next: NextThreshold,
}

impl SetParamState {
    pub fn new(rule: Arc<ParamRule>) -> Self {
        Self {
            rule,
            next: NextThreshold::default(),
        }
    }

    /// Validating constructor.
    pub fn try_new(rule: Arc<ParamRule>) -> Result<Self, ConfigError> {
        rule.validate()?;
        Ok(Self::new(rule))
    }

    #[inline]
    pub fn rule(&self) -> &ParamRule {
        &self.rule
    }

    fn on_boundary(&self, origin: When, ctx: &mut NodeContext<'_>) {
        if self.rule.when == origin {
            ctx.params.write(&self.rule.param_name, self.rule.literal());
        }
    }
}

impl StateNode for SetParamState {
    fn enter_transition_start(&mut self, ctx: &mut NodeContext<'_>) {
        self.on_boundary(When::OnStateEnterTransitionStarts, ctx);
    }

    fn enter_transition_end(&mut self, ctx: &mut NodeContext<'_>) {
        self.on_boundary(When::OnStateEnterTransitionEnds, ctx);
    }

    fn update(&mut self, ctx: &mut NodeContext<'_>) {
        let t = ctx.frame.normalized_time;
        match self.rule.when {
            When::OnNormalizedTimeReached => {
                if self.next.poll(&self.rule.threshold, t, ctx.phase) {
                    ctx.params.write(&self.rule.param_name, self.rule.literal());
                }
            }
            When::WhileUpdating => {
                ctx.params.write(&self.rule.param_name, self.rule.sample(t));
            }
            _ => {}
        }
    }

    fn exit_transition_start(&mut self, ctx: &mut NodeContext<'_>) {
        self.on_boundary(When::OnStateExitTransitionStarts, ctx);
    }

    fn exit_transition_end(&mut self, ctx: &mut NodeContext<'_>) {
        self.on_boundary(When::OnStateExitTransitionEnds, ctx);
        if self.rule.when == When::OnNormalizedTimeReached
            && self.next.finish(&self.rule.threshold)
        {
            ctx.params.write(&self.rule.param_name, self.rule.literal());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Keyframe;

    #[test]
    fn coercion_follows_declared_kind() {
        assert_eq!(ParamValue::coerce(ParamKind::Bool, 0.01), ParamValue::Bool(true));
        assert_eq!(ParamValue::coerce(ParamKind::Bool, 0.0), ParamValue::Bool(false));
        assert_eq!(ParamValue::coerce(ParamKind::Int, 2.6), ParamValue::Int(3));
        assert_eq!(ParamValue::coerce(ParamKind::Int, 2.5), ParamValue::Int(2));
        assert_eq!(ParamValue::coerce(ParamKind::Int, -1.5), ParamValue::Int(-2));
        assert_eq!(ParamValue::coerce(ParamKind::Float, -0.25), ParamValue::Float(-0.25));
        assert_eq!(ParamValue::coerce(ParamKind::Trigger, 1.0), ParamValue::Trigger(true));
        assert_eq!(ParamValue::coerce(ParamKind::Trigger, -1.0), ParamValue::Trigger(false));
    }

    #[test]
    fn store_ignores_undeclared_and_mismatched_writes() {
        let mut params = Parameters::new();
        params
            .declare("Grounded", ParamValue::Bool(false))
            .declare("Jump", ParamValue::Trigger(false));
        params.set_int("Grounded", 3);
        params.set_bool("Missing", true);
        assert_eq!(params.get_bool("Grounded"), Some(false));
        assert_eq!(params.get("Missing"), None);

        params.set_trigger("Jump");
        assert!(params.is_trigger_set("Jump"));
        assert!(params.consume_trigger("Jump"));
        assert!(!params.consume_trigger("Jump"));
    }

    #[test]
    fn trigger_literal_uses_bool_field() {
        let rule = ParamRule::set(
            When::OnStateExitTransitionEnds,
            "Jump",
            ParamValue::Trigger(false),
        );
        assert_eq!(rule.literal(), ParamValue::Trigger(false));
        assert!(!rule.wanted_bool);
    }

    #[test]
    fn repeat_drive_requires_keys() {
        let rule = ParamRule::drive("Speed", ParamKind::Float, Curve::default(), true);
        assert_eq!(
            rule.validate(),
            Err(ConfigError::EmptyCurve {
                param: "Speed".into()
            })
        );
        let rule = ParamRule::drive("Speed", ParamKind::Float, Curve::default(), false);
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn sample_wraps_by_last_key_when_repeating() {
        let curve = Curve::new(vec![Keyframe::new(0.0, 0.0), Keyframe::new(0.5, 1.0)]);
        let rule = ParamRule::drive("Blink", ParamKind::Bool, curve, true);
        assert_eq!(rule.sample(0.5), ParamValue::Bool(false));
        assert_eq!(rule.sample(0.75), ParamValue::Bool(true));
    }

    #[test]
    fn authored_json_uses_field_names_of_the_asset() {
        let rule: ParamRule = serde_json::from_str(
            r#"{
                "when": "OnNormalizedTimeReached",
                "what": "Int",
                "paramName": "Combo",
                "wantedInt": 2,
                "normalizedTime": 0.7,
                "atLeastOnce": true
            }"#,
        )
        .unwrap();
        assert_eq!(rule.literal(), ParamValue::Int(2));
        assert!(rule.threshold.at_least_once);
        assert!(rule.validate().is_ok());
    }
}
