use std::sync::Arc;

use vizij_animation_events::{
    AnimatedEntity, Config, EventHook, EventId, LayerId, StateEvents, StateFrame, StateId,
    Threshold, TimedEvent, TransitionId,
};

const LAYER: LayerId = LayerId(0);

struct Rig {
    entity: AnimatedEntity,
    state: StateId,
}

impl Rig {
    /// One state carrying `defs`, with every referenced name registered.
    fn new(names: &[&str], build: impl FnOnce(&mut StateEvents)) -> Self {
        let mut entity = AnimatedEntity::new(Config::default());
        for name in names {
            entity.register_event(name, || {}).unwrap();
        }
        let mut defs = StateEvents::new();
        build(&mut defs);
        let state = StateId::from_name("Base.Test");
        entity
            .add_state_events(LAYER, state, Arc::new(defs))
            .unwrap();
        Self { entity, state }
    }

    fn names(&mut self) -> Vec<String> {
        let report = self.entity.end_frame();
        let ids = report.flushed.clone();
        ids.iter()
            .map(|id| {
                self.entity
                    .events()
                    .resolve(*id)
                    .map(|e| e.name().to_string())
                    .unwrap_or_default()
            })
            .collect()
    }

    fn enter(&mut self, frame: StateFrame) -> Vec<String> {
        self.entity.state_enter(LAYER, self.state, frame);
        self.names()
    }

    fn update(&mut self, frame: StateFrame) -> Vec<String> {
        self.entity.state_update(LAYER, self.state, frame);
        self.names()
    }

    fn exit(&mut self, frame: StateFrame) -> Vec<String> {
        self.entity.state_exit(LAYER, self.state, frame);
        self.names()
    }
}

fn id(name: &str) -> EventId {
    EventId::from_name(name)
}

fn at(name: &str, threshold: Threshold) -> TimedEvent {
    TimedEvent::at(id(name), threshold)
}

#[test]
fn one_shot_fires_once_even_past_later_loops() {
    let mut rig = Rig::new(&["Half"], |d| {
        d.register(EventHook::NormalizedTime, at("Half", Threshold::at(0.5)));
    });
    let mut fired = rig.enter(StateFrame::steady(0.0)).len();
    for t in [0.2, 0.49, 0.5, 0.9, 1.2, 1.6, 2.5] {
        fired += rig.update(StateFrame::steady(t)).len();
    }
    assert_eq!(fired, 1);
}

#[test]
fn repeating_fires_once_per_loop() {
    let mut rig = Rig::new(&["Quarter"], |d| {
        d.register(
            EventHook::NormalizedTime,
            at("Quarter", Threshold::at(0.25).repeating()),
        );
    });
    rig.enter(StateFrame::steady(0.0));
    let mut fired_at = Vec::new();
    for step in 1..=60 {
        let t = step as f32 * 0.05;
        if !rig.update(StateFrame::steady(t)).is_empty() {
            fired_at.push((t * 100.0).round() as i32);
        }
    }
    assert_eq!(fired_at, vec![25, 125, 225]);
}

#[test]
fn repeating_threshold_targets_loop_relative_time() {
    let mut rig = Rig::new(&["Mid"], |d| {
        d.register(EventHook::NormalizedTime, at("Mid", Threshold::at(0.5).repeating()));
    });
    let per_frame: Vec<usize> = [0.1, 0.6, 1.1, 1.6]
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let frame = StateFrame::steady(*t);
            if i == 0 {
                rig.enter(frame).len()
            } else {
                rig.update(frame).len()
            }
        })
        .collect();
    assert_eq!(per_frame, vec![0, 1, 0, 1]);
}

#[test]
fn at_least_once_fires_at_exit_end_only_if_never_reached() {
    let mut rig = Rig::new(&["Late"], |d| {
        d.register(
            EventHook::NormalizedTime,
            at("Late", Threshold::at(0.9).at_least_once()),
        );
    });

    // Never reaches 0.9: owed at the final boundary.
    rig.enter(StateFrame::steady(0.0));
    assert!(rig.update(StateFrame::steady(0.5)).is_empty());
    assert!(rig.update(StateFrame::transitioning(0.7, TransitionId(2))).is_empty());
    assert_eq!(rig.exit(StateFrame::steady(0.8)), vec!["Late"]);

    // Reaches 0.9 on the next visit: no second firing at exit.
    rig.enter(StateFrame::steady(0.0));
    assert_eq!(rig.update(StateFrame::steady(0.95)), vec!["Late"]);
    assert!(rig.exit(StateFrame::steady(1.0)).is_empty());
}

#[test]
fn never_while_exit_is_silent_during_exit_blend() {
    let mut rig = Rig::new(&["Quiet", "Loud"], |d| {
        d.register(
            EventHook::NormalizedTime,
            at("Quiet", Threshold::at(0.6).never_while_exit()),
        )
        .register(EventHook::NormalizedTime, at("Loud", Threshold::at(0.6)));
    });
    rig.enter(StateFrame::steady(0.0));
    // Exit blend starts below the threshold.
    assert!(rig.update(StateFrame::transitioning(0.5, TransitionId(4))).is_empty());
    assert_eq!(
        rig.update(StateFrame::transitioning(0.7, TransitionId(4))),
        vec!["Loud"]
    );
    assert!(rig.update(StateFrame::transitioning(0.9, TransitionId(4))).is_empty());
    assert!(rig.exit(StateFrame::steady(1.0)).is_empty());
}

#[test]
fn arrays_fire_in_lifecycle_order() {
    let names = ["EnterStart", "EnterEnd", "Tick", "AtZero", "ExitStart", "ExitEnd", "Owed"];
    let mut rig = Rig::new(&names, |d| {
        d.register(EventHook::ExitTransitionEnd, TimedEvent::new(id("ExitEnd")))
            .register(EventHook::ExitTransitionStart, TimedEvent::new(id("ExitStart")))
            .register(EventHook::NormalizedTime, at("AtZero", Threshold::at(0.0)))
            .register(
                EventHook::NormalizedTime,
                at("Owed", Threshold::at(1.0).at_least_once()),
            )
            .register(EventHook::Update, TimedEvent::new(id("Tick")))
            .register(EventHook::EnterTransitionEnd, TimedEvent::new(id("EnterEnd")))
            .register(EventHook::EnterTransitionStart, TimedEvent::new(id("EnterStart")));
    });

    assert_eq!(
        rig.enter(StateFrame::steady(0.0)),
        vec!["EnterStart", "EnterEnd", "Tick", "AtZero"]
    );
    assert_eq!(
        rig.exit(StateFrame::steady(0.3)),
        vec!["ExitStart", "ExitEnd", "Owed"]
    );
}

#[test]
fn revisits_restart_the_schedule() {
    let mut rig = Rig::new(&["Once"], |d| {
        d.register(EventHook::NormalizedTime, at("Once", Threshold::at(0.3)));
    });
    for _ in 0..3 {
        rig.enter(StateFrame::steady(0.0));
        assert_eq!(rig.update(StateFrame::steady(0.4)), vec!["Once"]);
        assert!(rig.update(StateFrame::steady(1.4)).is_empty());
        rig.exit(StateFrame::steady(1.5));
    }
}

#[test]
fn self_transition_resets_counters_when_the_old_occupancy_ends() {
    let mut rig = Rig::new(&["Step"], |d| {
        d.register(
            EventHook::NormalizedTime,
            at("Step", Threshold::at(0.2).at_least_once()),
        );
    });
    rig.enter(StateFrame::steady(0.0));
    assert_eq!(rig.update(StateFrame::steady(0.5)), vec!["Step"]);

    // New occupancy arrives before the old Exit.
    let token = TransitionId(9);
    assert!(rig.enter(StateFrame::transitioning(0.0, token)).is_empty());
    // Old occupancy ends: it had fired, so nothing is owed; counters rewind.
    assert!(rig.exit(StateFrame::transitioning(0.1, token)).is_empty());
    assert_eq!(rig.update(StateFrame::steady(0.25)), vec!["Step"]);
}
