use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vizij_animation_events::{
    AnimatedEntity, Config, EventHook, LayerId, StateEvents, StateFrame, StateId, Threshold,
    TimedEvent, TransitionId,
};

const STATES: u32 = 32;

fn build_entity() -> (AnimatedEntity, Vec<StateId>) {
    let mut entity = AnimatedEntity::new(Config::default());
    let step = entity.register_event("Step", || {}).unwrap();
    let tick = entity.register_event("Tick", || {}).unwrap();

    let mut defs = StateEvents::new();
    defs.register(EventHook::EnterTransitionStart, TimedEvent::new(step))
        .register(EventHook::Update, TimedEvent::new(tick))
        .register(EventHook::ExitTransitionEnd, TimedEvent::new(step));
    for i in 0..8 {
        defs.register(
            EventHook::NormalizedTime,
            TimedEvent::at(step, Threshold::at(i as f32 / 8.0).repeating()),
        );
    }
    let defs = Arc::new(defs);

    let states: Vec<StateId> = (0..STATES)
        .map(|i| StateId::from_name(&format!("Base.State{i}")))
        .collect();
    for s in &states {
        entity
            .add_state_events(LayerId(0), *s, Arc::clone(&defs))
            .unwrap();
    }
    (entity, states)
}

fn bench_lifecycle_step(c: &mut Criterion) {
    c.bench_function("occupancy_32_states_60_frames", |b| {
        let (mut entity, states) = build_entity();
        b.iter(|| {
            for s in &states {
                entity.state_enter(LayerId(0), *s, StateFrame::transitioning(0.0, TransitionId(1)));
            }
            for frame in 1..60 {
                let t = frame as f32 / 30.0;
                for s in &states {
                    let f = if frame > 50 {
                        StateFrame::transitioning(t, TransitionId(2))
                    } else {
                        StateFrame::steady(t)
                    };
                    entity.state_update(LayerId(0), *s, f);
                }
                black_box(entity.end_frame().flushed.len());
            }
            for s in &states {
                entity.state_exit(LayerId(0), *s, StateFrame::steady(2.0));
            }
            black_box(entity.end_frame().flushed.len());
        });
    });
}

criterion_group!(benches, bench_lifecycle_step);
criterion_main!(benches);
