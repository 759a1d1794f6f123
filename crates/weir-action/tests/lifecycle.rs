//! Lifecycle properties across many steps.

use proptest::prelude::*;
use weir_action::{ActionSpec, ActionState, ActionTable};
use weir_core::ModelId;
use weir_lmm::{MaxMinSystem, SharingPolicy};

const MODEL: ModelId = ModelId(7);

#[derive(Clone, Debug)]
enum Op {
    Step(f64),
    Suspend(usize),
    Resume(usize),
    Priority(usize, f64),
    Bound(usize, Option<f64>),
}

fn op(n: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0.0f64..3.0).prop_map(Op::Step),
        1 => (0..n).prop_map(Op::Suspend),
        1 => (0..n).prop_map(Op::Resume),
        1 => (0..n, 0.1f64..5.0).prop_map(|(i, p)| Op::Priority(i, p)),
        1 => (0..n, prop::option::of(0.0f64..20.0)).prop_map(|(i, b)| Op::Bound(i, b)),
    ]
}

proptest! {
    #[test]
    fn remains_never_increase(
        costs in prop::collection::vec(0.0f64..500.0, 1..6),
        ops in prop::collection::vec(op(6), 1..40),
    ) {
        let mut sys = MaxMinSystem::default();
        let mut table = ActionTable::new();
        let cpu = sys.new_constraint(25.0, SharingPolicy::Shared).unwrap();
        let ids: Vec<_> = costs
            .iter()
            .map(|&cost| {
                let id = table
                    .create(&mut sys, MODEL, ActionSpec::new(cost).consume(cpu, 1.0))
                    .unwrap();
                table.start(&mut sys, id, 0.0).unwrap();
                id
            })
            .collect();
        let mut previous: Vec<f64> = costs.clone();
        let mut now = 0.0;

        for op in &ops {
            match *op {
                Op::Step(dt) => {
                    table.min_completion(&mut sys, MODEL).unwrap();
                    now += dt;
                    table.update_running(&mut sys, MODEL, now, dt).unwrap();
                }
                Op::Suspend(i) | Op::Resume(i) | Op::Priority(i, _) | Op::Bound(i, _)
                    if i >= ids.len() => {}
                Op::Suspend(i) => {
                    let _ = table.suspend(&mut sys, ids[i]);
                }
                Op::Resume(i) => {
                    let _ = table.resume(&mut sys, ids[i]);
                }
                Op::Priority(i, p) => table.set_priority(&mut sys, ids[i], p).unwrap(),
                Op::Bound(i, b) => table.set_bound(&mut sys, ids[i], b).unwrap(),
            }
            for (k, &id) in ids.iter().enumerate() {
                let remains = table.get(id).unwrap().remains();
                prop_assert!(remains <= previous[k]);
                prop_assert!(remains >= 0.0);
                previous[k] = remains;
            }
        }

        let done = table.actions_in(MODEL, ActionState::Done).count();
        let running = table.actions_in(MODEL, ActionState::Running).count();
        prop_assert_eq!(done + running, ids.len());
    }
}

#[test]
fn finished_actions_release_their_share() {
    let mut sys = MaxMinSystem::default();
    let mut table = ActionTable::new();
    let link = sys.new_constraint(10.0, SharingPolicy::Shared).unwrap();
    let short = table
        .create(&mut sys, MODEL, ActionSpec::new(10.0).consume(link, 1.0))
        .unwrap();
    let long = table
        .create(&mut sys, MODEL, ActionSpec::new(100.0).consume(link, 1.0))
        .unwrap();
    table.start(&mut sys, short, 0.0).unwrap();
    table.start(&mut sys, long, 0.0).unwrap();

    // 5 each: the short one finishes after 2 seconds.
    assert_eq!(table.min_completion(&mut sys, MODEL).unwrap(), Some(2.0));
    table.update_running(&mut sys, MODEL, 2.0, 2.0).unwrap();
    assert_eq!(table.state(short), ActionState::Done);

    // The long one now runs alone at 10 with 90 left.
    assert_eq!(table.min_completion(&mut sys, MODEL).unwrap(), Some(9.0));
    table.update_running(&mut sys, MODEL, 11.0, 9.0).unwrap();
    assert_eq!(table.state(long), ActionState::Done);
    assert_eq!(
        table.actions_in(MODEL, ActionState::Done).collect::<Vec<_>>(),
        vec![short, long]
    );
}

#[test]
fn priority_and_bound_reshape_the_split() {
    let mut sys = MaxMinSystem::default();
    let mut table = ActionTable::new();
    let link = sys.new_constraint(12.0, SharingPolicy::Shared).unwrap();
    let a = table
        .create(&mut sys, MODEL, ActionSpec::new(100.0).consume(link, 1.0))
        .unwrap();
    let b = table
        .create(&mut sys, MODEL, ActionSpec::new(100.0).consume(link, 1.0))
        .unwrap();
    table.start(&mut sys, a, 0.0).unwrap();
    table.start(&mut sys, b, 0.0).unwrap();

    // Weight divides the share: a gets twice what b gets.
    table.set_priority(&mut sys, b, 2.0).unwrap();
    let (va, vb) = (table.get(a).unwrap().variable(), table.get(b).unwrap().variable());
    assert!((sys.value(va).unwrap() - 8.0).abs() < 1e-9);
    assert!((sys.value(vb).unwrap() - 4.0).abs() < 1e-9);

    table.set_bound(&mut sys, a, Some(3.0)).unwrap();
    assert_eq!(sys.value(va).unwrap(), 3.0);
    assert!((sys.value(vb).unwrap() - 9.0).abs() < 1e-9);
    assert_eq!(table.get(a).unwrap().bound(), Some(3.0));
}

#[test]
fn references_keep_terminal_actions_alive() {
    let mut sys = MaxMinSystem::default();
    let mut table = ActionTable::new();
    let id = table.create(&mut sys, MODEL, ActionSpec::new(1.0)).unwrap();
    table.set_tag(id, 0xfeed).unwrap();
    table.ref_action(id).unwrap();
    table.cancel(&mut sys, id, 4.0).unwrap();

    assert_eq!(table.unref(&mut sys, id).unwrap(), ActionState::Failed);
    let action = table.get(id).unwrap();
    assert_eq!((action.tag(), action.finish_time()), (0xfeed, Some(4.0)));
    assert_eq!(table.actions_in(MODEL, ActionState::Failed).collect::<Vec<_>>(), vec![id]);

    assert_eq!(table.unref(&mut sys, id).unwrap(), ActionState::ToFree);
    assert_eq!(table.state(id), ActionState::NotInSystem);
    assert_eq!(table.model_len(MODEL), 0);
    assert_eq!(sys.variable_count(), 0);
}
