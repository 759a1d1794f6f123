//! Driver step semantics: event merging, horizons, error propagation.

use weir_core::{ModelId, ResourceHandle, ResourceId, Signal};
use weir_engine::{Kernel, KernelConfig, KernelError, ModelError};
use weir_lmm::SharingPolicy;
use weir_test_utils::{kernel_with, Call, RecordingModel, SharedModel, UnimplementedModel};
use weir_trace::{Trace, TraceError};

fn wakeup(model: ModelId) -> ResourceHandle {
    ResourceHandle::new(model, ResourceId(0), Signal::Wakeup)
}

fn at(dates: &[f64]) -> Vec<Trace> {
    dates
        .iter()
        .map(|&d| Trace::from_dates(&[(d, 1.0)]).unwrap())
        .collect()
}

fn recording(offer: Option<f64>, used: bool, dates: &[f64]) -> (Kernel, ModelId) {
    let (mut kernel, model) = kernel_with(RecordingModel::new(offer, used));
    for trace in at(dates) {
        kernel.add_trace(wakeup(model), trace, 0.0, None).unwrap();
    }
    (kernel, model)
}

fn calls(kernel: &Kernel, model: ModelId) -> Vec<Call> {
    kernel.model::<RecordingModel>(model).unwrap().calls.clone()
}

#[test]
fn first_step_flushes_events_due_now_and_settles() {
    let (mut kernel, model) = recording(Some(10.0), false, &[0.0, 5.0]);
    assert_eq!(kernel.solve(None).unwrap(), Some(0.0));

    let seen = calls(&kernel, model);
    assert_eq!(seen.len(), 2);
    assert!(matches!(seen[0], Call::Event { now: 0.0, event } if event.date == 0.0));
    assert_eq!(seen[1], Call::Update { now: 0.0, delta: 0.0 });
    assert_eq!(kernel.history().next_date(), Some(5.0));
}

#[test]
fn used_resource_event_cuts_the_step() {
    let (mut kernel, model) = recording(Some(10.0), true, &[3.0]);
    kernel.solve(None).unwrap();
    assert_eq!(kernel.solve(None).unwrap(), Some(3.0));
    assert_eq!(kernel.current_clock(), 3.0);

    let seen = calls(&kernel, model);
    // Share, then the event (checked for use first), then the update.
    assert!(matches!(seen[1], Call::Share { now: 0.0 }));
    assert!(matches!(seen[2], Call::Event { now: 0.0, .. }));
    assert_eq!(seen[3], Call::Update { now: 3.0, delta: 3.0 });
}

#[test]
fn unused_resource_event_rides_along() {
    let (mut kernel, model) = recording(Some(10.0), false, &[3.0, 7.0, 12.0]);
    kernel.solve(None).unwrap();
    assert_eq!(kernel.solve(None).unwrap(), Some(10.0));
    assert_eq!(kernel.last_metrics().events_applied, 2);

    let dates: Vec<f64> = kernel
        .model::<RecordingModel>(model)
        .unwrap()
        .events()
        .iter()
        .map(|e| e.date)
        .collect();
    assert_eq!(dates, vec![3.0, 7.0]);
    assert_eq!(kernel.history().next_date(), Some(12.0));
}

#[test]
fn with_nothing_running_the_next_event_sets_the_pace() {
    let (mut kernel, model) = recording(None, false, &[5.0, 5.0, 9.0]);
    kernel.solve(None).unwrap();
    assert_eq!(kernel.solve(None).unwrap(), Some(5.0));
    assert_eq!(kernel.last_metrics().events_applied, 2);
    assert_eq!(kernel.solve(None).unwrap(), Some(4.0));
    assert_eq!(kernel.solve(None).unwrap(), None);
    assert_eq!(kernel.current_clock(), 9.0);
    assert_eq!(
        kernel.model::<RecordingModel>(model).unwrap().deltas(),
        vec![0.0, 5.0, 4.0]
    );
}

#[test]
fn max_date_clamps_the_step_and_holds_later_events() {
    let (mut kernel, model) = recording(Some(10.0), true, &[6.0]);
    kernel.solve(None).unwrap();
    assert_eq!(kernel.solve(Some(4.0)).unwrap(), Some(4.0));
    assert_eq!(kernel.current_clock(), 4.0);
    assert!(kernel.model::<RecordingModel>(model).unwrap().events().is_empty());

    let (mut idle, _) = recording(None, false, &[6.0]);
    idle.solve(None).unwrap();
    assert_eq!(idle.solve(Some(4.0)).unwrap(), None);
    assert_eq!(idle.current_clock(), 0.0);
}

#[test]
fn periodic_trace_plays_its_loop_count() {
    let (mut kernel, model) = kernel_with(RecordingModel::new(None, false));
    let trace = Trace::from_dates(&[(0.0, 1.0)])
        .unwrap()
        .with_period(2.0)
        .unwrap();
    kernel.add_trace(wakeup(model), trace, 1.0, Some(3)).unwrap();

    kernel.run_until(10.0).unwrap();
    let dates: Vec<f64> = kernel
        .model::<RecordingModel>(model)
        .unwrap()
        .events()
        .iter()
        .map(|e| e.date)
        .collect();
    assert_eq!(dates, vec![1.0, 3.0, 5.0]);
    assert_eq!(kernel.current_clock(), 10.0);
}

#[test]
fn unimplemented_share_surfaces_from_solve() {
    let (mut kernel, _) = kernel_with(UnimplementedModel::refusing("share_resources"));
    kernel.solve(None).unwrap();
    let err = kernel.solve(None).unwrap_err();
    assert_eq!(
        err,
        KernelError::Model {
            model: "unimplemented".into(),
            source: ModelError::Unimplemented {
                model: "unimplemented".into(),
                operation: "share_resources",
            },
        }
    );
}

#[test]
fn unimplemented_update_surfaces_from_the_first_step() {
    let (mut kernel, _) = kernel_with(UnimplementedModel::refusing("update_actions_state"));
    assert!(matches!(
        kernel.solve(None),
        Err(KernelError::Model {
            source: ModelError::Unimplemented {
                operation: "update_actions_state",
                ..
            },
            ..
        })
    ));
}

#[test]
fn events_for_models_without_trace_support_fail_loudly() {
    let (mut kernel, model) = kernel_with(UnimplementedModel::refusing("nothing"));
    kernel
        .add_trace(wakeup(model), Trace::constant(1.0), 0.0, None)
        .unwrap();
    assert!(matches!(
        kernel.solve(None),
        Err(KernelError::Model {
            source: ModelError::Unimplemented {
                operation: "resource_used",
                ..
            },
            ..
        })
    ));
}

#[test]
fn unsupported_signal_is_reported() {
    let (mut kernel, model) = kernel_with(SharedModel::new("shared"));
    let link = kernel
        .with_model::<SharedModel, _>(model, |m, ctx| m.add_resource(ctx, 1.0, SharingPolicy::Shared))
        .unwrap();
    kernel
        .add_trace(
            ResourceHandle::new(model, link, Signal::Latency),
            Trace::constant(0.5),
            0.0,
            None,
        )
        .unwrap();
    assert!(matches!(
        kernel.solve(None),
        Err(KernelError::Model {
            source: ModelError::UnsupportedSignal {
                signal: Signal::Latency,
                ..
            },
            ..
        })
    ));
}

#[test]
fn traces_are_validated_on_attach() {
    let (mut kernel, model) = recording(Some(2.0), false, &[]);
    assert!(matches!(
        kernel.add_trace(wakeup(ModelId(4)), Trace::constant(1.0), 0.0, None),
        Err(KernelError::UnknownModel(ModelId(4)))
    ));
    kernel.run_until(3.0).unwrap();
    assert_eq!(
        kernel.add_trace(wakeup(model), Trace::constant(1.0), 1.0, None),
        Err(KernelError::Trace(TraceError::InvalidStartDate { start: 1.0 }))
    );
    let stream = kernel
        .add_trace(wakeup(model), Trace::constant(1.0), 8.0, None)
        .unwrap();
    assert!(kernel.remove_trace(stream));
    assert!(!kernel.remove_trace(stream));
}

#[test]
fn zero_length_steps_are_bounded() {
    let config = KernelConfig {
        max_zero_steps: 3,
        ..KernelConfig::default()
    };
    let mut kernel = Kernel::new(config).unwrap();
    kernel.add_model(RecordingModel::new(Some(0.0), false));
    kernel.solve(None).unwrap();
    for _ in 0..3 {
        assert_eq!(kernel.solve(None).unwrap(), Some(0.0));
    }
    assert!(matches!(
        kernel.solve(None),
        Err(KernelError::Stalled { steps: 4, .. })
    ));
}

#[test]
fn run_helpers_respect_the_step_budget() {
    let config = KernelConfig {
        max_steps_per_run: 5,
        ..KernelConfig::default()
    };
    let mut kernel = Kernel::new(config).unwrap();
    kernel.add_model(RecordingModel::new(Some(1.0), false));
    assert_eq!(
        kernel.run_until(100.0),
        Err(KernelError::StepLimit { steps: 5 })
    );
    assert_eq!(kernel.current_clock(), 4.0);
}

#[test]
fn finalize_reaches_every_model() {
    let (mut kernel, model) = recording(None, false, &[]);
    kernel.solve(None).unwrap();
    kernel.finalize().unwrap();
    assert_eq!(calls(&kernel, model).last(), Some(&Call::Finalize));
}
