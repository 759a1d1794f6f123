//! Hosts, links and timers driven together by one kernel.

use proptest::prelude::*;
use weir_action::ActionState;
use weir_core::{ModelId, ResourceId};
use weir_engine::{Kernel, KernelConfig};
use weir_lmm::SharingPolicy;
use weir_models::{CpuModel, NetworkModel, TimerModel};
use weir_trace::Trace;

struct Platform {
    kernel: Kernel,
    cpu: ModelId,
    net: ModelId,
    timers: ModelId,
    host: ResourceId,
    link: ResourceId,
}

fn platform(power: f64, bandwidth: f64, latency: f64) -> Platform {
    let mut kernel = Kernel::new(KernelConfig::default()).unwrap();
    let cpu = kernel.add_model(CpuModel::new());
    let net = kernel.add_model(NetworkModel::new());
    let timers = kernel.add_model(TimerModel::<u32>::new());
    let host = kernel
        .with_model::<CpuModel, _>(cpu, |m, ctx| m.add_host(ctx, "node-0", power))
        .unwrap();
    let link = kernel
        .with_model::<NetworkModel, _>(net, |m, ctx| {
            m.add_link(ctx, "uplink", bandwidth, latency, SharingPolicy::Shared)
        })
        .unwrap();
    Platform {
        kernel,
        cpu,
        net,
        timers,
        host,
        link,
    }
}

#[test]
fn compute_then_send() {
    let Platform {
        mut kernel,
        cpu,
        net,
        host,
        link,
        ..
    } = platform(100.0, 50.0, 1.0);

    let job = kernel
        .with_model::<CpuModel, _>(cpu, |m, ctx| m.execute(ctx, host, 200.0))
        .unwrap();
    assert_eq!(kernel.run_until_terminal(job).unwrap(), ActionState::Done);
    assert_eq!(kernel.current_clock(), 2.0);

    let transfer = kernel
        .with_model::<NetworkModel, _>(net, |m, ctx| m.communicate(ctx, &[link], 100.0, None))
        .unwrap();
    assert_eq!(kernel.run_until_terminal(transfer).unwrap(), ActionState::Done);
    // One second of latency, then 100 bytes at 50 B/s.
    assert_eq!(kernel.current_clock(), 5.0);
    assert_eq!(kernel.action(transfer).unwrap().start_time(), Some(2.0));
}

#[test]
fn timers_interrupt_long_computations() {
    let Platform {
        mut kernel,
        cpu,
        timers,
        host,
        ..
    } = platform(100.0, 1.0, 0.0);

    let job = kernel
        .with_model::<CpuModel, _>(cpu, |m, ctx| m.execute(ctx, host, 1000.0))
        .unwrap();
    kernel
        .with_model::<TimerModel<u32>, _>(timers, |m, ctx| m.set(ctx, 3.0, 7))
        .unwrap();

    let mut seen = None;
    while kernel.solve(None).unwrap().is_some() {
        let fired = kernel
            .with_model::<TimerModel<u32>, _>(timers, |m, _| Ok(m.take_fired()))
            .unwrap();
        if let Some(command) = fired {
            seen = Some((command, kernel.current_clock(), kernel.get_remains(job).unwrap()));
        }
    }
    assert_eq!(seen, Some((7, 3.0, 700.0)));
    assert_eq!(kernel.current_clock(), 10.0);
    assert_eq!(kernel.action_state(job), ActionState::Done);
}

#[test]
fn link_outage_spares_the_host() {
    let Platform {
        mut kernel,
        cpu,
        net,
        host,
        link,
        ..
    } = platform(100.0, 10.0, 0.0);

    let (transfer, job) = {
        let transfer = kernel
            .with_model::<NetworkModel, _>(net, |m, ctx| {
                m.state_trace(ctx, link, Trace::from_dates(&[(1.5, 0.0)])?, 0.0, None)?;
                m.communicate(ctx, &[link], 100.0, None)
            })
            .unwrap();
        let job = kernel
            .with_model::<CpuModel, _>(cpu, |m, ctx| m.execute(ctx, host, 500.0))
            .unwrap();
        (transfer, job)
    };

    assert_eq!(kernel.run_until_terminal(transfer).unwrap(), ActionState::Failed);
    assert_eq!(kernel.current_clock(), 1.5);
    assert_eq!(kernel.action(transfer).unwrap().remains(), 85.0);

    assert_eq!(kernel.run_until_terminal(job).unwrap(), ActionState::Done);
    assert_eq!(kernel.current_clock(), 5.0);
}

#[test]
fn finalize_releases_every_model() {
    let Platform {
        mut kernel,
        cpu,
        net,
        timers,
        host,
        link,
    } = platform(10.0, 10.0, 0.5);

    kernel
        .with_model::<CpuModel, _>(cpu, |m, ctx| m.execute(ctx, host, 1e6))
        .unwrap();
    kernel
        .with_model::<NetworkModel, _>(net, |m, ctx| m.communicate(ctx, &[link], 1e6, None))
        .unwrap();
    kernel
        .with_model::<TimerModel<u32>, _>(timers, |m, ctx| m.set(ctx, 100.0, 1))
        .unwrap();
    kernel.run_until(2.0).unwrap();

    kernel.finalize().unwrap();
    assert!(kernel.actions().is_empty());
    assert_eq!(
        kernel.model::<TimerModel<u32>>(timers).unwrap().pending_len(),
        0
    );
    assert_eq!(kernel.history().next_date(), None);
}

proptest! {
    #[test]
    fn one_host_finishes_all_work_at_total_over_power(
        power in 1.0f64..100.0,
        jobs in prop::collection::vec(1.0f64..1000.0, 1..8),
    ) {
        let Platform { mut kernel, cpu, host, .. } = platform(power, 1.0, 0.0);
        let ids: Vec<_> = jobs
            .iter()
            .map(|&flops| {
                kernel
                    .with_model::<CpuModel, _>(cpu, |m, ctx| m.execute(ctx, host, flops))
                    .unwrap()
            })
            .collect();
        while kernel.solve(None).unwrap().is_some() {}

        let makespan = jobs.iter().sum::<f64>() / power;
        prop_assert!((kernel.current_clock() - makespan).abs() <= 1e-6 * makespan + 1e-4);
        for id in ids {
            prop_assert_eq!(kernel.action_state(id), ActionState::Done);
        }
    }
}
