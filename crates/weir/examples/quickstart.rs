//! A small platform end to end.
//!
//! Demonstrates: register models → declare hosts and links → attach traces
//! → start computations and transfers → step → read back finish times.
//!
//! Run with `RUST_LOG=weir_engine=debug` to see every step.

use tracing_subscriber::EnvFilter;
use weir::prelude::*;

/// The host runs at full speed, drops to half speed between 4s and 8s, and
/// repeats every 12s, three times over.
const HOST_POWER: &str = "
PERIODICITY 12.0
0.0 1.0
4.0 0.5
8.0 1.0
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("=== weir quickstart ===\n");

    let mut kernel = Kernel::new(KernelConfig::default())?;
    let cpu = kernel.add_model(CpuModel::new());
    let net = kernel.add_model(NetworkModel::new());
    let timers = kernel.add_model(TimerModel::<&'static str>::new());

    let host = kernel.with_model::<CpuModel, _>(cpu, |m, ctx| {
        let host = m.add_host(ctx, "alpha", 1e9)?;
        m.power_trace(ctx, host, HOST_POWER.parse()?, 0.0, Some(3))?;
        Ok(host)
    })?;
    let (lan, wan) = kernel.with_model::<NetworkModel, _>(net, |m, ctx| {
        let lan = m.add_link(ctx, "lan", 1.25e8, 1e-4, SharingPolicy::Shared)?;
        let wan = m.add_link(ctx, "wan", 1e7, 2e-2, SharingPolicy::Fatpipe)?;
        // The WAN goes down for good at t=30s.
        m.state_trace(ctx, wan, Trace::from_dates(&[(30.0, 0.0)])?, 0.0, None)?;
        Ok((lan, wan))
    })?;

    let jobs = kernel.with_model::<CpuModel, _>(cpu, |m, ctx| {
        Ok(vec![
            ("render", m.execute(ctx, host, 6e9)?),
            ("encode", m.execute(ctx, host, 2e9)?),
        ])
    })?;
    let transfers = kernel.with_model::<NetworkModel, _>(net, |m, ctx| {
        Ok(vec![
            ("upload", m.communicate(ctx, &[lan, wan], 2e8, None)?),
            ("backup", m.communicate(ctx, &[lan, wan], 5e8, None)?),
        ])
    })?;
    kernel.with_model::<TimerModel<&'static str>, _>(timers, |m, ctx| {
        m.set(ctx, 5.0, "checkpoint")?;
        m.set(ctx, 25.0, "checkpoint")
    })?;

    while kernel.solve(None)?.is_some() {
        let fired = kernel
            .with_model::<TimerModel<&'static str>, _>(timers, |m, _| Ok(m.drain_fired()))?;
        for command in fired {
            println!("  t={:>7.3}s  timer: {command}", kernel.current_clock());
        }
        for t in kernel.last_transitions() {
            println!("  t={:>7.3}s  {} -> {}", t.at, t.action, t.to);
        }
    }

    println!("\nSummary:");
    for (name, id) in jobs.iter().chain(&transfers) {
        let action = kernel.action(*id).ok_or("action vanished")?;
        println!(
            "  {name:<8} {:<7} finished at {:>8.3}s (work left {:.0})",
            action.state().to_string(),
            action.finish_time().unwrap_or(f64::NAN),
            action.remains(),
        );
    }
    println!("  {} steps, clock {:.3}s", kernel.steps(), kernel.current_clock());

    kernel.finalize()?;
    Ok(())
}
