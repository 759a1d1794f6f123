//! Benchmark profiles for the weir kernel.
//!
//! Every builder is deterministic in its seed:
//!
//! - [`random_system`]: a bare max-min system with random bounds, weights
//!   and fan-out
//! - [`cluster_profile`]: a kernel with hosts, a shared backbone and a
//!   batch of computations and transfers ready to run

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use weir_core::{ActionId, ModelId, VariableId};
use weir_engine::{Kernel, KernelConfig};
use weir_lmm::{MaxMinSystem, SharingPolicy, SolverConfig};
use weir_models::{CpuModel, NetworkModel};

/// Shape of a random max-min system.
#[derive(Clone, Copy, Debug)]
pub struct SystemShape {
    /// Number of constraints.
    pub constraints: usize,
    /// Number of variables.
    pub variables: usize,
    /// Constraints each variable consumes.
    pub fanout: usize,
}

/// Build a random system. One constraint in eight is fatpipe.
pub fn random_system(seed: u64, shape: SystemShape, config: SolverConfig) -> (MaxMinSystem, Vec<VariableId>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut sys = MaxMinSystem::new(config);
    let cnsts: Vec<_> = (0..shape.constraints)
        .map(|i| {
            let policy = if i % 8 == 0 {
                SharingPolicy::Fatpipe
            } else {
                SharingPolicy::Shared
            };
            sys.new_constraint(rng.random_range(1.0..1000.0), policy)
                .unwrap()
        })
        .collect();
    let vars = (0..shape.variables)
        .map(|_| {
            let bound = rng.random_bool(0.25).then(|| rng.random_range(1.0..100.0));
            let var = sys
                .new_variable(rng.random_range(0.5..4.0), bound, shape.fanout)
                .unwrap();
            for _ in 0..shape.fanout {
                let cnst = cnsts[rng.random_range(0..cnsts.len())];
                sys.expand_add(cnst, var, rng.random_range(0.5..2.0)).unwrap();
            }
            var
        })
        .collect();
    (sys, vars)
}

/// A kernel ready to run, with the actions it started.
pub struct ClusterProfile {
    /// The kernel.
    pub kernel: Kernel,
    /// The CPU model.
    pub cpu: ModelId,
    /// The network model.
    pub net: ModelId,
    /// Every computation and transfer started.
    pub actions: Vec<ActionId>,
}

/// `hosts` hosts with one private link each plus a shared backbone;
/// every host runs `jobs` computations and sends `jobs` transfers across
/// the backbone.
pub fn cluster_profile(seed: u64, hosts: usize, jobs: usize, config: KernelConfig) -> ClusterProfile {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut kernel = Kernel::new(config).unwrap();
    let cpu = kernel.add_model(CpuModel::new());
    let net = kernel.add_model(NetworkModel::new());
    let backbone = kernel
        .with_model::<NetworkModel, _>(net, |m, ctx| {
            m.add_link(ctx, "backbone", 1e9, 1e-4, SharingPolicy::Shared)
        })
        .unwrap();

    let mut actions = Vec::with_capacity(hosts * jobs * 2);
    for h in 0..hosts {
        let power = rng.random_range(1e8..1e9);
        let host = kernel
            .with_model::<CpuModel, _>(cpu, |m, ctx| m.add_host(ctx, format!("host-{h}"), power))
            .unwrap();
        let uplink = kernel
            .with_model::<NetworkModel, _>(net, |m, ctx| {
                m.add_link(ctx, format!("uplink-{h}"), 1.25e8, 5e-5, SharingPolicy::Shared)
            })
            .unwrap();
        for _ in 0..jobs {
            let flops = rng.random_range(1e8..1e10);
            let bytes = rng.random_range(1e5..1e8);
            actions.push(
                kernel
                    .with_model::<CpuModel, _>(cpu, |m, ctx| m.execute(ctx, host, flops))
                    .unwrap(),
            );
            actions.push(
                kernel
                    .with_model::<NetworkModel, _>(net, |m, ctx| {
                        m.communicate(ctx, &[uplink, backbone], bytes, None)
                    })
                    .unwrap(),
            );
        }
    }
    ClusterProfile {
        kernel,
        cpu,
        net,
        actions,
    }
}
