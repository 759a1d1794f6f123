//! Property tests over randomly wired systems.

use proptest::prelude::*;
use weir_core::{ConstraintId, VariableId, EPSILON};
use weir_lmm::{MaxMinSystem, SharingPolicy, SolverConfig};

#[derive(Clone, Debug)]
enum Mutation {
    ConstraintBound(usize, f64),
    Weight(usize, f64),
    VariableBound(usize, Option<f64>),
    Disable(usize),
    Enable(usize),
    Expand(usize, usize, f64),
    ExpandAdd(usize, usize, f64),
}

#[derive(Clone, Debug)]
struct Wiring {
    constraints: Vec<(f64, bool)>,
    variables: Vec<(f64, Option<f64>)>,
    elements: Vec<(usize, usize, f64)>,
    mutations: Vec<Mutation>,
}

fn weight() -> impl Strategy<Value = f64> {
    prop_oneof![1 => Just(0.0), 4 => 0.1f64..4.0]
}

fn mutation(nc: usize, nv: usize) -> impl Strategy<Value = Mutation> {
    prop_oneof![
        (0..nc, 0.0f64..100.0).prop_map(|(c, b)| Mutation::ConstraintBound(c, b)),
        (0..nv, weight()).prop_map(|(v, w)| Mutation::Weight(v, w)),
        (0..nv, prop::option::of(0.0f64..50.0)).prop_map(|(v, b)| Mutation::VariableBound(v, b)),
        (0..nv).prop_map(Mutation::Disable),
        (0..nv).prop_map(Mutation::Enable),
        (0..nc, 0..nv, 0.0f64..3.0).prop_map(|(c, v, k)| Mutation::Expand(c, v, k)),
        (0..nc, 0..nv, 0.0f64..1.0).prop_map(|(c, v, k)| Mutation::ExpandAdd(c, v, k)),
    ]
}

fn wiring() -> impl Strategy<Value = Wiring> {
    (1usize..6, 1usize..9)
        .prop_flat_map(|(nc, nv)| {
            (
                prop::collection::vec((0.0f64..100.0, any::<bool>()), nc),
                prop::collection::vec((weight(), prop::option::of(0.0f64..50.0)), nv),
                prop::collection::vec((0..nc, 0..nv, 0.0f64..3.0), 0..(nc * nv)),
                prop::collection::vec(mutation(nc, nv), 0..12),
            )
        })
        .prop_map(|(constraints, variables, elements, mutations)| Wiring {
            constraints,
            variables,
            elements,
            mutations,
        })
}

struct Built {
    sys: MaxMinSystem,
    cnsts: Vec<ConstraintId>,
    vars: Vec<VariableId>,
}

fn build(w: &Wiring, config: SolverConfig) -> Built {
    let mut sys = MaxMinSystem::new(config);
    let cnsts: Vec<_> = w
        .constraints
        .iter()
        .map(|&(bound, fatpipe)| {
            let policy = if fatpipe {
                SharingPolicy::Fatpipe
            } else {
                SharingPolicy::Shared
            };
            sys.new_constraint(bound, policy).unwrap()
        })
        .collect();
    let vars: Vec<_> = w
        .variables
        .iter()
        .map(|&(weight, bound)| sys.new_variable(weight, bound, 2).unwrap())
        .collect();
    for &(c, v, k) in &w.elements {
        sys.expand(cnsts[c], vars[v], k).unwrap();
    }
    Built { sys, cnsts, vars }
}

fn apply(b: &mut Built, m: &Mutation) {
    match *m {
        Mutation::ConstraintBound(c, bound) => b.sys.update_constraint_bound(b.cnsts[c], bound).unwrap(),
        Mutation::Weight(v, w) => b.sys.update_variable_weight(b.vars[v], w).unwrap(),
        Mutation::VariableBound(v, bound) => b.sys.update_variable_bound(b.vars[v], bound).unwrap(),
        Mutation::Disable(v) => b.sys.disable_variable(b.vars[v]).unwrap(),
        Mutation::Enable(v) => b.sys.enable_variable(b.vars[v]).unwrap(),
        Mutation::Expand(c, v, k) => b.sys.expand(b.cnsts[c], b.vars[v], k).unwrap(),
        Mutation::ExpandAdd(c, v, k) => b.sys.expand_add(b.cnsts[c], b.vars[v], k).unwrap(),
    }
}

fn value_bits(b: &mut Built) -> Vec<u64> {
    let vars = b.vars.clone();
    vars.iter().map(|&v| b.sys.value(v).unwrap().to_bits()).collect()
}

fn check_invariants(b: &mut Built) -> Result<(), TestCaseError> {
    b.sys.solve();
    let mut consumed = vec![Vec::new(); b.cnsts.len()];
    for &v in &b.vars {
        let value = b.sys.solved_value(v).unwrap();
        if b.sys.is_disabled(v).unwrap() {
            prop_assert_eq!(value, 0.0);
            continue;
        }
        prop_assert!(value >= 0.0);
        prop_assert!(value == 0.0 || value >= EPSILON, "unsnapped value {}", value);
        if let Some(bound) = b.sys.variable_bound(v).unwrap() {
            prop_assert!(value <= bound + EPSILON, "value {} over own bound {}", value, bound);
        }
        for e in b.sys.elements(v).unwrap() {
            let ci = b.cnsts.iter().position(|&c| c == e.constraint).unwrap();
            consumed[ci].push(e.coefficient * value);
        }
    }
    for (ci, &c) in b.cnsts.iter().enumerate() {
        let bound = b.sys.constraint_bound(c).unwrap();
        let total = match b.sys.constraint_policy(c).unwrap() {
            SharingPolicy::Shared => consumed[ci].iter().sum::<f64>(),
            SharingPolicy::Fatpipe => consumed[ci].iter().cloned().fold(0.0, f64::max),
        };
        prop_assert!(total <= bound + EPSILON, "constraint {} uses {} of {}", ci, total, bound);
        prop_assert!(b.sys.usage(c).unwrap() <= bound + EPSILON);
    }
    Ok(())
}

proptest! {
    #[test]
    fn capacities_and_bounds_hold(w in wiring()) {
        let mut b = build(&w, SolverConfig::default());
        check_invariants(&mut b)?;
        for m in &w.mutations {
            apply(&mut b, m);
            check_invariants(&mut b)?;
        }
    }

    #[test]
    fn selective_update_matches_full_solve(w in wiring()) {
        let mut full = build(&w, SolverConfig::default());
        let mut selective = build(&w, SolverConfig::selective());
        prop_assert_eq!(value_bits(&mut full), value_bits(&mut selective));
        for m in &w.mutations {
            apply(&mut full, m);
            apply(&mut selective, m);
            prop_assert_eq!(value_bits(&mut full), value_bits(&mut selective));
        }
    }

    #[test]
    fn solving_twice_changes_nothing(w in wiring()) {
        let mut b = build(&w, SolverConfig::default());
        let first = value_bits(&mut b);
        b.sys.solve();
        prop_assert_eq!(first, value_bits(&mut b));
    }

    #[test]
    fn equal_weights_on_one_constraint_share_equally(
        bound in 0.0f64..1000.0,
        n in 1usize..10,
    ) {
        let mut sys = MaxMinSystem::default();
        let c = sys.new_constraint(bound, SharingPolicy::Shared).unwrap();
        let vars: Vec<_> = (0..n)
            .map(|_| {
                let v = sys.new_variable(1.0, None, 1).unwrap();
                sys.expand(c, v, 1.0).unwrap();
                v
            })
            .collect();
        let first = sys.value(vars[0]).unwrap();
        for &v in &vars[1..] {
            prop_assert_eq!(sys.value(v).unwrap(), first);
        }
    }
}
