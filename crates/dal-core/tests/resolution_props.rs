//! Resolution Property Tests
//!
//! Fixed-point and monotonicity properties over random acyclic graphs.

use dal_core::{resolve, ComponentId, ConfigGraph, GraphBuilder, ResolverConfig, SetRule};
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy)]
enum Kind {
    Plain,
    And,
    Or,
}

fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Kind::Plain), Just(Kind::And), Just(Kind::Or)]
}

/// Acyclic graph: component `i` may only contain components with a higher index.
/// Every resource set is a top-level application of session `R`.
fn build(kinds: &[Kind], edges: &[(usize, usize)], seeds: &[usize]) -> ConfigGraph {
    let n = kinds.len();
    let name = |i: usize| format!("C{i}");
    let names: Vec<String> = (0..n).map(name).collect();

    let mut members: Vec<Vec<&str>> = vec![Vec::new(); n];
    for &(from, to) in edges {
        let (from, to) = (from % n, to % n);
        if from < to && !matches!(kinds[from], Kind::Plain) && !members[from].contains(&names[to].as_str()) {
            members[from].push(&names[to]);
        }
    }

    let apps: Vec<&str> = (0..n)
        .filter(|&i| !matches!(kinds[i], Kind::Plain))
        .map(|i| names[i].as_str())
        .collect();
    let disabled: Vec<&str> = seeds.iter().map(|&i| names[i % n].as_str()).collect();

    let mut b = GraphBuilder::new();
    b.session("R", &[], &apps, &disabled);
    for (i, k) in kinds.iter().enumerate() {
        match k {
            Kind::Plain => b.plain(&names[i]),
            Kind::And => b.and_set(&names[i], &members[i]),
            Kind::Or => b.or_set(&names[i], &members[i]),
        };
    }
    b.build().unwrap()
}

fn graph_strategy() -> impl Strategy<Value = ConfigGraph> {
    (1..16usize)
        .prop_flat_map(|n| {
            (
                proptest::collection::vec(kind(), n),
                proptest::collection::vec((0..n, 0..n), 0..40),
                proptest::collection::vec(0..n, 0..4),
            )
        })
        .prop_map(|(kinds, edges, seeds)| build(&kinds, &edges, &seeds))
}

proptest! {
    #[test]
    fn prop_resolution_is_a_closed_fixed_point(graph in graph_strategy()) {
        let root = graph.find("R").unwrap();
        let none = BTreeSet::new();
        let config = ResolverConfig::default();

        let first = resolve(&graph, root, &none, &none, &config).unwrap();
        let second = resolve(&graph, root, &none, &none, &config).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.stats().converged);

        for &seed in graph.disabled(root) {
            prop_assert!(first.is_disabled(seed));
        }

        for id in graph.ids() {
            let members = graph.contains(id);
            let any = members.iter().any(|m| first.is_disabled(*m));
            let all = !members.is_empty() && members.iter().all(|m| first.is_disabled(*m));
            match graph.component(id).and_then(|c| c.set_rule()) {
                Some(SetRule::Or) if any => prop_assert!(first.is_disabled(id)),
                Some(SetRule::And) if all => prop_assert!(first.is_disabled(id)),
                _ => {}
            }
            if first.is_disabled(id) {
                for m in members {
                    prop_assert!(first.is_disabled(*m));
                }
            }
        }
    }

    #[test]
    fn prop_user_enabled_only_shrinks_result(graph in graph_strategy(), pick in 0..16u32) {
        let root = graph.find("R").unwrap();
        let config = ResolverConfig::default();
        let none = BTreeSet::new();
        let enabled: BTreeSet<ComponentId> = graph.disabled(root).iter().copied().filter(|c| c.0 % 16 <= pick).collect();

        let full = resolve(&graph, root, &none, &none, &config).unwrap();
        let reduced = resolve(&graph, root, &none, &enabled, &config).unwrap();
        for id in reduced.iter() {
            prop_assert!(full.is_disabled(id));
        }
    }
}
