//! Testing utilities for DAL workspace
//!
//! Shared graph fixtures and lookup helpers.

#![allow(missing_docs)]

use dal_core::{ComponentId, ConfigGraph, ConfigStore, GraphBuilder, Resolution};
use std::sync::Arc;

/// Session `R` with segment `S` holding AND-set `N = {O, B}`, `O = OR{A}`,
/// and `A` persisted disabled.
pub fn scenario_builder() -> GraphBuilder {
    let mut b = GraphBuilder::new();
    b.session("R", &["S"], &[], &["A"])
        .segment("S", &[], &["N"], &[])
        .and_set("N", &["O", "B"])
        .or_set("O", &["A"])
        .plain("A")
        .plain("B");
    b
}

pub fn scenario_graph() -> ConfigGraph {
    scenario_builder().build().unwrap()
}

pub fn store_of(builder: GraphBuilder) -> Arc<ConfigStore> {
    Arc::new(ConfigStore::from_graph(builder.build().unwrap()))
}

pub fn scenario_store() -> Arc<ConfigStore> {
    store_of(scenario_builder())
}

/// Session `R` over the segment chain `S0 > S1 > ... > S{len-1}`; the last
/// segment holds application `X`, which is persisted disabled.
/// With `cyclic` the last segment also nests `S0`.
pub fn segment_chain(len: usize, cyclic: bool) -> GraphBuilder {
    assert!(len > 0);
    let names: Vec<String> = (0..len).map(|i| format!("S{i}")).collect();
    let mut b = GraphBuilder::new();
    b.session("R", &["S0"], &[], &["X"]).plain("X");
    for i in 0..len {
        let next: Vec<&str> = if i + 1 < len {
            vec![names[i + 1].as_str()]
        } else if cyclic {
            vec!["S0"]
        } else {
            vec![]
        };
        let apps: &[&str] = if i + 1 == len { &["X"] } else { &[] };
        b.segment(&names[i], &next, apps, &[]);
    }
    b
}

/// Session `R` with top-level OR-sets `O0 > O1 > ... > O{len-1} > A`,
/// `A` persisted disabled.
pub fn or_chain(len: usize) -> GraphBuilder {
    let names: Vec<String> = (0..len).map(|i| format!("O{i}")).collect();
    let mut b = GraphBuilder::new();
    b.session("R", &[], &["O0"], &["A"]).plain("A");
    for i in 0..len {
        let member = names.get(i + 1).map_or("A", String::as_str);
        b.or_set(&names[i], &[member]);
    }
    b
}

pub fn id(graph: &ConfigGraph, uid: &str) -> ComponentId {
    graph
        .find(uid)
        .unwrap_or_else(|| panic!("no component {uid}"))
}

pub fn ids(graph: &ConfigGraph, uids: &[&str]) -> Vec<ComponentId> {
    uids.iter().map(|u| id(graph, u)).collect()
}

/// Sorted uids of a resolution
pub fn disabled_uids(graph: &ConfigGraph, resolution: &Resolution) -> Vec<String> {
    let mut out: Vec<String> = resolution.iter().map(|c| graph.uid(c)).collect();
    out.sort();
    out
}

/// JSON document of the scenario graph with explicit classes
pub const SCENARIO_JSON: &str = r#"{
  "components": [
    { "uid": "R", "kind": "session", "segments": ["S"], "disabled": ["A"] },
    { "uid": "S", "kind": "segment", "applications": ["N"] },
    { "uid": "N", "kind": "resource_set_and", "contains": ["O", "B"] },
    { "uid": "O", "kind": "resource_set_or", "contains": ["A"] },
    { "uid": "A", "class": "Application" },
    { "uid": "B", "class": "Application" }
  ]
}"#;
