//! Containment graph diagnostics
//!
//! Offline checks over a whole snapshot. Cycles are reported, never repaired.

use crate::graph::{ConfigGraph, Relationship};
use crate::types::ComponentId;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graphmap::DiGraphMap;

/// Directed containment graph: an edge runs from a container to each child
///
/// Persisted disabled lists are not containment and are left out.
#[must_use]
pub fn containment_graph(graph: &ConfigGraph) -> DiGraphMap<ComponentId, Relationship> {
    let mut g = DiGraphMap::new();
    for id in graph.ids() {
        g.add_node(id);
        let edges = [
            (Relationship::Contains, graph.contains(id)),
            (Relationship::Segments, graph.segments(id)),
            (Relationship::Applications, graph.applications(id)),
            (Relationship::Resources, graph.resources(id)),
        ];
        for (relationship, children) in edges {
            for &child in children {
                g.add_edge(id, child, relationship);
            }
        }
    }
    g
}

/// True if any container reaches itself
#[must_use]
pub fn has_containment_cycle(graph: &ConfigGraph) -> bool {
    is_cyclic_directed(&containment_graph(graph))
}

/// Every strongly connected set of mutually containing components
///
/// Each cycle is sorted by id and the list is sorted by its first member.
#[must_use]
pub fn containment_cycles(graph: &ConfigGraph) -> Vec<Vec<ComponentId>> {
    let g = containment_graph(graph);
    let mut cycles: Vec<Vec<ComponentId>> = tarjan_scc(&g)
        .into_iter()
        .filter(|scc| scc.len() > 1 || g.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort_unstable();
            scc
        })
        .collect();
    cycles.sort();
    cycles
}

/// Uids of `ids`, in order
#[must_use]
pub fn uids(graph: &ConfigGraph, ids: &[ComponentId]) -> Vec<String> {
    ids.iter().map(|&id| graph.uid(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn reports_self_loops_and_rings() {
        let mut b = GraphBuilder::new();
        b.session("R", &["S1", "S3"], &[], &[])
            .segment("S1", &["S2"], &[], &[])
            .segment("S2", &["S1"], &[], &[])
            .segment("S3", &["S3"], &["A"], &[])
            .plain("A");
        let g = b.build().unwrap();

        assert!(has_containment_cycle(&g));
        let cycles: Vec<_> = containment_cycles(&g).iter().map(|c| uids(&g, c)).collect();
        assert_eq!(cycles, vec![vec!["S1", "S2"], vec!["S3"]]);
    }

    #[test]
    fn dag_with_shared_children_is_clean() {
        let mut b = GraphBuilder::new();
        b.session("R", &[], &["O", "N"], &["A"])
            .or_set("O", &["A"])
            .and_set("N", &["O", "A"])
            .plain("A");
        let g = b.build().unwrap();

        assert!(!has_containment_cycle(&g));
        assert!(containment_cycles(&g).is_empty());
    }
}
