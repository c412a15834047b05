//! Cycle detection over one relation family.
//!
//! Edges are loaded into a petgraph `DiGraph` and split into strongly
//! connected components with Tarjan's algorithm. A component is a cycle when
//! it has more than one node, or one node with an edge to itself. Each cycle
//! is reported once, however many edges it contains.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

/// A strongly connected component that forms a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// Node ids in the component, sorted.
    pub members: Vec<String>,
}

impl Cycle {
    /// Smallest member id, used as the node a violation is reported on.
    pub fn anchor(&self) -> &str {
        self.members.first().map(String::as_str).unwrap_or_default()
    }
}

/// Find every cycle among `edges` (source, target). Sorted by anchor.
pub fn find_cycles<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<Cycle> {
    let mut graph: DiGraph<&'a str, ()> = DiGraph::new();
    let mut index: HashMap<&'a str, NodeIndex> = HashMap::new();
    let mut node = |graph: &mut DiGraph<&'a str, ()>, id: &'a str| {
        *index.entry(id).or_insert_with(|| graph.add_node(id))
    };
    for (source, target) in edges {
        let a = node(&mut graph, source);
        let b = node(&mut graph, target);
        graph.update_edge(a, b, ());
    }

    let mut cycles: Vec<Cycle> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => graph.contains_edge(*single, *single),
            _ => true,
        })
        .map(|component| {
            let mut members: Vec<String> =
                component.iter().map(|&i| graph[i].to_string()).collect();
            members.sort();
            Cycle { members }
        })
        .collect();
    cycles.sort_by(|a, b| a.members.cmp(&b.members));
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let edges = [("a", "b"), ("b", "c"), ("a", "c")];
        assert!(find_cycles(edges).is_empty());
    }

    #[test]
    fn three_cycle_is_reported_once() {
        let edges = [("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")];
        let cycles = find_cycles(edges);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].members, vec!["a", "b", "c"]);
        assert_eq!(cycles[0].anchor(), "a");
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let cycles = find_cycles([("x", "x"), ("x", "y")]);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].members, vec!["x"]);
    }

    #[test]
    fn disjoint_cycles_are_separate() {
        let edges = [("a", "b"), ("b", "a"), ("c", "d"), ("d", "c")];
        assert_eq!(find_cycles(edges).len(), 2);
    }
}
