// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Priority assignment over the connectivity graph of sibling accessors.
//!
//! Every contained accessor of a composite gets an integer priority. Lower numbers react
//! first within a macro-step. Priorities are unique among siblings and strictly increase
//! along every non-spontaneous connection from an output of one sibling to an input of
//! another, so an upstream accessor always completes its reaction before a downstream
//! accessor observes its output.
//!
//! # Algorithm
//!
//! 1. **Causality check**: a three-colour DFS over the edges. A back edge is a directed
//!    cycle with no spontaneous break and is reported with its full path before any
//!    priority is committed.
//! 2. **Propagation**: accessors are visited in container order. Each one that has no
//!    priority yet starts a new component at an offset of `4 * n * component`, then
//!    implied priorities flow upstream (nearest unused smaller value) and downstream
//!    (nearest unused larger value). Neighbours that already have a priority on the
//!    wrong side are moved and their own neighbours are revisited.
//! 3. **Relaxation**: every edge is re-checked until no priority changes.
//!
//! The graph is acyclic after step 1, so both propagation and relaxation terminate.
//! Given the same node order and edge order the result is always the same.
//!
//! # Examples
//!
//! ```rust
//! use swarmlet::engine::PriorityGraph;
//!
//! let mut graph = PriorityGraph::new(vec!["a".into(), "b".into(), "c".into()]);
//! graph.add_edge(2, 0);
//! graph.add_edge(0, 1);
//!
//! let priorities = graph.assign().unwrap();
//! assert!(priorities[2] < priorities[0]);
//! assert!(priorities[0] < priorities[1]);
//! ```

use std::collections::BTreeSet;

use crate::errors::{EngineError, EngineResult};

/// Directed graph of sibling accessors, edges pointing downstream.
#[derive(Debug, Clone)]
pub struct PriorityGraph {
    names: Vec<String>,
    downstream: Vec<Vec<usize>>,
    upstream: Vec<Vec<usize>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Colour {
    White,
    Gray,
    Black,
}

impl PriorityGraph {
    pub fn new(names: Vec<String>) -> Self {
        let n = names.len();
        Self {
            names,
            downstream: vec![Vec::new(); n],
            upstream: vec![Vec::new(); n],
        }
    }

    /// Record that `from` must react before `to`. Duplicate edges are ignored.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        if self.downstream[from].contains(&to) {
            return;
        }
        self.downstream[from].push(to);
        self.upstream[to].push(from);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.downstream.iter().map(Vec::len).sum()
    }

    /// The first directed cycle found, as a closed path of names.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut colours = vec![Colour::White; self.len()];
        let mut path = Vec::new();

        for start in 0..self.len() {
            if colours[start] == Colour::White {
                if let Some(cycle) = self.dfs_cycle(start, &mut colours, &mut path) {
                    return Some(cycle.into_iter().map(|i| self.names[i].clone()).collect());
                }
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        node: usize,
        colours: &mut [Colour],
        path: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        colours[node] = Colour::Gray;
        path.push(node);

        for &next in &self.downstream[node] {
            match colours[next] {
                Colour::White => {
                    if let Some(cycle) = self.dfs_cycle(next, colours, path) {
                        return Some(cycle);
                    }
                }
                Colour::Gray => {
                    let cycle_start = path.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle = path[cycle_start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Colour::Black => {}
            }
        }

        colours[node] = Colour::Black;
        path.pop();
        None
    }

    /// Compute priorities, indexed like the node names.
    pub fn assign(&self) -> EngineResult<Vec<i64>> {
        if let Some(cycle) = self.find_cycle() {
            let accessor = cycle.first().cloned().unwrap_or_default();
            return Err(EngineError::CausalityLoop { accessor, cycle });
        }

        let mut assignment = Assignment {
            graph: self,
            priorities: vec![None; self.len()],
            used: BTreeSet::new(),
        };

        let stride = 4 * self.len() as i64;
        let mut component = 0i64;
        for node in 0..self.len() {
            if assignment.priorities[node].is_some() {
                continue;
            }
            let start = assignment.next_at_or_above(component * stride);
            assignment.set(node, start);
            assignment.propagate_upstream(node);
            assignment.propagate_downstream(node);
            component += 1;
        }

        assignment.relax();

        Ok(assignment
            .priorities
            .into_iter()
            .map(|priority| priority.unwrap_or_default())
            .collect())
    }
}

struct Assignment<'a> {
    graph: &'a PriorityGraph,
    priorities: Vec<Option<i64>>,
    used: BTreeSet<i64>,
}

impl Assignment<'_> {
    fn set(&mut self, node: usize, priority: i64) {
        if let Some(old) = self.priorities[node].replace(priority) {
            self.used.remove(&old);
        }
        self.used.insert(priority);
    }

    fn next_at_or_above(&self, mut value: i64) -> i64 {
        while self.used.contains(&value) {
            value += 1;
        }
        value
    }

    fn next_below(&self, value: i64) -> i64 {
        let mut candidate = value - 1;
        while self.used.contains(&candidate) {
            candidate -= 1;
        }
        candidate
    }

    fn propagate_downstream(&mut self, node: usize) {
        let Some(mine) = self.priorities[node] else {
            return;
        };
        for &next in &self.graph.downstream[node] {
            match self.priorities[next] {
                Some(theirs) if theirs > mine => continue,
                _ => {
                    let raised = self.next_at_or_above(mine + 1);
                    self.set(next, raised);
                    self.propagate_downstream(next);
                }
            }
        }
    }

    fn propagate_upstream(&mut self, node: usize) {
        let Some(mine) = self.priorities[node] else {
            return;
        };
        for &previous in &self.graph.upstream[node] {
            match self.priorities[previous] {
                Some(theirs) if theirs < mine => continue,
                _ => {
                    let lowered = self.next_below(mine);
                    self.set(previous, lowered);
                    self.propagate_upstream(previous);
                }
            }
        }
    }

    fn relax(&mut self) {
        loop {
            let mut changed = false;
            for from in 0..self.graph.len() {
                for &to in &self.graph.downstream[from] {
                    let (Some(upstream), Some(downstream)) =
                        (self.priorities[from], self.priorities[to])
                    else {
                        continue;
                    };
                    if downstream <= upstream {
                        let raised = self.next_at_or_above(upstream + 1);
                        self.set(to, raised);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn graph(names: &[&str], edges: &[(usize, usize)]) -> PriorityGraph {
        let mut graph = PriorityGraph::new(names.iter().map(|s| s.to_string()).collect());
        for &(from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    fn assert_valid(graph: &PriorityGraph, priorities: &[i64]) {
        let unique: HashSet<_> = priorities.iter().collect();
        assert_eq!(unique.len(), priorities.len(), "priorities not unique: {:?}", priorities);
        for from in 0..graph.len() {
            for &to in &graph.downstream[from] {
                assert!(
                    priorities[from] < priorities[to],
                    "edge {} -> {} violated: {:?}",
                    from,
                    to,
                    priorities
                );
            }
        }
    }

    #[test]
    fn test_empty_graph() {
        let graph = graph(&[], &[]);
        assert!(graph.assign().unwrap().is_empty());
    }

    #[test]
    fn test_valid_shapes() {
        let cases: Vec<(&str, Vec<&str>, Vec<(usize, usize)>)> = vec![
            ("single", vec!["a"], vec![]),
            ("linear chain", vec!["a", "b", "c"], vec![(0, 1), (1, 2)]),
            ("reverse chain", vec!["c", "b", "a"], vec![(2, 1), (1, 0)]),
            ("diamond", vec!["a", "b", "c", "d"], vec![(0, 1), (0, 2), (1, 3), (2, 3)]),
            ("fan in", vec!["x", "y", "z", "sink"], vec![(0, 3), (1, 3), (2, 3)]),
            (
                "late join",
                vec!["a", "b", "c", "d"],
                vec![(0, 1), (2, 3), (3, 1), (2, 0)],
            ),
            ("disconnected", vec!["a", "b", "c", "d"], vec![(0, 1), (2, 3)]),
        ];

        for (label, names, edges) in cases {
            let graph = graph(&names, &edges);
            let priorities = graph.assign().unwrap_or_else(|e| panic!("{}: {}", label, e));
            assert_valid(&graph, &priorities);
        }
    }

    #[test]
    fn test_first_node_starts_at_zero() {
        let graph = graph(&["a", "b"], &[(0, 1)]);
        assert_eq!(graph.assign().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_components_start_at_offsets() {
        let graph = graph(&["a", "b", "c"], &[]);
        assert_eq!(graph.assign().unwrap(), vec![0, 12, 24]);
    }

    #[test]
    fn test_upstream_gets_lower_values() {
        let graph = graph(&["sink", "source"], &[(1, 0)]);
        assert_eq!(graph.assign().unwrap(), vec![0, -1]);
    }

    #[test]
    fn test_assignment_is_deterministic() {
        let graph = graph(
            &["a", "b", "c", "d", "e"],
            &[(0, 2), (1, 2), (2, 3), (4, 3), (1, 4)],
        );
        let first = graph.assign().unwrap();
        for _ in 0..5 {
            assert_eq!(graph.assign().unwrap(), first);
        }
    }

    #[test]
    fn test_simple_cycle() {
        let graph = graph(&["a", "b"], &[(0, 1), (1, 0)]);
        match graph.assign() {
            Err(EngineError::CausalityLoop { accessor, cycle }) => {
                assert_eq!(accessor, "a");
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("expected causality loop, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop_cycle() {
        let graph = graph(&["a"], &[(0, 0)]);
        assert_eq!(graph.find_cycle(), Some(vec!["a".to_string(), "a".to_string()]));
    }

    #[test]
    fn test_cycle_deep_in_graph() {
        let graph = graph(&["a", "b", "c", "d"], &[(0, 1), (1, 2), (2, 3), (3, 1)]);
        assert_eq!(
            graph.find_cycle(),
            Some(vec![
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
                "b".to_string()
            ])
        );
    }

    #[test]
    fn test_duplicate_edges_ignored() {
        let graph = graph(&["a", "b"], &[(0, 1), (0, 1)]);
        assert_eq!(graph.edge_count(), 1);
    }
}
