//! Attribute dependency graph.
//!
//! Derived attributes read other attributes. `AttributeGraph` holds those
//! reads as edges and yields an evaluation order where every input comes
//! before the attributes computed from it.

use crate::attribute::AttributePath;
use crate::error::EffectError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Dependencies between attribute paths.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::{AttributeGraph, AttributePath};
///
/// let level = AttributePath::from_str("details.level");
/// let hp_max = AttributePath::from_str("resources.hp.max");
///
/// let mut graph = AttributeGraph::new();
/// graph.add_dependency(hp_max.clone(), level.clone());
///
/// let order = graph.evaluation_order().unwrap();
/// assert_eq!(order, vec![level, hp_max]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AttributeGraph {
    graph: DiGraph<AttributePath, ()>,
    nodes: HashMap<AttributePath, NodeIndex>,
}

impl AttributeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path` as a node, returning its index. Adding twice is a no-op.
    pub fn add_node(&mut self, path: AttributePath) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&path) {
            return idx;
        }
        let idx = self.graph.add_node(path.clone());
        self.nodes.insert(path, idx);
        idx
    }

    /// Record that `dependent` is computed from `input`.
    pub fn add_dependency(&mut self, dependent: AttributePath, input: AttributePath) {
        let dependent = self.add_node(dependent);
        let input = self.add_node(input);
        self.graph.update_edge(input, dependent, ());
    }

    pub fn contains(&self, path: &AttributePath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Direct inputs of `path`.
    pub fn inputs(&self, path: &AttributePath) -> Vec<AttributePath> {
        self.nodes
            .get(path)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fail with the closed loop (`a -> b -> a`) if any cycle exists.
    pub fn detect_cycles(&self) -> Result<(), EffectError> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut trail = Vec::new();
        for node in self.graph.node_indices() {
            if visited.contains(&node) {
                continue;
            }
            if let Some(path) = self.find_cycle(node, &mut visited, &mut on_stack, &mut trail) {
                return Err(EffectError::Cycle { path });
            }
        }
        Ok(())
    }

    fn find_cycle(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        on_stack: &mut HashSet<NodeIndex>,
        trail: &mut Vec<NodeIndex>,
    ) -> Option<Vec<AttributePath>> {
        visited.insert(node);
        on_stack.insert(node);
        trail.push(node);

        for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
            if on_stack.contains(&next) {
                let start = trail.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<AttributePath> =
                    trail[start..].iter().map(|&n| self.graph[n].clone()).collect();
                cycle.push(self.graph[next].clone());
                return Some(cycle);
            }
            if !visited.contains(&next) {
                if let Some(cycle) = self.find_cycle(next, visited, on_stack, trail) {
                    return Some(cycle);
                }
            }
        }

        on_stack.remove(&node);
        trail.pop();
        None
    }

    /// All nodes, inputs first.
    pub fn evaluation_order(&self) -> Result<Vec<AttributePath>, EffectError> {
        self.detect_cycles()?;
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx].clone()).collect())
            .map_err(|cycle| EffectError::Cycle {
                path: vec![self.graph[cycle.node_id()].clone()],
            })
    }
}
