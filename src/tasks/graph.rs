//! Task dependency graph.
//!
//! Edges point from a task to the tasks it depends on. The graph answers two
//! questions: whether the dependencies contain a cycle (reported as the full
//! chain, e.g. `a -> b -> a`) and in which order a task and its transitive
//! dependencies must run.

use crate::core::PaddleError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node and its dependencies have been fully visited.
    Black,
}

/// Directed graph of task ids.
#[derive(Debug, Default)]
pub struct TaskGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(id) {
            index
        } else {
            let index = self.graph.add_node(id.to_string());
            self.node_map.insert(id.to_string(), index);
            index
        }
    }

    /// Adds a task without dependencies.
    pub fn add_task(&mut self, id: &str) {
        self.ensure_node(id);
    }

    /// Records that `from` depends on `to`.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Direct dependencies in declaration order.
    fn dependencies(&self, node: NodeIndex) -> Vec<NodeIndex> {
        // petgraph yields the most recently added edge first
        let mut deps: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        deps.reverse();
        deps
    }

    /// Checks the whole graph for cycles.
    ///
    /// # Errors
    ///
    /// Returns [`PaddleError::CircularDependency`] with the first cycle found.
    pub fn detect_cycles(&self) -> Result<(), PaddleError> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|node| (node, Color::White)).collect();
        let mut path = Vec::new();
        let mut order = Vec::new();

        for node in self.graph.node_indices() {
            if colors.get(&node) == Some(&Color::White) {
                self.dfs_visit(node, &mut colors, &mut path, &mut order)?;
            }
        }
        Ok(())
    }

    /// The order in which `root` and its transitive dependencies run.
    ///
    /// Every dependency comes before its dependents, siblings keep their
    /// declared order and `root` is last. Each id appears once.
    ///
    /// # Errors
    ///
    /// - [`PaddleError::TaskNotFound`] if `root` is not in the graph
    /// - [`PaddleError::CircularDependency`] if a cycle is reachable from `root`
    pub fn execution_order(&self, root: &str) -> Result<Vec<String>, PaddleError> {
        let &start = self.node_map.get(root).ok_or_else(|| PaddleError::TaskNotFound {
            id: root.to_string(),
        })?;

        let mut colors: HashMap<NodeIndex, Color> = HashMap::new();
        let mut path = Vec::new();
        let mut order = Vec::new();
        self.dfs_visit(start, &mut colors, &mut path, &mut order)?;
        Ok(order.into_iter().map(|node| self.graph[node].clone()).collect())
    }

    /// All tasks, dependencies before dependents.
    ///
    /// # Errors
    ///
    /// Returns [`PaddleError::CircularDependency`] if the graph has a cycle.
    pub fn topological_order(&self) -> Result<Vec<String>, PaddleError> {
        self.detect_cycles()?;

        let indices = toposort(&self.graph, None).map_err(|cycle| {
            PaddleError::CircularDependency {
                chain: self.graph[cycle.node_id()].clone(),
            }
        })?;
        Ok(indices.into_iter().rev().map(|node| self.graph[node].clone()).collect())
    }

    /// Post-order DFS that appends finished nodes to `order` and fails on
    /// reaching a node still on the stack.
    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
        order: &mut Vec<NodeIndex>,
    ) -> Result<(), PaddleError> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for dependency in self.dependencies(node) {
            match colors.get(&dependency).copied().unwrap_or(Color::White) {
                Color::Gray => {
                    let start = path.iter().position(|&n| n == dependency).unwrap_or(0);
                    let mut chain: Vec<&str> =
                        path[start..].iter().map(|&n| self.graph[n].as_str()).collect();
                    chain.push(self.graph[dependency].as_str());
                    return Err(PaddleError::CircularDependency {
                        chain: chain.join(" -> "),
                    });
                }
                Color::White => self.dfs_visit(dependency, colors, path, order)?,
                Color::Black => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        order.push(node);
        Ok(())
    }
}
