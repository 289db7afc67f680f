// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dirty tracking and update scheduling.
//!
//! Every node is either Clean or Dirty. Dirty nodes sit in an ordered
//! worklist; a node is ready once none of its producers is dirty. The drain
//! loop itself lives in [`Designer::update`](crate::designer::Designer::update),
//! which owns the renderer and the event queue, and uses the primitives here.

use crate::graph::Graph;
use crate::node::NodeId;
use indexmap::IndexSet;
use std::collections::HashSet;

/// Outcome of a dirty propagation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    /// Nodes that went from Clean to Dirty in this pass, in visit order
    pub newly_dirty: Vec<NodeId>,
    /// A node was reached again while its own downstream walk was open
    pub cycle_detected: bool,
}

/// Worklist of dirty nodes
#[derive(Debug, Clone, Default)]
pub struct UpdateScheduler {
    /// Dirty nodes in the order they were enqueued
    worklist: IndexSet<NodeId>,
}

impl UpdateScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the node is waiting to be recomputed
    pub fn is_dirty(&self, node_id: NodeId) -> bool {
        self.worklist.contains(&node_id)
    }

    /// Dirty nodes in worklist order
    pub fn worklist(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.worklist.iter().copied()
    }

    /// Number of dirty nodes
    pub fn len(&self) -> usize {
        self.worklist.len()
    }

    /// Whether every node is clean
    pub fn is_empty(&self) -> bool {
        self.worklist.is_empty()
    }

    /// Mark a node and its whole downstream cone dirty.
    ///
    /// Already-dirty nodes are not re-enqueued but their downstream is still
    /// walked. The walk is an explicit-stack DFS, so a cycle is reported
    /// instead of recursing forever.
    pub fn request_update(&mut self, graph: &mut Graph, node_id: NodeId) -> Propagation {
        let mut result = Propagation::default();
        let mut stack = vec![(node_id, false)];
        let mut on_path = HashSet::new();
        let mut done = HashSet::new();

        while let Some((id, finished)) = stack.pop() {
            if finished {
                on_path.remove(&id);
                done.insert(id);
                continue;
            }
            if done.contains(&id) {
                continue;
            }
            if on_path.contains(&id) {
                result.cycle_detected = true;
                continue;
            }

            let Some(node) = graph.node_mut(id) else {
                continue;
            };
            node.set_needs_update(true);
            if self.worklist.insert(id) {
                tracing::debug!(node = %id, "Node marked dirty");
                result.newly_dirty.push(id);
            }

            on_path.insert(id);
            stack.push((id, true));
            // Reversed so consumers are visited in connection order
            let downstream: Vec<NodeId> = graph.downstream_ids(id).into_iter().rev().collect();
            stack.extend(downstream.into_iter().map(|d| (d, false)));
        }

        if result.cycle_detected {
            tracing::warn!(node = %node_id, "Cycle found while propagating dirty state");
        }
        result
    }

    /// Whether every producer feeding `node_id` is clean
    pub fn is_ready(&self, graph: &Graph, node_id: NodeId) -> bool {
        graph
            .connections_into(node_id)
            .all(|c| !self.worklist.contains(&c.left_node_id))
    }

    /// First ready node in worklist order, skipping nodes `blocked` rejects
    pub fn next_ready(&self, graph: &Graph, blocked: impl Fn(NodeId) -> bool) -> Option<NodeId> {
        self.worklist
            .iter()
            .copied()
            .find(|&id| !blocked(id) && self.is_ready(graph, id))
    }

    /// Move a node to Clean
    pub fn mark_clean(&mut self, graph: &mut Graph, node_id: NodeId) {
        self.worklist.shift_remove(&node_id);
        if let Some(node) = graph.node_mut(node_id) {
            node.set_needs_update(false);
        }
    }

    /// Forget a node entirely (it left the graph)
    pub fn forget(&mut self, node_id: NodeId) {
        self.worklist.shift_remove(&node_id);
    }

    /// Dirty nodes that cannot progress because they are, or sit downstream
    /// of, one of the `blocked` nodes
    pub fn waiting_behind(&self, graph: &Graph, blocked: &HashSet<NodeId>) -> IndexSet<NodeId> {
        let mut waiting = IndexSet::new();
        let mut stack: Vec<NodeId> = self
            .worklist
            .iter()
            .copied()
            .filter(|id| blocked.contains(id))
            .collect();

        while let Some(id) = stack.pop() {
            if !waiting.insert(id) {
                continue;
            }
            stack.extend(
                graph
                    .downstream_ids(id)
                    .into_iter()
                    .filter(|d| self.worklist.contains(d)),
            );
        }

        // Report in worklist order
        self.worklist
            .iter()
            .copied()
            .filter(|id| waiting.contains(id))
            .collect()
    }
}

/// Error raised by the drain loop
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulingError {
    /// Dirty nodes remain but none can become ready
    #[error("Update stalled: {} node(s) can never become ready (cycle in graph)", stuck.len())]
    Deadlock {
        /// Nodes that cannot progress, in worklist order
        stuck: Vec<NodeId>,
    },

    /// The renderer failed; the node stays dirty
    #[error("Rendering node {node} failed: {message}")]
    Render {
        /// Node being rendered
        node: NodeId,
        /// Renderer message
        message: String,
    },
}
