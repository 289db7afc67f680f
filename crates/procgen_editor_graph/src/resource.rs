// SPDX-License-Identifier: MIT OR Apache-2.0
//! Asynchronous resource creation for nodes.
//!
//! A node that needs an external resource (an image, a font, an
//! out-of-process model) is not ready until its load resolves. Loads are
//! handed out as [`ResourceCompleter`]s that any task or thread can resolve;
//! completions travel back over a channel and are applied on the designer's
//! thread by [`Designer::poll_resources`](crate::designer::Designer::poll_resources).
//!
//! Every node gets a fresh generation when it joins the designer, so a
//! completion for a node that was removed (or removed and re-added) is
//! recognised as stale and dropped. Each load also gets its own number, and
//! only the node's latest load can resolve it.

use crate::node::NodeId;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Identifies one resource load of one node lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceTicket {
    /// Node waiting on the resource
    pub node_id: NodeId,
    /// Node generation when the load started
    pub generation: u64,
    /// Number of this load, unique per tracker
    pub load: u64,
}

/// Message sent back when a load resolves
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCompletion {
    /// Which load resolved
    pub ticket: ResourceTicket,
    /// `Err` carries a message for the UI
    pub outcome: Result<(), String>,
}

/// Handle used to resolve a pending load from anywhere
#[derive(Debug, Clone)]
pub struct ResourceCompleter {
    ticket: ResourceTicket,
    sender: UnboundedSender<ResourceCompletion>,
}

impl ResourceCompleter {
    /// Ticket of the load this handle resolves
    pub fn ticket(&self) -> ResourceTicket {
        self.ticket
    }

    /// Resolve the load. Returns `false` if the designer is gone.
    pub fn complete(self, outcome: Result<(), String>) -> bool {
        self.sender
            .send(ResourceCompletion {
                ticket: self.ticket,
                outcome,
            })
            .is_ok()
    }

    /// Resolve the load successfully
    pub fn succeed(self) -> bool {
        self.complete(Ok(()))
    }

    /// Resolve the load with a failure message
    pub fn fail(self, message: impl Into<String>) -> bool {
        self.complete(Err(message.into()))
    }
}

/// Effect of a completion that was still current
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedCompletion {
    /// Resource is available; the node should be re-dirtied
    Ready(NodeId),
    /// Resource failed; the node stays dirty
    Failed(NodeId, String),
}

/// Tracks node generations and in-flight loads
#[derive(Debug)]
pub struct ResourceTracker {
    next_generation: u64,
    next_load: u64,
    generations: HashMap<NodeId, u64>,
    pending: HashMap<NodeId, u64>,
    failed: IndexMap<NodeId, String>,
    sender: UnboundedSender<ResourceCompletion>,
    receiver: UnboundedReceiver<ResourceCompletion>,
}

impl ResourceTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            next_generation: 0,
            next_load: 0,
            generations: HashMap::new(),
            pending: HashMap::new(),
            failed: IndexMap::new(),
            sender,
            receiver,
        }
    }

    /// Give a node joining the designer a fresh generation
    pub fn register(&mut self, node_id: NodeId) -> u64 {
        self.next_generation += 1;
        self.generations.insert(node_id, self.next_generation);
        self.next_generation
    }

    /// Forget everything about a node leaving the designer
    pub fn unregister(&mut self, node_id: NodeId) {
        self.generations.remove(&node_id);
        self.pending.remove(&node_id);
        self.failed.shift_remove(&node_id);
    }

    /// Current generation of a live node
    pub fn generation(&self, node_id: NodeId) -> Option<u64> {
        self.generations.get(&node_id).copied()
    }

    /// Start a load for a live node, clearing any previous failure.
    ///
    /// Supersedes a load already in flight for the node: its completion is
    /// dropped when it arrives.
    pub fn begin(&mut self, node_id: NodeId) -> Option<ResourceCompleter> {
        let generation = self.generation(node_id)?;
        self.next_load += 1;
        let load = self.next_load;
        self.pending.insert(node_id, load);
        self.failed.shift_remove(&node_id);
        Some(ResourceCompleter {
            ticket: ResourceTicket {
                node_id,
                generation,
                load,
            },
            sender: self.sender.clone(),
        })
    }

    /// Whether the node has a load in flight
    pub fn is_pending(&self, node_id: NodeId) -> bool {
        self.pending.contains_key(&node_id)
    }

    /// Failure message of the node's last load
    pub fn failure(&self, node_id: NodeId) -> Option<&str> {
        self.failed.get(&node_id).map(String::as_str)
    }

    /// Whether the node cannot render because of its resource
    pub fn is_blocked(&self, node_id: NodeId) -> bool {
        self.is_pending(node_id) || self.failed.contains_key(&node_id)
    }

    /// All nodes that cannot render because of their resource
    pub fn blocked_nodes(&self) -> HashSet<NodeId> {
        self.pending.keys().chain(self.failed.keys()).copied().collect()
    }

    /// Apply every completion that has arrived, dropping stale ones
    pub fn drain_completions(&mut self) -> Vec<AppliedCompletion> {
        let mut applied = Vec::new();

        while let Ok(completion) = self.receiver.try_recv() {
            let ResourceTicket {
                node_id,
                generation,
                load,
            } = completion.ticket;
            let current = self.generations.get(&node_id) == Some(&generation) && self.pending.get(&node_id) == Some(&load);
            if !current {
                tracing::warn!(node = %node_id, generation, load, "Dropping stale resource completion");
                continue;
            }
            self.pending.remove(&node_id);

            match completion.outcome {
                Ok(()) => applied.push(AppliedCompletion::Ready(node_id)),
                Err(message) => {
                    self.failed.insert(node_id, message.clone());
                    applied.push(AppliedCompletion::Failed(node_id, message));
                }
            }
        }

        applied
    }
}

impl Default for ResourceTracker {
    fn default() -> Self {
        Self::new()
    }
}
