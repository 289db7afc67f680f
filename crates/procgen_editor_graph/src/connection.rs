// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use crate::socket::SocketRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed edge from a node's output to an input socket on another node.
///
/// Nodes are referenced by id only, so a connection never keeps a node alive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Producer node
    pub left_node_id: NodeId,
    /// Producer output (empty = first/only output)
    #[serde(default)]
    pub left_output_name: String,
    /// Consumer node
    pub right_node_id: NodeId,
    /// Input socket or exposed property on the consumer
    pub right_input_name: String,
}

impl Connection {
    /// Create a new connection from the default output
    pub fn new(left_node_id: NodeId, right_node_id: NodeId, right_input_name: impl Into<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            left_node_id,
            left_output_name: String::new(),
            right_node_id,
            right_input_name: right_input_name.into(),
        }
    }

    /// Use a named output on the producer
    pub fn with_output(mut self, left_output_name: impl Into<String>) -> Self {
        self.left_output_name = left_output_name.into();
        self
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.left_node_id == node_id || self.right_node_id == node_id
    }

    /// The input socket this connection feeds
    pub fn target(&self) -> SocketRef {
        SocketRef::new(self.right_node_id, &self.right_input_name)
    }

    /// Check if this connection feeds the given socket
    pub fn targets(&self, node_id: NodeId, input_name: &str) -> bool {
        self.right_node_id == node_id && self.right_input_name == input_name
    }

    /// Check if this connection leaves the given output.
    ///
    /// An empty name on either side stands for the node's default output.
    pub fn leaves(&self, node_id: NodeId, output_name: &str) -> bool {
        self.left_node_id == node_id
            && (output_name.is_empty()
                || self.left_output_name.is_empty()
                || self.left_output_name == output_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_matches_any_name() {
        let a = NodeId::new();
        let b = NodeId::new();
        let conn = Connection::new(a, b, "color");

        assert!(conn.leaves(a, ""));
        assert!(conn.leaves(a, "out"));
        assert!(!conn.leaves(b, ""));
        assert!(conn.targets(b, "color"));
        assert!(!conn.targets(b, "alpha"));
        assert!(conn.involves_node(a) && conn.involves_node(b));
    }

    #[test]
    fn test_named_output() {
        let a = NodeId::new();
        let conn = Connection::new(a, NodeId::new(), "image").with_output("mask");
        assert!(conn.leaves(a, "mask"));
        assert!(!conn.leaves(a, "color"));
        assert_eq!(conn.target().name, "image");
    }
}
