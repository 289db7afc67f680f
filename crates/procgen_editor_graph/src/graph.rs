// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! The graph is the arena: it owns every node and every connection, and all
//! cross references are id lookups. It only stores and answers topology
//! queries; scheduling and lifecycle hooks live in
//! [`Designer`](crate::designer::Designer).

use crate::connection::{Connection, ConnectionId};
use crate::node::{Node, NodeId};
use crate::property::{Property, PropertyKind};
use crate::socket::SocketKind;
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashSet, VecDeque};

/// Node and connection arena
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Connections in insertion order
    connections: IndexMap<ConnectionId, Connection>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node. Incident connections must already be gone.
    pub(crate) fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub(crate) fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Check whether a node is live
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check that a connection from `left` into `right.input` may be added
    pub fn validate_connection(
        &self,
        left: NodeId,
        right: NodeId,
        input: &str,
        reject_cycles: bool,
    ) -> Result<SocketKind, ConnectionError> {
        let producer = self.nodes.get(&left).ok_or(ConnectionError::NodeNotFound(left))?;
        let target = self.nodes.get(&right).ok_or(ConnectionError::NodeNotFound(right))?;

        let socket = target.socket_kind(input).ok_or_else(|| ConnectionError::SocketNotFound {
            node: right,
            socket: input.to_string(),
        })?;

        if left == right {
            return Err(ConnectionError::SelfLoop);
        }

        if socket == SocketKind::ExposedProperty {
            let kinds = producer.logic_output_kind().zip(target.property(input).map(Property::kind));
            if let Some((output, input_kind)) = kinds {
                if !output.coerces_to(input_kind) {
                    return Err(ConnectionError::IncompatibleKinds {
                        node: right,
                        socket: input.to_string(),
                        output,
                        input: input_kind,
                    });
                }
            }
        }

        if let Some(existing) = self.connection_into(right, input) {
            return Err(ConnectionError::InputOccupied {
                node: right,
                socket: input.to_string(),
                existing: existing.id,
            });
        }

        if reject_cycles && self.would_create_cycle(left, right) {
            return Err(ConnectionError::WouldCreateCycle { from: left, to: right });
        }

        Ok(socket)
    }

    pub(crate) fn insert_connection(&mut self, connection: Connection) -> ConnectionId {
        let id = connection.id;
        self.connections.insert(id, connection);
        id
    }

    /// Remove the connection feeding a socket
    pub(crate) fn remove_connection_into(&mut self, node_id: NodeId, input: &str) -> Option<Connection> {
        let id = self.connection_into(node_id, input)?.id;
        self.connections.shift_remove(&id)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The single connection feeding a socket
    pub fn connection_into(&self, node_id: NodeId, input: &str) -> Option<&Connection> {
        self.connections.values().find(|c| c.targets(node_id, input))
    }

    /// All connections feeding a node
    pub fn connections_into(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.right_node_id == node_id)
    }

    /// All connections leaving an output (empty name = any output)
    pub fn connections_from<'a>(
        &'a self,
        node_id: NodeId,
        output: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.leaves(node_id, output))
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// The unique producer feeding a socket
    pub fn find_upstream(&self, node_id: NodeId, input: &str) -> Option<&Node> {
        let connection = self.connection_into(node_id, input)?;
        self.nodes.get(&connection.left_node_id)
    }

    /// All consumers of an output, each listed once
    pub fn find_downstream(&self, node_id: NodeId, output: &str) -> Vec<&Node> {
        let ids: IndexSet<NodeId> = self
            .connections_from(node_id, output)
            .map(|c| c.right_node_id)
            .collect();
        ids.iter().filter_map(|id| self.nodes.get(id)).collect()
    }

    /// Ids of every node fed by any output of `node_id`
    pub fn downstream_ids(&self, node_id: NodeId) -> IndexSet<NodeId> {
        self.connections_from(node_id, "")
            .map(|c| c.right_node_id)
            .collect()
    }

    /// Whether adding `from -> to` would close a cycle, i.e. `from` is
    /// already reachable from `to`
    pub fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(to);

        while let Some(current) = queue.pop_front() {
            if current == from {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            queue.extend(self.downstream_ids(current));
        }
        false
    }
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Socket is neither a declared input nor an exposed property
    #[error("Node {node} has no input or exposed property named '{socket}'")]
    SocketNotFound {
        /// Target node
        node: NodeId,
        /// Requested socket
        socket: String,
    },

    /// Input already has a producer
    #[error("Input '{socket}' on node {node} is already connected")]
    InputOccupied {
        /// Target node
        node: NodeId,
        /// Occupied socket
        socket: String,
        /// Connection currently feeding it
        existing: ConnectionId,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Connection would close a cycle
    #[error("Connecting {from} to {to} would create a cycle")]
    WouldCreateCycle {
        /// Producer
        from: NodeId,
        /// Consumer
        to: NodeId,
    },

    /// A logic output cannot drive the target property
    #[error("A {output} output cannot drive property '{socket}' ({input}) on node {node}")]
    IncompatibleKinds {
        /// Target node
        node: NodeId,
        /// Target property
        socket: String,
        /// Kind the producer yields
        output: PropertyKind,
        /// Kind of the target property
        input: PropertyKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeCategory, NodeKind, NodeType};

    fn filter() -> NodeType {
        NodeType::new("filter", "Filter", NodeCategory::Filter, NodeKind::Texture)
            .with_inputs(&["image"])
            .with_properties(vec![Property::float("amount", "Amount", 0.5).exposed(), Property::float("hidden", "Hidden", 0.0)])
    }

    fn chain(len: usize) -> (Graph, Vec<NodeId>) {
        let mut graph = Graph::new();
        let ids: Vec<NodeId> = (0..len).map(|_| graph.insert_node(Node::new(&filter()))).collect();
        for pair in ids.windows(2) {
            graph.insert_connection(Connection::new(pair[0], pair[1], "image"));
        }
        (graph, ids)
    }

    #[test]
    fn test_find_upstream_and_downstream() {
        let (mut graph, ids) = chain(2);
        let extra = graph.insert_node(Node::new(&filter()));
        graph.insert_connection(Connection::new(ids[0], extra, "amount"));

        assert_eq!(graph.find_upstream(ids[1], "image").map(|n| n.id), Some(ids[0]));
        assert!(graph.find_upstream(ids[0], "image").is_none());

        let downstream: Vec<NodeId> = graph.find_downstream(ids[0], "").iter().map(|n| n.id).collect();
        assert_eq!(downstream, vec![ids[1], extra]);
    }

    #[test]
    fn test_find_downstream_lists_each_consumer_once() {
        let (mut graph, ids) = chain(2);
        graph.insert_connection(Connection::new(ids[0], ids[1], "amount"));
        assert_eq!(graph.find_downstream(ids[0], "out").len(), 1);
    }

    #[test]
    fn test_validate_rejects_occupied_input() {
        let (mut graph, ids) = chain(2);
        let other = graph.insert_node(Node::new(&filter()));

        let err = graph.validate_connection(other, ids[1], "image", true).unwrap_err();
        assert!(matches!(err, ConnectionError::InputOccupied { .. }));
    }

    #[test]
    fn test_validate_sockets() {
        let (graph, ids) = chain(2);
        assert_eq!(graph.validate_connection(ids[0], ids[1], "amount", true), Ok(SocketKind::ExposedProperty));
        assert!(matches!(
            graph.validate_connection(ids[0], ids[1], "hidden", true),
            Err(ConnectionError::SocketNotFound { .. })
        ));
        assert_eq!(graph.validate_connection(ids[0], ids[0], "amount", true), Err(ConnectionError::SelfLoop));
        let ghost = NodeId::new();
        assert_eq!(
            graph.validate_connection(ghost, ids[0], "image", true),
            Err(ConnectionError::NodeNotFound(ghost))
        );
    }

    #[test]
    fn test_cycle_detection() {
        let (graph, ids) = chain(3);
        assert!(graph.would_create_cycle(ids[2], ids[0]));
        assert!(!graph.would_create_cycle(ids[0], ids[2]));
        assert!(matches!(
            graph.validate_connection(ids[2], ids[0], "amount", true),
            Err(ConnectionError::WouldCreateCycle { .. })
        ));
        assert!(graph.validate_connection(ids[2], ids[0], "amount", false).is_ok());
    }

    #[test]
    fn test_remove_connection_into() {
        let (mut graph, ids) = chain(2);
        let removed = graph.remove_connection_into(ids[1], "image").unwrap();
        assert_eq!(removed.left_node_id, ids[0]);
        assert_eq!(graph.connection_count(), 0);
        assert!(graph.remove_connection_into(ids[1], "image").is_none());
    }
}
