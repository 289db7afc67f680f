// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket addressing for node inputs.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// What backs a receivable socket on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketKind {
    /// Declared texture/data input
    Input,
    /// Property currently exposed for driving from upstream
    ExposedProperty,
}

/// Identifies a named socket on a specific node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketRef {
    /// Owning node
    pub node_id: NodeId,
    /// Socket name
    pub name: String,
}

impl SocketRef {
    /// Create a new socket reference
    pub fn new(node_id: NodeId, name: &str) -> Self {
        Self {
            node_id,
            name: name.to_string(),
        }
    }
}
