// SPDX-License-Identifier: MIT OR Apache-2.0
//! Notifications for UI mirroring.
//!
//! The designer queues events as it mutates and renders; the host drains
//! them with [`Designer::take_events`](crate::designer::Designer::take_events).

use crate::connection::ConnectionId;
use crate::node::{NodeId, TextureSize};
use crate::render::Thumbnail;
use crate::socket::SocketRef;

/// Something the UI layer may want to mirror
#[derive(Debug, Clone, PartialEq)]
pub enum DesignerEvent {
    /// A node became live
    NodeAdded(NodeId),
    /// A node was removed
    NodeRemoved(NodeId),
    /// A connection was created
    ConnectionAdded(ConnectionId),
    /// A connection was removed
    ConnectionRemoved(ConnectionId),
    /// A node finished rendering and is clean
    NodeOutputUpdated(NodeId),
    /// The renderer produced a preview
    ThumbnailGenerated(NodeId, Thumbnail),
    /// A node's dimensions changed with its parent input
    Resized {
        /// Resized node
        node: NodeId,
        /// New size
        size: TextureSize,
    },
    /// An exposed property became a receivable socket
    SocketAdded(SocketRef),
    /// A property socket disappeared
    SocketRemoved(SocketRef),
    /// An asynchronous resource load failed; the node stays dirty
    ResourceFailed {
        /// Affected node
        node: NodeId,
        /// Failure message
        message: String,
    },
}
