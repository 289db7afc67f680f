// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph dataflow engine for the procedural texture editor.
//!
//! Nodes generate or filter textures, or compute values that drive other
//! nodes' properties. An edit marks the touched node and everything
//! downstream of it dirty; [`Designer::update`] brings dirty nodes back to
//! clean in dependency order, handing texture work to a host [`Renderer`].
//!
//! ## Architecture
//!
//! - [`Graph`] is an arena of nodes and connections addressed by id
//! - [`UpdateScheduler`] keeps the dirty worklist and answers readiness
//! - [`Designer`] is the single mutation point: hooks, variables, async
//!   resources, events
//! - [`DesignerDocument`] is the persisted form (RON or JSON)

pub mod property;
pub mod socket;
pub mod connection;
pub mod logic;
pub mod node;
pub mod graph;
pub mod scheduler;
pub mod resource;
pub mod variable;
pub mod render;
pub mod events;
pub mod designer;
pub mod persistence;
pub mod library;
pub mod settings;
pub mod shared;

pub use connection::{Connection, ConnectionId};
pub use designer::{Designer, DesignerError, UpdateReport};
pub use events::DesignerEvent;
pub use graph::{ConnectionError, Graph};
pub use library::create_builtin_registry;
pub use node::{Node, NodeCategory, NodeId, NodeKind, NodeRegistry, NodeType, TextureSize};
pub use persistence::{DesignerDocument, PersistenceError};
pub use property::{Property, PropertyKind, PropertyValue};
pub use render::{NullRenderer, RenderError, RenderOutput, RenderRequest, Renderer, Thumbnail};
pub use resource::ResourceCompleter;
pub use scheduler::{SchedulingError, UpdateScheduler};
pub use settings::DesignerSettings;
pub use shared::SharedDesigner;
pub use socket::{SocketKind, SocketRef};
pub use variable::{Variable, VariableError};
