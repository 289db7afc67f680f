// SPDX-License-Identifier: MIT OR Apache-2.0
//! The designer: a graph plus everything that keeps it up to date.
//!
//! [`Designer`] is the single mutation point. Every topology or value edit
//! goes through it so lifecycle hooks run, the affected downstream cone is
//! re-dirtied, and UI events are queued. [`Designer::update`] drains the
//! dirty worklist in dependency order, handing rendered nodes to the
//! [`Renderer`] and calculating logic nodes in place.

use crate::connection::{Connection, ConnectionId};
use crate::events::DesignerEvent;
use crate::graph::{ConnectionError, Graph};
use crate::logic::ResolvedProperties;
use crate::node::{Node, NodeId, TextureSize};
use crate::property::{PropertyError, PropertyKind, PropertyValue};
use crate::render::{RenderRequest, Renderer};
use crate::resource::{AppliedCompletion, ResourceCompleter, ResourceTracker};
use crate::scheduler::{Propagation, SchedulingError, UpdateScheduler};
use crate::settings::DesignerSettings;
use crate::socket::{SocketKind, SocketRef};
use crate::variable::{Variable, VariableBinding, VariableError, VariableRegistry};
use std::collections::VecDeque;

/// Summary of one [`Designer::update`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Nodes brought to Clean, in processing order
    pub rendered: Vec<NodeId>,
    /// Dirty nodes held back by an unresolved or failed resource
    pub waiting: Vec<NodeId>,
    /// Subset of `waiting` whose own resource load failed
    pub failed: Vec<NodeId>,
}

impl UpdateReport {
    /// Whether every node ended Clean
    pub fn is_complete(&self) -> bool {
        self.waiting.is_empty()
    }
}

/// Error from a designer operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DesignerError {
    /// Connection rejected
    #[error("Connection rejected: {0}")]
    Connection(#[from] ConnectionError),

    /// Property write rejected
    #[error("Property write rejected: {0}")]
    Property(#[from] PropertyError),

    /// Variable operation rejected
    #[error("Variable operation rejected: {0}")]
    Variable(#[from] VariableError),

    /// Update could not finish
    #[error("Update failed: {0}")]
    Scheduling(#[from] SchedulingError),

    /// A node with this id is already live
    #[error("Node {0} is already in the designer")]
    DuplicateNode(NodeId),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Node has no such property
    #[error("Node {node} has no property named '{property}'")]
    PropertyNotFound {
        /// Node
        node: NodeId,
        /// Requested property
        property: String,
    },
}

/// Node graph with dirty tracking, variables and async resources
#[derive(Debug)]
pub struct Designer {
    graph: Graph,
    scheduler: UpdateScheduler,
    variables: VariableRegistry,
    resources: ResourceTracker,
    settings: DesignerSettings,
    events: VecDeque<DesignerEvent>,
}

impl Designer {
    /// Create an empty designer
    pub fn new(settings: DesignerSettings) -> Self {
        Self {
            graph: Graph::new(),
            scheduler: UpdateScheduler::new(),
            variables: VariableRegistry::new(),
            resources: ResourceTracker::new(),
            settings,
            events: VecDeque::new(),
        }
    }

    /// Active settings
    pub fn settings(&self) -> &DesignerSettings {
        &self.settings
    }

    /// Read-only view of the node and connection arena
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Dirty worklist
    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.graph.node(node_id)
    }

    /// Get all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.nodes()
    }

    // ------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------

    /// Insert a node and enqueue it dirty.
    ///
    /// With `initialize` the node's one-time init hook runs against this
    /// designer's settings.
    pub fn add_node(&mut self, mut node: Node, initialize: bool) -> Result<NodeId, DesignerError> {
        let node_id = node.id;
        if self.graph.contains_node(node_id) {
            return Err(DesignerError::DuplicateNode(node_id));
        }
        if initialize {
            node.attach(&self.settings);
        }

        tracing::debug!(node = %node_id, type_name = %node.type_name, "Adding node");
        self.graph.insert_node(node);
        self.resources.register(node_id);
        self.events.push_back(DesignerEvent::NodeAdded(node_id));
        self.scheduler.request_update(&mut self.graph, node_id);
        Ok(node_id)
    }

    /// Remove a node, returning it, or `None` for an unknown id.
    ///
    /// Connections still touching the node are severed first, running the
    /// disconnect hooks and re-dirtying former consumers. Pending resource
    /// loads for the node become stale and variable bindings to it are
    /// dropped.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        if !self.graph.contains_node(node_id) {
            tracing::warn!(node = %node_id, "Ignoring removal of unknown node");
            return None;
        }

        let incident: Vec<Connection> = self.graph.connections_for_node(node_id).cloned().collect();
        for connection in incident {
            self.remove_connection(
                connection.left_node_id,
                connection.right_node_id,
                &connection.right_input_name,
            );
        }

        self.scheduler.forget(node_id);
        self.resources.unregister(node_id);
        self.variables.remove_node(node_id);
        let node = self.graph.remove_node(node_id)?;

        tracing::debug!(node = %node_id, "Removed node");
        self.events.push_back(DesignerEvent::NodeRemoved(node_id));
        Some(node)
    }

    /// Connect `left`'s default output into `right.input`
    pub fn add_connection(&mut self, left: NodeId, right: NodeId, input: &str) -> Result<Connection, DesignerError> {
        self.connect(Connection::new(left, right, input))
    }

    /// Connect a named output of `left` into `right.input`
    pub fn add_connection_from(
        &mut self,
        left: NodeId,
        output: &str,
        right: NodeId,
        input: &str,
    ) -> Result<Connection, DesignerError> {
        self.connect(Connection::new(left, right, input).with_output(output))
    }

    /// Validate and insert a fully built connection, keeping its id
    pub(crate) fn connect(&mut self, connection: Connection) -> Result<Connection, DesignerError> {
        let left = connection.left_node_id;
        let right = connection.right_node_id;
        let input = connection.right_input_name.clone();

        let socket = self
            .graph
            .validate_connection(left, right, &input, self.settings.reject_cycles)?;

        let producer = self.graph.node(left).ok_or(ConnectionError::NodeNotFound(left))?;
        let output = &connection.left_output_name;
        if !output.is_empty() && !producer.outputs().iter().any(|o| o == output) {
            return Err(ConnectionError::SocketNotFound {
                node: left,
                socket: output.clone(),
            }
            .into());
        }
        let upstream = producer.upstream_info();
        let logic_value = producer.output_value().cloned();

        tracing::debug!(from = %left, to = %right, input = %input, "Connecting");
        self.graph.insert_connection(connection.clone());

        if let Some(node) = self.graph.node_mut(right) {
            if node.on_connected(&input, &upstream) {
                self.events.push_back(DesignerEvent::Resized {
                    node: right,
                    size: node.size(),
                });
            }
        }

        // A clean logic producer will not run again, so hand over its value now
        if socket == SocketKind::ExposedProperty {
            if let Some(value) = logic_value {
                self.feed_property(right, &input, &value);
            }
        }

        self.events.push_back(DesignerEvent::ConnectionAdded(connection.id));
        self.scheduler.request_update(&mut self.graph, right);
        Ok(connection)
    }

    /// Remove the connection from `left` into `right.input`.
    ///
    /// Returns `None` if no such connection exists.
    pub fn remove_connection(&mut self, left: NodeId, right: NodeId, input: &str) -> Option<Connection> {
        let fed_by_left = self
            .graph
            .connection_into(right, input)
            .is_some_and(|c| c.left_node_id == left);
        if !fed_by_left {
            return None;
        }
        let connection = self.graph.remove_connection_into(right, input)?;

        tracing::debug!(from = %left, to = %right, input = %input, "Disconnected");
        if let Some(node) = self.graph.node_mut(right) {
            if node.on_disconnected(input) {
                self.events.push_back(DesignerEvent::Resized {
                    node: right,
                    size: node.size(),
                });
            }
        }

        self.events.push_back(DesignerEvent::ConnectionRemoved(connection.id));
        self.scheduler.request_update(&mut self.graph, right);
        Some(connection)
    }

    /// Remove a connection by id
    pub fn remove_connection_by_id(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let connection = self.graph.connection(connection_id)?.clone();
        self.remove_connection(
            connection.left_node_id,
            connection.right_node_id,
            &connection.right_input_name,
        )
    }

    /// The unique producer feeding a socket
    pub fn find_upstream(&self, node_id: NodeId, input: &str) -> Option<&Node> {
        self.graph.find_upstream(node_id, input)
    }

    /// All consumers of an output (empty name = any output)
    pub fn find_downstream(&self, node_id: NodeId, output: &str) -> Vec<&Node> {
        self.graph.find_downstream(node_id, output)
    }

    /// Change the size a node renders at when it does not inherit one
    pub fn resize_node(&mut self, node_id: NodeId, size: TextureSize) -> Result<(), DesignerError> {
        let node = self.graph.node(node_id).ok_or(DesignerError::NodeNotFound(node_id))?;
        let inherited = node
            .parent_input_name
            .as_deref()
            .is_some_and(|input| self.graph.connection_into(node_id, input).is_some());

        let node = self.graph.node_mut(node_id).ok_or(DesignerError::NodeNotFound(node_id))?;
        if node.set_base_size(size, inherited) {
            self.events.push_back(DesignerEvent::Resized { node: node_id, size });
        }
        self.scheduler.request_update(&mut self.graph, node_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Mark a node and its downstream cone dirty
    pub fn request_update(&mut self, node_id: NodeId) -> Propagation {
        self.scheduler.request_update(&mut self.graph, node_id)
    }

    /// Whether the node waits to be recomputed
    pub fn is_dirty(&self, node_id: NodeId) -> bool {
        self.scheduler.is_dirty(node_id)
    }

    /// Whether every producer feeding the node is clean
    pub fn is_ready(&self, node_id: NodeId) -> bool {
        self.scheduler.is_ready(&self.graph, node_id)
    }

    /// Drain the worklist.
    ///
    /// Ready nodes are processed in worklist order until every node is clean
    /// or only nodes held back by a resource remain. If dirty nodes remain
    /// that no resource explains, they sit on a cycle and
    /// [`SchedulingError::Deadlock`] is returned. A renderer failure stops
    /// the drain and leaves that node dirty.
    pub fn update(&mut self, renderer: &mut dyn Renderer) -> Result<UpdateReport, DesignerError> {
        let mut report = UpdateReport::default();

        while !self.scheduler.is_empty() {
            let resources = &self.resources;
            let next = self
                .scheduler
                .next_ready(&self.graph, |id| resources.is_blocked(id));

            let Some(node_id) = next else {
                let blocked = self.resources.blocked_nodes();
                let waiting = self.scheduler.waiting_behind(&self.graph, &blocked);
                let stuck: Vec<NodeId> = self
                    .scheduler
                    .worklist()
                    .filter(|id| !waiting.contains(id))
                    .collect();

                if !stuck.is_empty() {
                    tracing::error!(stuck = stuck.len(), "No dirty node can become ready");
                    return Err(SchedulingError::Deadlock { stuck }.into());
                }

                report.failed = waiting
                    .iter()
                    .copied()
                    .filter(|id| self.resources.failure(*id).is_some())
                    .collect();
                report.waiting = waiting.into_iter().collect();
                break;
            };

            self.process(node_id, renderer)?;
            report.rendered.push(node_id);
        }

        tracing::debug!(
            rendered = report.rendered.len(),
            waiting = report.waiting.len(),
            "Update finished"
        );
        Ok(report)
    }

    fn process(&mut self, node_id: NodeId, renderer: &mut dyn Renderer) -> Result<(), DesignerError> {
        let parent = self
            .graph
            .node(node_id)
            .and_then(|node| node.parent_input_name.as_deref())
            .and_then(|input| self.graph.find_upstream(node_id, input))
            .map(Node::upstream_info);

        let node = self.graph.node_mut(node_id).ok_or(DesignerError::NodeNotFound(node_id))?;
        if node.pre_render(parent.as_ref()) {
            self.events.push_back(DesignerEvent::Resized {
                node: node_id,
                size: node.size(),
            });
        }
        let rendered = node.kind.is_rendered();
        let properties = self.resolved_properties(node_id);

        if rendered {
            let node = self.graph.node(node_id).ok_or(DesignerError::NodeNotFound(node_id))?;
            let inputs = node
                .inputs()
                .iter()
                .filter_map(|input| {
                    self.graph
                        .find_upstream(node_id, input)
                        .map(|producer| (input.as_str(), producer))
                })
                .collect();
            let request = RenderRequest {
                node,
                inputs,
                properties,
                thumbnail_size: self.settings.thumbnail_size,
            };

            let output = renderer.render(&request).map_err(|err| {
                tracing::error!(node = %node_id, error = %err, "Render failed");
                SchedulingError::Render {
                    node: node_id,
                    message: err.0,
                }
            })?;
            if let Some(thumbnail) = output.thumbnail {
                self.events
                    .push_back(DesignerEvent::ThumbnailGenerated(node_id, thumbnail));
            }
        } else {
            let result = self
                .graph
                .node_mut(node_id)
                .and_then(|node| node.calculate(&properties));
            if result.is_none() {
                tracing::warn!(node = %node_id, "Logic node produced no value");
            }
            self.push_logic_result(node_id, result.as_ref());
        }

        self.scheduler.mark_clean(&mut self.graph, node_id);
        self.events.push_back(DesignerEvent::NodeOutputUpdated(node_id));
        tracing::trace!(node = %node_id, "Node clean");
        Ok(())
    }

    /// Copy a logic result into every exposed property it feeds. Without a
    /// result those properties fall back to their local values.
    fn push_logic_result(&mut self, node_id: NodeId, value: Option<&PropertyValue>) {
        let targets: Vec<(NodeId, String)> = self
            .graph
            .connections_from(node_id, "")
            .map(|c| (c.right_node_id, c.right_input_name.clone()))
            .collect();

        for (target, name) in targets {
            let socket = self.graph.node(target).and_then(|n| n.socket_kind(&name));
            if socket != Some(SocketKind::ExposedProperty) {
                continue;
            }
            match value {
                Some(value) => self.feed_property(target, &name, value),
                None => {
                    if let Some(property) = self.graph.node_mut(target).and_then(|n| n.property_mut(&name)) {
                        property.reset_parent_value();
                    }
                }
            }
        }
    }

    fn feed_property(&mut self, node_id: NodeId, name: &str, value: &PropertyValue) {
        let Some(property) = self.graph.node_mut(node_id).and_then(|n| n.property_mut(name)) else {
            return;
        };
        let kind = property.kind();
        let fed = value
            .coerce_to(kind)
            .is_some_and(|v| property.set_parent_value(v).is_ok());
        if !fed {
            tracing::warn!(
                node = %node_id,
                property = name,
                "A {} value cannot drive a {} property",
                value.kind(),
                kind
            );
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// The value a node reads for a property: the upstream value when the
    /// property is exposed and connected, otherwise its local value
    pub fn evaluate(&self, node_id: NodeId, name: &str) -> Option<PropertyValue> {
        let property = self.graph.node(node_id)?.property(name)?;
        let connected = self.graph.connection_into(node_id, name).is_some();
        Some(property.resolve(connected).clone())
    }

    /// Every property of a node, evaluated
    pub fn resolved_properties(&self, node_id: NodeId) -> ResolvedProperties {
        let Some(node) = self.graph.node(node_id) else {
            return ResolvedProperties::new();
        };
        node.properties()
            .iter()
            .map(|p| {
                let connected = self.graph.connection_into(node_id, &p.name).is_some();
                (p.name.clone(), p.resolve(connected).clone())
            })
            .collect()
    }

    /// Write a property's local value and re-dirty the node
    pub fn set_property_value(
        &mut self,
        node_id: NodeId,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), DesignerError> {
        let node = self.graph.node_mut(node_id).ok_or(DesignerError::NodeNotFound(node_id))?;
        let property = node.property_mut(name).ok_or_else(|| DesignerError::PropertyNotFound {
            node: node_id,
            property: name.to_string(),
        })?;
        property.set_value(value.into())?;
        self.scheduler.request_update(&mut self.graph, node_id);
        Ok(())
    }

    /// Turn a property's socket on or off.
    ///
    /// Turning exposure off severs the connection feeding the property and
    /// returns it. Both directions queue the matching socket event; setting
    /// the current state again does nothing.
    pub fn set_property_exposed(
        &mut self,
        node_id: NodeId,
        name: &str,
        exposed: bool,
    ) -> Result<Option<Connection>, DesignerError> {
        let missing = || DesignerError::PropertyNotFound {
            node: node_id,
            property: name.to_string(),
        };
        let node = self.graph.node(node_id).ok_or(DesignerError::NodeNotFound(node_id))?;
        if node.property(name).ok_or_else(missing)?.is_exposed() == exposed {
            return Ok(None);
        }

        let severed = if exposed {
            None
        } else {
            self.graph
                .connection_into(node_id, name)
                .map(|c| c.left_node_id)
                .and_then(|left| self.remove_connection(left, node_id, name))
        };

        if let Some(property) = self.graph.node_mut(node_id).and_then(|n| n.property_mut(name)) {
            property.set_exposed(exposed);
        }

        let socket = SocketRef::new(node_id, name);
        tracing::debug!(node = %node_id, property = name, exposed, "Property exposure changed");
        self.events.push_back(if exposed {
            DesignerEvent::SocketAdded(socket)
        } else {
            DesignerEvent::SocketRemoved(socket)
        });
        Ok(severed)
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// All variables
    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    /// Get a variable by name
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Define a variable with an empty binding list
    pub fn define_variable(
        &mut self,
        name: &str,
        display_name: &str,
        kind: PropertyKind,
    ) -> Result<&Variable, DesignerError> {
        Ok(self.variables.define(name, display_name, kind)?)
    }

    pub(crate) fn insert_variable(&mut self, variable: Variable) -> Result<(), DesignerError> {
        Ok(self.variables.insert(variable)?)
    }

    /// Bind a variable to a node property.
    ///
    /// Returns `Ok(false)` when the variable, node or property does not
    /// exist, or the binding is already present. A property of another kind,
    /// or one whose range does not overlap the variable's, is rejected.
    /// Binding narrows the variable to values the property stores unchanged.
    pub fn bind_variable(&mut self, name: &str, node_id: NodeId, property_name: &str) -> Result<bool, DesignerError> {
        let Some(variable) = self.variables.get_mut(name) else {
            tracing::warn!(variable = name, "Cannot bind unknown variable");
            return Ok(false);
        };
        let Some(property) = self.graph.node(node_id).and_then(|n| n.property(property_name)) else {
            tracing::warn!(variable = name, node = %node_id, property = property_name, "Cannot bind missing property");
            return Ok(false);
        };
        variable.constrain_to(property)?;
        Ok(variable.bind(VariableBinding::new(node_id, property_name)))
    }

    /// Remove one binding
    pub fn unbind_variable(&mut self, name: &str, node_id: NodeId, property_name: &str) -> bool {
        self.variables
            .get_mut(name)
            .is_some_and(|v| v.unbind(node_id, property_name))
    }

    /// Remove a variable and its bindings; bound properties keep their values
    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        self.variables.remove(name)
    }

    /// Write a variable and fan the value out to every binding.
    ///
    /// The value is clamped into the range every bound property accepts and
    /// then written as both the local and the upstream value of each bound
    /// property, so it is what [`Designer::evaluate`] returns whether or not
    /// the property is connected. Each bound node is re-dirtied once however
    /// many of its properties are bound. Returns the number of nodes
    /// re-dirtied; an unknown variable is a no-op.
    pub fn set_variable(&mut self, name: &str, value: impl Into<PropertyValue>) -> Result<usize, DesignerError> {
        let Some(variable) = self.variables.get_mut(name) else {
            tracing::warn!(variable = name, "Cannot set unknown variable");
            return Ok(0);
        };
        variable.set_value(value.into())?;
        let value = variable.value().clone();

        for binding in variable.bindings() {
            let property = self
                .graph
                .node_mut(binding.node_id)
                .and_then(|n| n.property_mut(&binding.property_name));
            if let Some(property) = property {
                let written = property
                    .set_value(value.clone())
                    .and_then(|()| property.set_parent_value(value.clone()));
                if let Err(err) = written {
                    tracing::warn!(variable = name, error = %err, "Skipping variable binding");
                }
            }
        }

        let nodes = variable.bound_nodes();
        for node_id in &nodes {
            self.scheduler.request_update(&mut self.graph, *node_id);
        }
        tracing::debug!(variable = name, nodes = nodes.len(), "Variable set");
        Ok(nodes.len())
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    /// Start an asynchronous resource load for a node.
    ///
    /// The node is dirty and not ready until the returned completer resolves
    /// and [`Designer::poll_resources`] applies it. `None` for an unknown
    /// node.
    pub fn begin_resource_load(&mut self, node_id: NodeId) -> Option<ResourceCompleter> {
        let completer = self.resources.begin(node_id)?;
        tracing::debug!(node = %node_id, "Resource load started");
        self.scheduler.request_update(&mut self.graph, node_id);
        Some(completer)
    }

    /// Failure message of a node's last resource load
    pub fn resource_failure(&self, node_id: NodeId) -> Option<&str> {
        self.resources.failure(node_id)
    }

    /// Apply resource completions that arrived since the last poll
    pub fn poll_resources(&mut self) -> Vec<AppliedCompletion> {
        let applied = self.resources.drain_completions();
        for completion in &applied {
            match completion {
                AppliedCompletion::Ready(node_id) => {
                    tracing::debug!(node = %node_id, "Resource ready");
                    self.scheduler.request_update(&mut self.graph, *node_id);
                }
                AppliedCompletion::Failed(node_id, message) => {
                    tracing::error!(node = %node_id, %message, "Resource load failed");
                    self.events.push_back(DesignerEvent::ResourceFailed {
                        node: *node_id,
                        message: message.clone(),
                    });
                }
            }
        }
        applied
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Pending events, oldest first
    pub fn events(&self) -> impl Iterator<Item = &DesignerEvent> {
        self.events.iter()
    }

    /// Drain pending events, oldest first
    pub fn take_events(&mut self) -> Vec<DesignerEvent> {
        self.events.drain(..).collect()
    }
}

impl Default for Designer {
    fn default() -> Self {
        Self::new(DesignerSettings::default())
    }
}
