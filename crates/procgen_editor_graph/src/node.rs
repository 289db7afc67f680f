// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.
//!
//! Nodes never hold references to their connections or to the designer;
//! everything they learn about the graph arrives through hook arguments.

use crate::logic::{LogicNode, ResolvedProperties};
use crate::property::{Property, PropertyKind, PropertyValue};
use crate::settings::DesignerSettings;
use crate::socket::SocketKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node, stable across save/load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a node produces, which decides whether it needs a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Generates a texture from its properties alone
    Procedural,
    /// Processes input textures
    Texture,
    /// Rasterizes text
    Text,
    /// Produces a value instead of a texture
    Logic,
}

impl NodeKind {
    /// Whether nodes of this kind go through the external renderer
    pub fn is_rendered(self) -> bool {
        !matches!(self, Self::Logic)
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Pattern and color generators
    Generator,
    /// Texture filters
    Filter,
    /// Color adjustments
    Color,
    /// Final outputs
    Output,
    /// Text rendering
    Text,
    /// Value logic
    Logic,
    /// Utility nodes
    Utility,
}

/// Pixel dimensions of a node's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl TextureSize {
    /// Create a new size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for TextureSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What a node can see of one of its producers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamInfo {
    /// Producer id
    pub id: NodeId,
    /// Producer kind
    pub kind: NodeKind,
    /// Producer output size
    pub size: TextureSize,
}

/// Mutable view of a node handed to its hooks
pub struct NodeContext<'a> {
    /// The node's properties
    pub properties: &'a mut [Property],
    /// Current output size
    pub size: &'a mut TextureSize,
    /// Size used when nothing is inherited
    pub base_size: TextureSize,
    /// Input whose producer decides this node's size
    pub parent_input_name: Option<&'a str>,
}

impl NodeContext<'_> {
    fn resize(&mut self, size: TextureSize) -> bool {
        if *self.size == size {
            return false;
        }
        *self.size = size;
        true
    }

    fn reset_parent_value(&mut self, name: &str) {
        if let Some(prop) = self.properties.iter_mut().find(|p| p.name == name) {
            prop.reset_parent_value();
        }
    }
}

/// Lifecycle hooks every node behavior implements.
///
/// Hooks that can change the node's size return `true` when they did.
pub trait NodeHooks {
    /// One-time setup after the node joins a designer
    fn init(&mut self, _ctx: NodeContext<'_>, _settings: &DesignerSettings) {}

    /// A producer was connected into `input`
    fn on_connected(&mut self, ctx: NodeContext<'_>, input: &str, upstream: &UpstreamInfo) -> bool;

    /// The producer feeding `input` was disconnected
    fn on_disconnected(&mut self, ctx: NodeContext<'_>, input: &str) -> bool;

    /// Called right before the node is rendered, with the producer on the
    /// parent input if there is one
    fn pre_render(&mut self, ctx: NodeContext<'_>, parent: Option<&UpstreamInfo>) -> bool;
}

/// Behavior of nodes that go through the renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderedNode;

impl NodeHooks for RenderedNode {
    fn init(&mut self, ctx: NodeContext<'_>, settings: &DesignerSettings) {
        let Some(seed) = ctx.properties.iter_mut().find(|p| p.name == "seed") else {
            return;
        };
        let stamped = i32::try_from(settings.random_seed)
            .map_err(|_| format!("{} does not fit an int property", settings.random_seed))
            .and_then(|value| seed.set_value(PropertyValue::Int(value)).map_err(|err| err.to_string()));
        if let Err(error) = stamped {
            tracing::warn!(%error, "Keeping the default seed");
        }
    }

    fn on_connected(&mut self, mut ctx: NodeContext<'_>, input: &str, upstream: &UpstreamInfo) -> bool {
        if ctx.parent_input_name == Some(input) && upstream.kind.is_rendered() {
            return ctx.resize(upstream.size);
        }
        false
    }

    fn on_disconnected(&mut self, mut ctx: NodeContext<'_>, input: &str) -> bool {
        ctx.reset_parent_value(input);
        if ctx.parent_input_name == Some(input) {
            let base = ctx.base_size;
            return ctx.resize(base);
        }
        false
    }

    fn pre_render(&mut self, mut ctx: NodeContext<'_>, parent: Option<&UpstreamInfo>) -> bool {
        match parent {
            Some(parent) if parent.kind.is_rendered() => ctx.resize(parent.size),
            _ if ctx.parent_input_name.is_some() => {
                let base = ctx.base_size;
                ctx.resize(base)
            }
            _ => false,
        }
    }
}

impl NodeHooks for LogicNode {
    fn on_connected(&mut self, _ctx: NodeContext<'_>, _input: &str, _upstream: &UpstreamInfo) -> bool {
        false
    }

    fn on_disconnected(&mut self, mut ctx: NodeContext<'_>, input: &str) -> bool {
        ctx.reset_parent_value(input);
        false
    }

    fn pre_render(&mut self, _ctx: NodeContext<'_>, _parent: Option<&UpstreamInfo>) -> bool {
        false
    }
}

/// Closed set of node behaviors
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBehavior {
    /// Output produced by the renderer
    Rendered(RenderedNode),
    /// Output produced by [`LogicNode::calculate`]
    Logic(LogicNode),
}

impl Default for NodeBehavior {
    fn default() -> Self {
        Self::Rendered(RenderedNode)
    }
}

impl NodeHooks for NodeBehavior {
    fn init(&mut self, ctx: NodeContext<'_>, settings: &DesignerSettings) {
        match self {
            Self::Rendered(b) => b.init(ctx, settings),
            Self::Logic(b) => b.init(ctx, settings),
        }
    }

    fn on_connected(&mut self, ctx: NodeContext<'_>, input: &str, upstream: &UpstreamInfo) -> bool {
        match self {
            Self::Rendered(b) => b.on_connected(ctx, input, upstream),
            Self::Logic(b) => b.on_connected(ctx, input, upstream),
        }
    }

    fn on_disconnected(&mut self, ctx: NodeContext<'_>, input: &str) -> bool {
        match self {
            Self::Rendered(b) => b.on_disconnected(ctx, input),
            Self::Logic(b) => b.on_disconnected(ctx, input),
        }
    }

    fn pre_render(&mut self, ctx: NodeContext<'_>, parent: Option<&UpstreamInfo>) -> bool {
        match self {
            Self::Rendered(b) => b.pre_render(ctx, parent),
            Self::Logic(b) => b.pre_render(ctx, parent),
        }
    }
}

/// Node type definition, the factory template for nodes
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Factory key
    pub type_name: String,
    /// Default title
    pub title: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Kind
    pub kind: NodeKind,
    /// Declared input sockets, in order
    pub inputs: Vec<String>,
    /// Declared outputs, in order
    pub outputs: Vec<String>,
    /// Property templates
    pub properties: Vec<Property>,
    /// Input whose producer decides the node's size
    pub parent_input: Option<String>,
    /// Behavior
    pub behavior: NodeBehavior,
}

impl NodeType {
    /// Create a type with a single default output and no inputs
    pub fn new(type_name: &str, title: &str, category: NodeCategory, kind: NodeKind) -> Self {
        Self {
            type_name: type_name.to_string(),
            title: title.to_string(),
            category,
            description: String::new(),
            kind,
            inputs: Vec::new(),
            outputs: vec!["out".to_string()],
            properties: Vec::new(),
            parent_input: None,
            behavior: NodeBehavior::default(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Declare input sockets
    pub fn with_inputs(mut self, inputs: &[&str]) -> Self {
        self.inputs = inputs.iter().map(|i| (*i).to_string()).collect();
        self
    }

    /// Declare outputs
    pub fn with_outputs(mut self, outputs: &[&str]) -> Self {
        self.outputs = outputs.iter().map(|o| (*o).to_string()).collect();
        self
    }

    /// Set the property templates
    pub fn with_properties(mut self, properties: Vec<Property>) -> Self {
        self.properties = properties;
        self
    }

    /// Inherit size from the producer on `input`
    pub fn with_parent_input(mut self, input: &str) -> Self {
        self.parent_input = Some(input.to_string());
        self
    }

    /// Set the behavior
    pub fn with_behavior(mut self, behavior: NodeBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

/// A node instance
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Factory key
    pub type_name: String,
    /// Display title
    pub title: String,
    /// Category
    pub category: NodeCategory,
    /// Kind
    pub kind: NodeKind,
    /// Input whose producer decides this node's size
    pub parent_input_name: Option<String>,
    /// Position in the editor canvas
    pub position: [f32; 2],
    needs_update: bool,
    initialized: bool,
    inputs: Vec<String>,
    outputs: Vec<String>,
    properties: Vec<Property>,
    size: TextureSize,
    base_size: TextureSize,
    behavior: NodeBehavior,
}

impl Node {
    /// Create a new node from a type definition
    pub fn new(node_type: &NodeType) -> Self {
        Self::with_id(node_type, NodeId::new())
    }

    /// Create a node with a known id (used when loading)
    pub fn with_id(node_type: &NodeType, id: NodeId) -> Self {
        let size = DesignerSettings::default().default_texture_size;
        Self {
            id,
            type_name: node_type.type_name.clone(),
            title: node_type.title.clone(),
            category: node_type.category,
            kind: node_type.kind,
            parent_input_name: node_type.parent_input.clone(),
            position: [0.0, 0.0],
            needs_update: true,
            initialized: false,
            inputs: node_type.inputs.clone(),
            outputs: node_type.outputs.clone(),
            properties: node_type.properties.clone(),
            size,
            base_size: size,
            behavior: node_type.behavior.clone(),
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Whether the node's output is stale
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub(crate) fn set_needs_update(&mut self, needs_update: bool) {
        self.needs_update = needs_update;
    }

    /// Whether the one-time init hook has run
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Declared input sockets
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Declared outputs
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Properties in declaration order
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Get a property by name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Get a mutable property by name.
    ///
    /// Writes made here do not schedule an update; on a live node use
    /// [`Designer::set_property_value`](crate::designer::Designer::set_property_value).
    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    /// Current output size
    pub fn size(&self) -> TextureSize {
        self.size
    }

    /// Size used when nothing is inherited
    pub fn base_size(&self) -> TextureSize {
        self.base_size
    }

    /// Change the base size. The current size follows unless it is
    /// `inherited` from a connected parent input; returns `true` if it did.
    pub(crate) fn set_base_size(&mut self, size: TextureSize, inherited: bool) -> bool {
        self.base_size = size;
        if inherited || self.size == size {
            return false;
        }
        self.size = size;
        true
    }

    /// Behavior
    pub fn behavior(&self) -> &NodeBehavior {
        &self.behavior
    }

    /// Logic state, for logic nodes
    pub fn logic(&self) -> Option<&LogicNode> {
        match &self.behavior {
            NodeBehavior::Logic(logic) => Some(logic),
            NodeBehavior::Rendered(_) => None,
        }
    }

    /// Last calculated value of a logic node
    pub fn output_value(&self) -> Option<&PropertyValue> {
        self.logic().and_then(LogicNode::result)
    }

    /// Kind of value a logic node yields
    pub fn logic_output_kind(&self) -> Option<PropertyKind> {
        let constant = self.property("value").map(Property::kind);
        self.logic().map(|logic| logic.op.output_kind(constant))
    }

    /// What kind of socket `name` is on this node, if it can receive a
    /// connection right now
    pub fn socket_kind(&self, name: &str) -> Option<SocketKind> {
        if self.inputs.iter().any(|i| i == name) {
            return Some(SocketKind::Input);
        }
        self.property(name)
            .filter(|p| p.is_exposed())
            .map(|_| SocketKind::ExposedProperty)
    }

    /// Summary handed to downstream hooks
    pub fn upstream_info(&self) -> UpstreamInfo {
        UpstreamInfo {
            id: self.id,
            kind: self.kind,
            size: self.size,
        }
    }

    fn context(&mut self) -> (&mut NodeBehavior, NodeContext<'_>) {
        (
            &mut self.behavior,
            NodeContext {
                properties: &mut self.properties,
                size: &mut self.size,
                base_size: self.base_size,
                parent_input_name: self.parent_input_name.as_deref(),
            },
        )
    }

    /// Run the one-time init hook; later calls are no-ops
    pub(crate) fn attach(&mut self, settings: &DesignerSettings) {
        if self.initialized {
            return;
        }
        self.base_size = settings.default_texture_size;
        self.size = settings.default_texture_size;
        let (behavior, ctx) = self.context();
        behavior.init(ctx, settings);
        self.initialized = true;
    }

    pub(crate) fn on_connected(&mut self, input: &str, upstream: &UpstreamInfo) -> bool {
        let (behavior, ctx) = self.context();
        behavior.on_connected(ctx, input, upstream)
    }

    pub(crate) fn on_disconnected(&mut self, input: &str) -> bool {
        let (behavior, ctx) = self.context();
        behavior.on_disconnected(ctx, input)
    }

    pub(crate) fn pre_render(&mut self, parent: Option<&UpstreamInfo>) -> bool {
        let (behavior, ctx) = self.context();
        behavior.pre_render(ctx, parent)
    }

    /// Run a logic node's calculation and cache the result
    pub(crate) fn calculate(&mut self, props: &ResolvedProperties) -> Option<PropertyValue> {
        let NodeBehavior::Logic(logic) = &mut self.behavior else {
            return None;
        };
        let result = logic.calculate(props);
        logic.set_result(result.clone());
        result
    }
}

/// Registry of available node types
pub struct NodeRegistry {
    /// Registered node types by factory key
    types: indexmap::IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: indexmap::IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.type_name.clone(), node_type);
    }

    /// Get a node type by factory key
    pub fn get(&self, type_name: &str) -> Option<&NodeType> {
        self.types.get(type_name)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a node from a factory key
    pub fn create_node(&self, type_name: &str) -> Option<Node> {
        self.get(type_name).map(Node::new)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::LogicOp;

    fn blend_type() -> NodeType {
        NodeType::new("blend", "Blend", NodeCategory::Filter, NodeKind::Texture)
            .with_inputs(&["colorA", "colorB"])
            .with_properties(vec![Property::float("opacity", "Opacity", 1.0).exposed()])
            .with_parent_input("colorA")
    }

    fn settings() -> DesignerSettings {
        DesignerSettings {
            default_texture_size: TextureSize::new(256, 256),
            ..DesignerSettings::default()
        }
    }

    #[test]
    fn test_create_from_registry() {
        let mut registry = NodeRegistry::new();
        registry.register(blend_type());

        let node = registry.create_node("blend").unwrap();
        assert_eq!(node.type_name, "blend");
        assert_eq!(node.inputs(), ["colorA".to_string(), "colorB".to_string()]);
        assert!(node.needs_update());
        assert!(!node.is_initialized());
        assert!(registry.create_node("missing").is_none());
        assert_eq!(registry.types_in_category(NodeCategory::Filter).count(), 1);
    }

    #[test]
    fn test_socket_kind() {
        let mut node = Node::new(&blend_type());
        assert_eq!(node.socket_kind("colorA"), Some(SocketKind::Input));
        assert_eq!(node.socket_kind("opacity"), Some(SocketKind::ExposedProperty));
        assert_eq!(node.socket_kind("nothing"), None);

        node.property_mut("opacity").unwrap().set_exposed(false);
        assert_eq!(node.socket_kind("opacity"), None);
    }

    #[test]
    fn test_attach_runs_once() {
        let seeded = NodeType::new("noise", "Noise", NodeCategory::Generator, NodeKind::Procedural)
            .with_properties(vec![Property::int("seed", "Seed", 0)]);
        let mut node = Node::new(&seeded);

        node.attach(&settings());
        assert!(node.is_initialized());
        assert_eq!(node.size(), TextureSize::new(256, 256));
        assert_eq!(node.property("seed").unwrap().value(), &PropertyValue::Int(32));

        node.property_mut("seed").unwrap().set_value(PropertyValue::Int(5)).unwrap();
        node.attach(&settings());
        assert_eq!(node.property("seed").unwrap().value(), &PropertyValue::Int(5));
    }

    #[test]
    fn test_oversized_seed_keeps_default() {
        let seeded = NodeType::new("noise", "Noise", NodeCategory::Generator, NodeKind::Procedural)
            .with_properties(vec![Property::int("seed", "Seed", 7)]);
        let mut node = Node::new(&seeded);

        node.attach(&DesignerSettings {
            random_seed: u32::MAX,
            ..settings()
        });
        assert!(node.is_initialized());
        assert_eq!(node.property("seed").unwrap().value(), &PropertyValue::Int(7));

        let float_seed = NodeType::new("grain", "Grain", NodeCategory::Generator, NodeKind::Procedural)
            .with_properties(vec![Property::float("seed", "Seed", 0.5)]);
        let mut node = Node::new(&float_seed);
        node.attach(&settings());
        assert_eq!(node.property("seed").unwrap().value(), &PropertyValue::Float(0.5));
    }

    #[test]
    fn test_logic_output_kind() {
        let logic = |op, properties| {
            let node_type = NodeType::new("logic", "Logic", NodeCategory::Logic, NodeKind::Logic)
                .with_properties(properties)
                .with_behavior(NodeBehavior::Logic(LogicNode::new(op)));
            Node::new(&node_type)
        };

        let constant = logic(LogicOp::Constant, vec![Property::int("value", "Value", 3)]);
        assert_eq!(constant.logic_output_kind(), Some(PropertyKind::Int));
        let compare = logic(LogicOp::Compare, vec![Property::float("a", "A", 0.0)]);
        assert_eq!(compare.logic_output_kind(), Some(PropertyKind::Bool));
        let format = logic(LogicOp::StringFormat, Vec::new());
        assert_eq!(format.logic_output_kind(), Some(PropertyKind::String));
        assert_eq!(Node::new(&blend_type()).logic_output_kind(), None);
    }

    #[test]
    fn test_parent_input_resizes() {
        let mut node = Node::new(&blend_type());
        node.attach(&settings());

        let upstream = UpstreamInfo {
            id: NodeId::new(),
            kind: NodeKind::Procedural,
            size: TextureSize::new(64, 32),
        };
        assert!(!node.on_connected("colorB", &upstream));
        assert!(node.on_connected("colorA", &upstream));
        assert_eq!(node.size(), TextureSize::new(64, 32));
        assert!(!node.pre_render(Some(&upstream)));

        assert!(node.on_disconnected("colorA"));
        assert_eq!(node.size(), TextureSize::new(256, 256));
    }

    #[test]
    fn test_set_base_size() {
        let mut node = Node::new(&blend_type());
        node.attach(&settings());

        assert!(!node.set_base_size(TextureSize::new(64, 64), true));
        assert_eq!(node.size(), TextureSize::new(256, 256));
        assert_eq!(node.base_size(), TextureSize::new(64, 64));

        assert!(node.set_base_size(TextureSize::new(128, 128), false));
        assert_eq!(node.size(), TextureSize::new(128, 128));
        assert!(!node.set_base_size(TextureSize::new(128, 128), false));
    }

    #[test]
    fn test_disconnect_resets_parent_value() {
        let mut node = Node::new(&blend_type());
        node.property_mut("opacity")
            .unwrap()
            .set_parent_value(PropertyValue::Float(0.2))
            .unwrap();

        node.on_disconnected("opacity");
        assert_eq!(node.property("opacity").unwrap().parent_value(), &PropertyValue::Float(1.0));
    }

    #[test]
    fn test_logic_calculate_caches_result() {
        let not = NodeType::new("not", "Not", NodeCategory::Logic, NodeKind::Logic)
            .with_properties(vec![Property::bool("a", "A", false)])
            .with_behavior(NodeBehavior::Logic(LogicNode::new(LogicOp::Not)));
        let mut node = Node::new(&not);
        assert_eq!(node.output_value(), None);

        let mut props = ResolvedProperties::new();
        props.insert("a".into(), PropertyValue::Bool(false));
        assert_eq!(node.calculate(&props), Some(PropertyValue::Bool(true)));
        assert_eq!(node.output_value(), Some(&PropertyValue::Bool(true)));
    }
}
