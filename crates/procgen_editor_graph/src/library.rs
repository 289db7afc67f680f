// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node library.
//!
//! Generator, filter, text and logic node types. Rendering of texture nodes
//! is left to the host's [`Renderer`](crate::render::Renderer); only the
//! sockets, properties and size rules are declared here.

use crate::logic::{LogicNode, LogicOp, COMPARE_OPS};
use crate::node::{NodeBehavior, NodeCategory, NodeKind, NodeRegistry, NodeType};
use crate::property::{Gradient, Property, Transform2D};

/// Blend modes offered by the `blend` node, by index
pub const BLEND_MODES: &[&str] = &["normal", "multiply", "add", "subtract"];

/// Create the registry with every built-in node type
pub fn create_builtin_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_generators(&mut registry);
    register_filters(&mut registry);
    register_text(&mut registry);
    register_logic(&mut registry);
    registry
}

fn register_generators(registry: &mut NodeRegistry) {
    registry.register(
        NodeType::new("color", "Color", NodeCategory::Generator, NodeKind::Procedural)
            .with_description("Solid color")
            .with_properties(vec![Property::color("color", "Color", [1.0, 1.0, 1.0, 1.0])]),
    );

    registry.register(
        NodeType::new("gradient", "Gradient", NodeCategory::Generator, NodeKind::Procedural)
            .with_description("Linear color ramp")
            .with_properties(vec![
                Property::gradient("gradient", "Gradient", Gradient::default()),
                Property::float("angle", "Angle", 0.0).with_range(0.0, 360.0, 1.0),
            ]),
    );

    registry.register(
        NodeType::new("noise", "Noise", NodeCategory::Generator, NodeKind::Procedural)
            .with_description("Fractal value noise")
            .with_properties(vec![
                Property::int("seed", "Seed", 0),
                Property::float("scale", "Scale", 4.0).with_range(1.0, 64.0, 1.0).exposed(),
                Property::int("octaves", "Octaves", 4).with_range(1.0, 8.0, 1.0),
            ]),
    );

    // Backed by an asynchronously loaded file
    registry.register(
        NodeType::new("image", "Image", NodeCategory::Generator, NodeKind::Procedural)
            .with_description("Image loaded from disk")
            .with_properties(vec![Property::new(
                "file",
                "File",
                crate::property::PropertyValue::File(String::new()),
            )]),
    );
}

fn register_filters(registry: &mut NodeRegistry) {
    registry.register(
        NodeType::new("invert", "Invert", NodeCategory::Color, NodeKind::Texture)
            .with_description("Inverts color channels")
            .with_inputs(&["color"])
            .with_parent_input("color"),
    );

    registry.register(
        NodeType::new("blend", "Blend", NodeCategory::Filter, NodeKind::Texture)
            .with_description("Blends two inputs")
            .with_inputs(&["colorA", "colorB"])
            .with_parent_input("colorA")
            .with_properties(vec![
                Property::enumeration("mode", "Blend Mode", BLEND_MODES, 0),
                Property::float("opacity", "Opacity", 1.0).with_range(0.0, 1.0, 0.01).exposed(),
            ]),
    );

    registry.register(
        NodeType::new("transform", "Transform", NodeCategory::Filter, NodeKind::Texture)
            .with_description("Translates, scales and rotates the input")
            .with_inputs(&["image"])
            .with_parent_input("image")
            .with_properties(vec![
                Property::transform("transform", "Transform", Transform2D::default()),
                Property::bool("tile", "Tile", true),
            ]),
    );

    registry.register(
        NodeType::new("output", "Output", NodeCategory::Output, NodeKind::Texture)
            .with_description("Final texture output")
            .with_inputs(&["image"])
            .with_outputs(&[])
            .with_parent_input("image")
            .with_properties(vec![Property::string("name", "Name", "output")]),
    );
}

fn register_text(registry: &mut NodeRegistry) {
    registry.register(
        NodeType::new("text", "Text", NodeCategory::Text, NodeKind::Text)
            .with_description("Rasterized text")
            .with_properties(vec![
                Property::string("text", "Text", "Text").exposed(),
                Property::new("font", "Font", crate::property::PropertyValue::Asset(String::new())),
                Property::float("size", "Size", 12.0).with_range(1.0, 256.0, 1.0),
                Property::color("color", "Color", [1.0, 1.0, 1.0, 1.0]),
                Property::vector2("position", "Position", [0.5, 0.5]),
            ]),
    );
}

fn logic(type_name: &str, title: &str, op: LogicOp, properties: Vec<Property>) -> NodeType {
    NodeType::new(type_name, title, NodeCategory::Logic, NodeKind::Logic)
        .with_properties(properties)
        .with_behavior(NodeBehavior::Logic(LogicNode::new(op)))
}

fn register_logic(registry: &mut NodeRegistry) {
    registry.register(logic("float", "Float", LogicOp::Constant, vec![Property::float("value", "Value", 0.0).exposed()]));
    registry.register(logic("int", "Int", LogicOp::Constant, vec![Property::int("value", "Value", 0).exposed()]));
    registry.register(logic("bool", "Bool", LogicOp::Constant, vec![Property::bool("value", "Value", false).exposed()]));

    let pair = || vec![Property::bool("a", "A", false).exposed(), Property::bool("b", "B", false).exposed()];
    registry.register(logic("and", "And", LogicOp::And, pair()));
    registry.register(logic("or", "Or", LogicOp::Or, pair()));
    registry.register(logic("xor", "Xor", LogicOp::Xor, pair()));
    registry.register(logic("not", "Not", LogicOp::Not, vec![Property::bool("a", "A", false).exposed()]));

    registry.register(logic(
        "compare",
        "Compare",
        LogicOp::Compare,
        vec![
            Property::float("a", "A", 0.0).exposed(),
            Property::float("b", "B", 0.0).exposed(),
            Property::enumeration("op", "Operator", COMPARE_OPS, 0),
        ],
    ));

    registry.register(logic(
        "remap",
        "Remap",
        LogicOp::Remap,
        vec![
            Property::float("value", "Value", 0.0).exposed(),
            Property::float("in_min", "In Min", 0.0).exposed(),
            Property::float("in_max", "In Max", 1.0).exposed(),
            Property::float("out_min", "Out Min", 0.0).exposed(),
            Property::float("out_max", "Out Max", 1.0).exposed(),
        ],
    ));

    registry.register(logic(
        "string_format",
        "Format",
        LogicOp::StringFormat,
        vec![
            Property::string("format", "Format", "{a}").exposed(),
            Property::float("a", "A", 0.0).exposed(),
            Property::float("b", "B", 0.0).exposed(),
        ],
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contents() {
        let registry = create_builtin_registry();
        for name in [
            "color", "gradient", "noise", "image", "invert", "blend", "transform", "output", "text", "float",
            "int", "bool", "and", "or", "xor", "not", "compare", "remap", "string_format",
        ] {
            assert!(registry.get(name).is_some(), "missing node type {name}");
        }
        assert_eq!(registry.types_in_category(NodeCategory::Logic).count(), 10);
    }

    #[test]
    fn test_logic_nodes_are_not_rendered() {
        let registry = create_builtin_registry();
        for node_type in registry.types() {
            let is_logic = matches!(node_type.behavior, NodeBehavior::Logic(_));
            assert_eq!(is_logic, !node_type.kind.is_rendered(), "{}", node_type.type_name);
        }
    }

    #[test]
    fn test_parent_inputs_are_declared() {
        let registry = create_builtin_registry();
        for node_type in registry.types() {
            if let Some(parent) = &node_type.parent_input {
                assert!(node_type.inputs.contains(parent), "{}", node_type.type_name);
            }
        }
    }
}
