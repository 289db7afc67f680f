// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flat-color preview renderer.
//!
//! Each node renders to a single RGBA color: generators emit their main
//! color, filters combine their inputs. Enough to check a graph's wiring
//! from the terminal without a GPU.

use procgen_editor_graph::library::BLEND_MODES;
use procgen_editor_graph::{NodeId, PropertyValue, RenderError, RenderOutput, RenderRequest, Renderer, Thumbnail};
use std::collections::HashMap;

type Rgba = [f32; 4];

const BLACK: Rgba = [0.0, 0.0, 0.0, 1.0];
const MID_GRAY: Rgba = [0.5, 0.5, 0.5, 1.0];

/// Renders every node to one color
#[derive(Debug, Default)]
pub struct FlatColorRenderer {
    colors: HashMap<NodeId, Rgba>,
}

impl FlatColorRenderer {
    /// Last color rendered for a node
    pub fn color(&self, node_id: NodeId) -> Option<Rgba> {
        self.colors.get(&node_id).copied()
    }

    fn input(&self, request: &RenderRequest<'_>, socket: &str) -> Option<Rgba> {
        request.input(socket).and_then(|node| self.color(node.id))
    }
}

fn color_property(request: &RenderRequest<'_>, name: &str) -> Option<Rgba> {
    request.properties.get(name).and_then(PropertyValue::as_color)
}

fn blend(mode: &str, a: Rgba, b: Rgba, opacity: f32) -> Rgba {
    let mut out = a;
    for i in 0..3 {
        let mixed = match mode {
            "multiply" => a[i] * b[i],
            "add" => (a[i] + b[i]).min(1.0),
            "subtract" => (a[i] - b[i]).max(0.0),
            _ => b[i],
        };
        out[i] = a[i] + (mixed - a[i]) * opacity;
    }
    out
}

impl Renderer for FlatColorRenderer {
    fn render(&mut self, request: &RenderRequest<'_>) -> Result<RenderOutput, RenderError> {
        let node = request.node;
        let color = match node.type_name.as_str() {
            "color" | "text" => color_property(request, "color").unwrap_or(BLACK),
            "gradient" => match request.properties.get("gradient") {
                Some(PropertyValue::Gradient(gradient)) => gradient.sample(0.5),
                _ => MID_GRAY,
            },
            "invert" => {
                let c = self.input(request, "color").unwrap_or(BLACK);
                [1.0 - c[0], 1.0 - c[1], 1.0 - c[2], c[3]]
            }
            "blend" => {
                let a = self.input(request, "colorA").unwrap_or(BLACK);
                let b = self.input(request, "colorB").unwrap_or(BLACK);
                let mode = match request.properties.get("mode") {
                    Some(PropertyValue::Enum(index)) => BLEND_MODES.get(*index).copied().unwrap_or("normal"),
                    _ => "normal",
                };
                let opacity = request
                    .properties
                    .get("opacity")
                    .and_then(PropertyValue::as_f32)
                    .unwrap_or(1.0);
                blend(mode, a, b, opacity)
            }
            "transform" | "output" => self.input(request, "image").unwrap_or(BLACK),
            other => {
                tracing::debug!(type_name = other, "No flat preview, using gray");
                MID_GRAY
            }
        };

        tracing::trace!(node = %node.id, ?color, "Rendered flat color");
        self.colors.insert(node.id, color);
        Ok(RenderOutput {
            thumbnail: Some(Thumbnail::solid(request.thumbnail_size, color)),
        })
    }
}

/// Format a color as `#rrggbbaa`
pub fn to_hex(color: Rgba) -> String {
    color
        .iter()
        .map(|c| format!("{:02x}", (c.clamp(0.0, 1.0) * 255.0).round() as u8))
        .fold(String::from("#"), |mut out, byte| {
            out.push_str(&byte);
            out
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgen_editor_graph::{create_builtin_registry, Designer, DesignerSettings};

    fn designer() -> Designer {
        Designer::new(DesignerSettings {
            thumbnail_size: 4,
            ..DesignerSettings::default()
        })
    }

    #[test]
    fn test_blend_modes() {
        let a = [0.5, 0.5, 0.5, 1.0];
        let b = [0.5, 1.0, 0.0, 1.0];
        assert_eq!(blend("normal", a, b, 1.0), b);
        assert_eq!(blend("normal", a, b, 0.0), a);
        assert_eq!(blend("multiply", a, b, 1.0), [0.25, 0.5, 0.0, 1.0]);
        assert_eq!(blend("add", a, b, 1.0), [1.0, 1.0, 0.5, 1.0]);
        assert_eq!(blend("subtract", a, b, 1.0), [0.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex([1.0, 0.0, 0.5, 1.0]), "#ff0080ff");
    }

    #[test]
    fn test_blend_driven_by_logic_node() {
        let registry = create_builtin_registry();
        let mut designer = designer();
        let red = designer.add_node(registry.create_node("color").unwrap(), true).unwrap();
        let blue = designer.add_node(registry.create_node("color").unwrap(), true).unwrap();
        let mix = designer.add_node(registry.create_node("blend").unwrap(), true).unwrap();
        let amount = designer.add_node(registry.create_node("float").unwrap(), true).unwrap();

        designer
            .set_property_value(red, "color", PropertyValue::Color([1.0, 0.0, 0.0, 1.0]))
            .unwrap();
        designer
            .set_property_value(blue, "color", PropertyValue::Color([0.0, 0.0, 1.0, 1.0]))
            .unwrap();
        designer.set_property_value(amount, "value", 0.5f32).unwrap();
        designer.add_connection(red, mix, "colorA").unwrap();
        designer.add_connection(blue, mix, "colorB").unwrap();
        designer.add_connection(amount, mix, "opacity").unwrap();

        let mut renderer = FlatColorRenderer::default();
        designer.update(&mut renderer).unwrap();
        assert_eq!(renderer.color(mix), Some([0.5, 0.0, 0.5, 1.0]));
        assert!(renderer.color(amount).is_none());
    }

    #[test]
    fn test_thumbnail_uses_requested_size() {
        let registry = create_builtin_registry();
        let mut designer = designer();
        let node = designer.add_node(registry.create_node("gradient").unwrap(), true).unwrap();
        designer.update(&mut FlatColorRenderer::default()).unwrap();

        let thumbnail = designer.take_events().into_iter().find_map(|event| match event {
            procgen_editor_graph::DesignerEvent::ThumbnailGenerated(id, thumbnail) if id == node => Some(thumbnail),
            _ => None,
        });
        let thumbnail = thumbnail.unwrap();
        assert_eq!((thumbnail.width, thumbnail.height), (4, 4));
        assert_eq!(&thumbnail.pixels[..4], &[128, 128, 128, 255]);
    }
}
