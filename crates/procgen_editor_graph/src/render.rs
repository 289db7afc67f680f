// SPDX-License-Identifier: MIT OR Apache-2.0
//! Boundary to the external renderer.
//!
//! The designer decides *when* a node renders and resolves what it reads;
//! the [`Renderer`] produces the actual output resource. The core never
//! looks inside that resource.

use crate::logic::ResolvedProperties;
use crate::node::Node;

/// Everything a renderer needs to produce one node's output
#[derive(Debug)]
pub struct RenderRequest<'a> {
    /// Node being rendered (already resized to its parent input)
    pub node: &'a Node,
    /// Connected inputs as (socket name, producer), in declaration order
    pub inputs: Vec<(&'a str, &'a Node)>,
    /// Every property evaluated through its socket where exposed
    pub properties: ResolvedProperties,
    /// Requested thumbnail edge length
    pub thumbnail_size: u32,
}

impl<'a> RenderRequest<'a> {
    /// Producer connected to `socket`
    pub fn input(&self, socket: &str) -> Option<&'a Node> {
        self.inputs
            .iter()
            .find(|(name, _)| *name == socket)
            .map(|(_, node)| *node)
    }
}

/// Preview image produced alongside a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA8 pixel data
    pub pixels: Vec<u8>,
}

impl Thumbnail {
    /// Fill a thumbnail with one color (components in 0..=1)
    pub fn solid(size: u32, color: [f32; 4]) -> Self {
        let texel = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        let pixels = texel
            .iter()
            .copied()
            .cycle()
            .take((size as usize) * (size as usize) * 4)
            .collect();
        Self {
            width: size,
            height: size,
            pixels,
        }
    }
}

/// Result of a successful render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutput {
    /// Optional preview for the UI
    pub thumbnail: Option<Thumbnail>,
}

/// Failure reported by a renderer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Produces node outputs
pub trait Renderer {
    /// Render one node whose producers are all clean
    fn render(&mut self, request: &RenderRequest<'_>) -> Result<RenderOutput, RenderError>;
}

/// Renderer that produces nothing, for hosts that only evaluate logic
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _request: &RenderRequest<'_>) -> Result<RenderOutput, RenderError> {
        Ok(RenderOutput::default())
    }
}
