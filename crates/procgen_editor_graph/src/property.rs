// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed node properties.
//!
//! A [`Property`] holds a local value plus a cached `parent_value` that is
//! fed by an upstream producer when the property is exposed as a socket.
//! Values are a closed enum over [`PropertyKind`], so every consumer matches
//! exhaustively instead of probing concrete property types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of value a property stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Floating point scalar
    Float,
    /// Integer scalar
    Int,
    /// Boolean flag
    Bool,
    /// RGBA color
    Color,
    /// Index into a list of option labels
    Enum,
    /// Text
    String,
    /// Color ramp
    Gradient,
    /// 2D affine transform (position, scale, rotation)
    Transform2D,
    /// 2D vector
    Vector2,
    /// Reference to a library asset
    Asset,
    /// Path to a file on disk
    File,
}

impl PropertyKind {
    /// Get the display name for this kind
    pub fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Color => "color",
            Self::Enum => "enum",
            Self::String => "string",
            Self::Gradient => "gradient",
            Self::Transform2D => "transform2d",
            Self::Vector2 => "vector2",
            Self::Asset => "asset",
            Self::File => "file",
        }
    }

    /// Zero value used when a property or variable is created without one
    pub fn default_value(self) -> PropertyValue {
        match self {
            Self::Float => PropertyValue::Float(0.0),
            Self::Int => PropertyValue::Int(0),
            Self::Bool => PropertyValue::Bool(false),
            Self::Color => PropertyValue::Color([0.0, 0.0, 0.0, 1.0]),
            Self::Enum => PropertyValue::Enum(0),
            Self::String => PropertyValue::String(String::new()),
            Self::Gradient => PropertyValue::Gradient(Gradient::default()),
            Self::Transform2D => PropertyValue::Transform2D(Transform2D::default()),
            Self::Vector2 => PropertyValue::Vector2([0.0, 0.0]),
            Self::Asset => PropertyValue::Asset(String::new()),
            Self::File => PropertyValue::File(String::new()),
        }
    }

    /// Whether values of this kind convert into `target` through
    /// [`PropertyValue::coerce_to`]
    pub fn coerces_to(self, target: PropertyKind) -> bool {
        if self == target {
            return true;
        }
        match target {
            Self::Float | Self::Int => matches!(self, Self::Float | Self::Int | Self::Bool | Self::Enum),
            Self::Bool => matches!(self, Self::Float | Self::Int),
            Self::String => true,
            _ => false,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single stop on a gradient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientPoint {
    /// Position along the ramp, 0..=1
    pub position: f32,
    /// Color at this stop
    pub color: [f32; 4],
}

/// Color ramp made of sorted stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    /// Stops, kept sorted by position
    pub points: Vec<GradientPoint>,
}

impl Gradient {
    /// Create a gradient from unsorted stops
    pub fn new(mut points: Vec<GradientPoint>) -> Self {
        points.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self { points }
    }

    /// Sample the ramp at `t` with linear interpolation between stops
    pub fn sample(&self, t: f32) -> [f32; 4] {
        let t = t.clamp(0.0, 1.0);
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return [0.0, 0.0, 0.0, 1.0];
        };
        if t <= first.position {
            return first.color;
        }
        if t >= last.position {
            return last.color;
        }

        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t >= a.position && t <= b.position {
                let span = b.position - a.position;
                let f = if span > f32::EPSILON { (t - a.position) / span } else { 0.0 };
                let mut out = [0.0; 4];
                for (i, channel) in out.iter_mut().enumerate() {
                    *channel = a.color[i] + (b.color[i] - a.color[i]) * f;
                }
                return out;
            }
        }
        last.color
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self::new(vec![
            GradientPoint { position: 0.0, color: [0.0, 0.0, 0.0, 1.0] },
            GradientPoint { position: 1.0, color: [1.0, 1.0, 1.0, 1.0] },
        ])
    }
}

/// 2D transform applied to a texture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    /// Translation
    pub position: [f32; 2],
    /// Scale
    pub scale: [f32; 2],
    /// Rotation in degrees
    pub rotation: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0],
            scale: [1.0, 1.0],
            rotation: 0.0,
        }
    }
}

/// Value stored in a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Float
    Float(f32),
    /// Integer
    Int(i32),
    /// Boolean
    Bool(bool),
    /// RGBA color
    Color([f32; 4]),
    /// Selected option index
    Enum(usize),
    /// String
    String(String),
    /// Gradient
    Gradient(Gradient),
    /// Transform
    Transform2D(Transform2D),
    /// 2D vector
    Vector2([f32; 2]),
    /// Asset identifier (empty = none)
    Asset(String),
    /// File path (empty = none)
    File(String),
}

impl PropertyValue {
    /// Get the kind of this value
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Float(_) => PropertyKind::Float,
            Self::Int(_) => PropertyKind::Int,
            Self::Bool(_) => PropertyKind::Bool,
            Self::Color(_) => PropertyKind::Color,
            Self::Enum(_) => PropertyKind::Enum,
            Self::String(_) => PropertyKind::String,
            Self::Gradient(_) => PropertyKind::Gradient,
            Self::Transform2D(_) => PropertyKind::Transform2D,
            Self::Vector2(_) => PropertyKind::Vector2,
            Self::Asset(_) => PropertyKind::Asset,
            Self::File(_) => PropertyKind::File,
        }
    }

    /// Numeric view used by logic nodes: floats, ints, bools and enum indices
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            Self::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Self::Enum(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Truthiness used by logic nodes
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Int(v) => Some(*v != 0),
            Self::Float(v) => Some(*v != 0.0),
            _ => None,
        }
    }

    /// Get the color, if this is a color value
    pub fn as_color(&self) -> Option<[f32; 4]> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Get the string payload of string-like values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Asset(s) | Self::File(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into `kind` where a scalar conversion exists
    pub fn coerce_to(&self, kind: PropertyKind) -> Option<PropertyValue> {
        if self.kind() == kind {
            return Some(self.clone());
        }
        match kind {
            PropertyKind::Float => self.as_f32().map(PropertyValue::Float),
            PropertyKind::Int => self.as_f32().map(|v| PropertyValue::Int(v.round() as i32)),
            PropertyKind::Bool => self.as_bool().map(PropertyValue::Bool),
            PropertyKind::String => Some(PropertyValue::String(self.to_display_string())),
            _ => None,
        }
    }

    /// Render the value as plain text for string interpolation
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Float(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Enum(v) => v.to_string(),
            Self::String(s) | Self::Asset(s) | Self::File(s) => s.clone(),
            Self::Color(c) => format!("({}, {}, {}, {})", c[0], c[1], c[2], c[3]),
            Self::Vector2(v) => format!("({}, {})", v[0], v[1]),
            Self::Gradient(g) => format!("gradient[{}]", g.points.len()),
            Self::Transform2D(t) => format!(
                "translate({}, {}) scale({}, {}) rotate({})",
                t.position[0], t.position[1], t.scale[0], t.scale[1], t.rotation
            ),
        }
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Allowed range for numeric properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
    /// UI step
    pub step: f32,
}

/// A typed, named value owned by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Name, unique within the owning node
    pub name: String,
    /// Name shown in the inspector
    pub display_name: String,
    /// Local value
    value: PropertyValue,
    /// Whether the property can be driven through a socket
    exposed: bool,
    /// Last value received from an upstream producer
    parent_value: PropertyValue,
    /// Range for float/int properties
    #[serde(default)]
    pub range: Option<NumericRange>,
    /// Option labels for enum properties
    #[serde(default)]
    pub options: Vec<String>,
}

impl Property {
    /// Create a new property
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            parent_value: value.clone(),
            value,
            exposed: false,
            range: None,
            options: Vec::new(),
        }
    }

    /// Create a float property
    pub fn float(name: impl Into<String>, display_name: impl Into<String>, value: f32) -> Self {
        Self::new(name, display_name, PropertyValue::Float(value))
    }

    /// Create an integer property
    pub fn int(name: impl Into<String>, display_name: impl Into<String>, value: i32) -> Self {
        Self::new(name, display_name, PropertyValue::Int(value))
    }

    /// Create a boolean property
    pub fn bool(name: impl Into<String>, display_name: impl Into<String>, value: bool) -> Self {
        Self::new(name, display_name, PropertyValue::Bool(value))
    }

    /// Create a color property
    pub fn color(name: impl Into<String>, display_name: impl Into<String>, value: [f32; 4]) -> Self {
        Self::new(name, display_name, PropertyValue::Color(value))
    }

    /// Create an enum property with the given option labels
    pub fn enumeration(
        name: impl Into<String>,
        display_name: impl Into<String>,
        options: &[&str],
        index: usize,
    ) -> Self {
        let mut prop = Self::new(name, display_name, PropertyValue::Enum(index));
        prop.options = options.iter().map(|o| (*o).to_string()).collect();
        prop
    }

    /// Create a string property
    pub fn string(name: impl Into<String>, display_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, display_name, PropertyValue::String(value.into()))
    }

    /// Create a gradient property
    pub fn gradient(name: impl Into<String>, display_name: impl Into<String>, value: Gradient) -> Self {
        Self::new(name, display_name, PropertyValue::Gradient(value))
    }

    /// Create a transform property
    pub fn transform(name: impl Into<String>, display_name: impl Into<String>, value: Transform2D) -> Self {
        Self::new(name, display_name, PropertyValue::Transform2D(value))
    }

    /// Create a 2D vector property
    pub fn vector2(name: impl Into<String>, display_name: impl Into<String>, value: [f32; 2]) -> Self {
        Self::new(name, display_name, PropertyValue::Vector2(value))
    }

    /// Set the numeric range
    pub fn with_range(mut self, min: f32, max: f32, step: f32) -> Self {
        self.range = Some(NumericRange { min, max, step });
        self
    }

    /// Mark as exposed
    pub fn exposed(mut self) -> Self {
        self.exposed = true;
        self
    }

    /// Get the kind
    pub fn kind(&self) -> PropertyKind {
        self.value.kind()
    }

    /// Get the local value
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Get the cached upstream value
    pub fn parent_value(&self) -> &PropertyValue {
        &self.parent_value
    }

    /// Whether the property accepts a connection
    pub fn is_exposed(&self) -> bool {
        self.exposed
    }

    pub(crate) fn set_exposed(&mut self, exposed: bool) {
        self.exposed = exposed;
    }

    /// Pick the value an evaluator should read, given whether a producer
    /// currently feeds this property's socket
    pub fn resolve(&self, connected: bool) -> &PropertyValue {
        if self.exposed && connected {
            &self.parent_value
        } else {
            &self.value
        }
    }

    /// Set the local value, clamping numerics into range
    pub fn set_value(&mut self, value: PropertyValue) -> Result<(), PropertyError> {
        self.value = self.check(value)?;
        Ok(())
    }

    /// Set the cached upstream value
    pub fn set_parent_value(&mut self, value: PropertyValue) -> Result<(), PropertyError> {
        self.parent_value = self.check(value)?;
        Ok(())
    }

    /// Drop the cached upstream value back to the local one
    pub fn reset_parent_value(&mut self) {
        self.parent_value = self.value.clone();
    }

    /// Narrow the range and enum options so every value this property
    /// accepts is stored unchanged by `other`.
    ///
    /// Returns `false`, leaving the property untouched, when the two ranges
    /// do not overlap. The current value is clamped into the narrowed range.
    pub(crate) fn constrain_to(&mut self, other: &Property) -> bool {
        let range = match (self.range, other.range) {
            (Some(a), Some(b)) => {
                let (min, max) = (a.min.max(b.min), a.max.min(b.max));
                if min > max {
                    return false;
                }
                Some(NumericRange {
                    min,
                    max,
                    step: a.step.min(b.step),
                })
            }
            (a, b) => a.or(b),
        };
        self.range = range;

        if !other.options.is_empty() && (self.options.is_empty() || other.options.len() < self.options.len()) {
            self.options = other.options.clone();
        }

        let value = self
            .check(self.value.clone())
            .unwrap_or_else(|_| self.kind().default_value());
        self.parent_value = value.clone();
        self.value = value;
        true
    }

    fn check(&self, value: PropertyValue) -> Result<PropertyValue, PropertyError> {
        if value.kind() != self.kind() {
            return Err(PropertyError::KindMismatch {
                property: self.name.clone(),
                expected: self.kind(),
                found: value.kind(),
            });
        }

        Ok(match value {
            PropertyValue::Float(v) => match self.range {
                Some(r) => PropertyValue::Float(v.clamp(r.min, r.max)),
                None => PropertyValue::Float(v),
            },
            PropertyValue::Int(v) => match self.range {
                Some(r) => PropertyValue::Int(v.clamp(r.min as i32, r.max as i32)),
                None => PropertyValue::Int(v),
            },
            PropertyValue::Enum(index) if !self.options.is_empty() && index >= self.options.len() => {
                return Err(PropertyError::EnumOutOfRange {
                    property: self.name.clone(),
                    index,
                    options: self.options.len(),
                });
            }
            other => other,
        })
    }
}

/// Error when writing a property
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// Value kind does not match the property kind
    #[error("Property '{property}' expects {expected}, got {found}")]
    KindMismatch {
        /// Property name
        property: String,
        /// Kind of the property
        expected: PropertyKind,
        /// Kind of the rejected value
        found: PropertyKind,
    },

    /// Enum index beyond the option list
    #[error("Property '{property}' has {options} options, index {index} is out of range")]
    EnumOutOfRange {
        /// Property name
        property: String,
        /// Rejected index
        index: usize,
        /// Number of options
        options: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_value_checks_kind() {
        let mut prop = Property::float("amount", "Amount", 0.5);
        assert!(prop.set_value(PropertyValue::Float(0.25)).is_ok());
        assert_eq!(prop.value(), &PropertyValue::Float(0.25));

        let err = prop.set_value(PropertyValue::Bool(true)).unwrap_err();
        assert!(matches!(err, PropertyError::KindMismatch { expected: PropertyKind::Float, found: PropertyKind::Bool, .. }));
        assert_eq!(prop.value(), &PropertyValue::Float(0.25));
    }

    #[test]
    fn test_range_clamps() {
        let mut prop = Property::float("opacity", "Opacity", 1.0).with_range(0.0, 1.0, 0.01);
        prop.set_value(PropertyValue::Float(4.0)).unwrap();
        assert_eq!(prop.value(), &PropertyValue::Float(1.0));

        let mut count = Property::int("count", "Count", 2).with_range(1.0, 8.0, 1.0);
        count.set_value(PropertyValue::Int(-3)).unwrap();
        assert_eq!(count.value(), &PropertyValue::Int(1));
    }

    #[test]
    fn test_enum_rejects_out_of_range() {
        let mut prop = Property::enumeration("op", "Operation", &["greater", "less"], 0);
        assert!(prop.set_value(PropertyValue::Enum(1)).is_ok());
        assert!(matches!(
            prop.set_value(PropertyValue::Enum(2)),
            Err(PropertyError::EnumOutOfRange { index: 2, options: 2, .. })
        ));
    }

    #[test]
    fn test_resolve_uses_parent_only_when_exposed_and_connected() {
        let mut prop = Property::float("amount", "Amount", 0.5);
        prop.set_parent_value(PropertyValue::Float(0.9)).unwrap();

        assert_eq!(prop.resolve(true), &PropertyValue::Float(0.5));

        prop.set_exposed(true);
        assert_eq!(prop.resolve(false), &PropertyValue::Float(0.5));
        assert_eq!(prop.resolve(true), &PropertyValue::Float(0.9));

        prop.reset_parent_value();
        assert_eq!(prop.resolve(true), &PropertyValue::Float(0.5));
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Property::color("color", "Color", [1.0, 0.0, 0.0, 1.0]);
        let mut copy = original.clone();
        copy.set_value(PropertyValue::Color([0.0, 1.0, 0.0, 1.0])).unwrap();
        assert_eq!(original.value(), &PropertyValue::Color([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_gradient_sample() {
        let gradient = Gradient::default();
        let mid = gradient.sample(0.5);
        assert!((mid[0] - 0.5).abs() < 1e-6);
        assert_eq!(gradient.sample(-1.0), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(gradient.sample(2.0), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_coerce_scalars() {
        assert_eq!(PropertyValue::Bool(true).coerce_to(PropertyKind::Float), Some(PropertyValue::Float(1.0)));
        assert_eq!(PropertyValue::Float(2.6).coerce_to(PropertyKind::Int), Some(PropertyValue::Int(3)));
        assert_eq!(PropertyValue::Int(7).coerce_to(PropertyKind::String), Some(PropertyValue::String("7".into())));
        assert_eq!(PropertyValue::Float(1.0).coerce_to(PropertyKind::Color), None);
    }

    #[test]
    fn test_kind_coercion_matches_values() {
        assert!(PropertyKind::Bool.coerces_to(PropertyKind::Float));
        assert!(PropertyKind::Float.coerces_to(PropertyKind::Bool));
        assert!(PropertyKind::Color.coerces_to(PropertyKind::String));
        assert!(!PropertyKind::String.coerces_to(PropertyKind::Float));
        assert!(!PropertyKind::Bool.coerces_to(PropertyKind::Color));

        for kind in [PropertyKind::Float, PropertyKind::Int, PropertyKind::Bool, PropertyKind::String] {
            for target in [PropertyKind::Float, PropertyKind::Int, PropertyKind::Bool, PropertyKind::String, PropertyKind::Color] {
                assert_eq!(
                    kind.default_value().coerce_to(target).is_some(),
                    kind.coerces_to(target),
                    "{kind} -> {target}"
                );
            }
        }
    }

    #[test]
    fn test_constrain_to_intersects_ranges() {
        let mut template = Property::float("v", "V", 40.0);
        assert!(template.constrain_to(&Property::float("scale", "Scale", 4.0).with_range(1.0, 64.0, 1.0)));
        assert!(template.constrain_to(&Property::float("amount", "Amount", 0.0).with_range(0.0, 10.0, 0.1)));
        let range = template.range.unwrap();
        assert_eq!((range.min, range.max, range.step), (1.0, 10.0, 0.1));
        assert_eq!(template.value(), &PropertyValue::Float(10.0));

        assert!(!template.constrain_to(&Property::float("opacity", "Opacity", 1.0).with_range(20.0, 30.0, 1.0)));
        assert_eq!(template.range, Some(range));

        let mut choice = Property::new("mode", "Mode", PropertyValue::Enum(3));
        assert!(choice.constrain_to(&Property::enumeration("blend", "Blend", &["normal", "add"], 0)));
        assert_eq!(choice.options.len(), 2);
        assert_eq!(choice.value(), &PropertyValue::Enum(0));
    }

    #[test]
    fn test_default_values_match_kind() {
        for kind in [
            PropertyKind::Float,
            PropertyKind::Int,
            PropertyKind::Bool,
            PropertyKind::Color,
            PropertyKind::Enum,
            PropertyKind::String,
            PropertyKind::Gradient,
            PropertyKind::Transform2D,
            PropertyKind::Vector2,
            PropertyKind::Asset,
            PropertyKind::File,
        ] {
            assert_eq!(kind.default_value().kind(), kind);
        }
    }
}
