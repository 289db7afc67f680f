// SPDX-License-Identifier: MIT OR Apache-2.0
//! Logic nodes: nodes whose output is a value rather than a texture.
//!
//! A logic node's render step is [`LogicNode::calculate`], a pure function of
//! its evaluated properties. The result is cached on the node and pushed into
//! the `parent_value` of every exposed property it feeds.

use crate::property::{PropertyKind, PropertyValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Evaluated property values of a node, keyed by property name
pub type ResolvedProperties = IndexMap<String, PropertyValue>;

/// Options of the `op` property on comparison nodes, by index
pub const COMPARE_OPS: &[&str] = &["greater", "less", "equal", "not_equal", "greater_equal", "less_equal"];

/// Computation performed by a logic node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    /// Passes `value` through
    Constant,
    /// `a && b`
    And,
    /// `a || b`
    Or,
    /// `a ^ b`
    Xor,
    /// `!a`
    Not,
    /// Compares `a` and `b` with the operator selected by `op`
    Compare,
    /// Linear remap of `value` from `in_min..in_max` to `out_min..out_max`
    Remap,
    /// Replaces `{a}` and `{b}` in `format`
    StringFormat,
}

impl LogicOp {
    /// Kind of value this operation produces, given the node's `value`
    /// property kind for constants
    pub fn output_kind(self, constant_kind: Option<PropertyKind>) -> PropertyKind {
        match self {
            Self::Constant => constant_kind.unwrap_or(PropertyKind::Float),
            Self::And | Self::Or | Self::Xor | Self::Not | Self::Compare => PropertyKind::Bool,
            Self::Remap => PropertyKind::Float,
            Self::StringFormat => PropertyKind::String,
        }
    }
}

/// Behavior state of a logic node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicNode {
    /// Operation
    pub op: LogicOp,
    /// Last calculated result
    #[serde(skip)]
    result: Option<PropertyValue>,
}

impl LogicNode {
    /// Create a logic behavior for the given operation
    pub fn new(op: LogicOp) -> Self {
        Self { op, result: None }
    }

    /// Last calculated result, if the node has been evaluated
    pub fn result(&self) -> Option<&PropertyValue> {
        self.result.as_ref()
    }

    pub(crate) fn set_result(&mut self, value: Option<PropertyValue>) {
        self.result = value;
    }

    /// Compute the output from evaluated properties.
    ///
    /// Returns `None` when a required property is missing or has a kind the
    /// operation cannot read.
    pub fn calculate(&self, props: &ResolvedProperties) -> Option<PropertyValue> {
        let flag = |name: &str| props.get(name).and_then(PropertyValue::as_bool);
        let number = |name: &str| props.get(name).and_then(PropertyValue::as_f32);

        match self.op {
            LogicOp::Constant => props.get("value").cloned(),
            LogicOp::And => Some(PropertyValue::Bool(flag("a")? && flag("b")?)),
            LogicOp::Or => Some(PropertyValue::Bool(flag("a")? || flag("b")?)),
            LogicOp::Xor => Some(PropertyValue::Bool(flag("a")? ^ flag("b")?)),
            LogicOp::Not => Some(PropertyValue::Bool(!flag("a")?)),
            LogicOp::Compare => {
                let (a, b) = (number("a")?, number("b")?);
                let op = match props.get("op") {
                    Some(PropertyValue::Enum(index)) => *index,
                    _ => 0,
                };
                let result = match COMPARE_OPS.get(op).copied()? {
                    "greater" => a > b,
                    "less" => a < b,
                    "equal" => (a - b).abs() <= f32::EPSILON,
                    "not_equal" => (a - b).abs() > f32::EPSILON,
                    "greater_equal" => a >= b,
                    _ => a <= b,
                };
                Some(PropertyValue::Bool(result))
            }
            LogicOp::Remap => {
                let value = number("value")?;
                let (in_min, in_max) = (number("in_min")?, number("in_max")?);
                let (out_min, out_max) = (number("out_min")?, number("out_max")?);
                let span = in_max - in_min;
                if span.abs() <= f32::EPSILON {
                    return Some(PropertyValue::Float(out_min));
                }
                let t = (value - in_min) / span;
                Some(PropertyValue::Float(out_min + (out_max - out_min) * t))
            }
            LogicOp::StringFormat => {
                let format = props.get("format")?.as_str()?;
                let mut out = format.to_string();
                for key in ["a", "b"] {
                    if let Some(value) = props.get(key) {
                        out = out.replace(&format!("{{{key}}}"), &value.to_display_string());
                    }
                }
                Some(PropertyValue::String(out))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(values: &[(&str, PropertyValue)]) -> ResolvedProperties {
        values.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn test_boolean_ops() {
        let inputs = props(&[("a", true.into()), ("b", false.into())]);
        assert_eq!(LogicNode::new(LogicOp::And).calculate(&inputs), Some(PropertyValue::Bool(false)));
        assert_eq!(LogicNode::new(LogicOp::Or).calculate(&inputs), Some(PropertyValue::Bool(true)));
        assert_eq!(LogicNode::new(LogicOp::Xor).calculate(&inputs), Some(PropertyValue::Bool(true)));
        assert_eq!(LogicNode::new(LogicOp::Not).calculate(&inputs), Some(PropertyValue::Bool(false)));
    }

    #[test]
    fn test_compare() {
        let node = LogicNode::new(LogicOp::Compare);
        let mut inputs = props(&[("a", 2.0f32.into()), ("b", 1.0f32.into()), ("op", PropertyValue::Enum(0))]);
        assert_eq!(node.calculate(&inputs), Some(PropertyValue::Bool(true)));

        inputs.insert("op".into(), PropertyValue::Enum(1));
        assert_eq!(node.calculate(&inputs), Some(PropertyValue::Bool(false)));

        inputs.insert("b".into(), PropertyValue::Int(2));
        inputs.insert("op".into(), PropertyValue::Enum(2));
        assert_eq!(node.calculate(&inputs), Some(PropertyValue::Bool(true)));
    }

    #[test]
    fn test_remap() {
        let node = LogicNode::new(LogicOp::Remap);
        let inputs = props(&[
            ("value", 5.0f32.into()),
            ("in_min", 0.0f32.into()),
            ("in_max", 10.0f32.into()),
            ("out_min", 0.0f32.into()),
            ("out_max", 1.0f32.into()),
        ]);
        assert_eq!(node.calculate(&inputs), Some(PropertyValue::Float(0.5)));
    }

    #[test]
    fn test_remap_degenerate_range() {
        let node = LogicNode::new(LogicOp::Remap);
        let inputs = props(&[
            ("value", 5.0f32.into()),
            ("in_min", 1.0f32.into()),
            ("in_max", 1.0f32.into()),
            ("out_min", 3.0f32.into()),
            ("out_max", 4.0f32.into()),
        ]);
        assert_eq!(node.calculate(&inputs), Some(PropertyValue::Float(3.0)));
    }

    #[test]
    fn test_string_format() {
        let node = LogicNode::new(LogicOp::StringFormat);
        let inputs = props(&[
            ("format", "tile {a} of {b}".into()),
            ("a", PropertyValue::Int(3)),
            ("b", PropertyValue::Int(8)),
        ]);
        assert_eq!(node.calculate(&inputs), Some(PropertyValue::String("tile 3 of 8".into())));
    }

    #[test]
    fn test_missing_input_yields_none() {
        let node = LogicNode::new(LogicOp::And);
        assert_eq!(node.calculate(&props(&[("a", true.into())])), None);
    }
}
