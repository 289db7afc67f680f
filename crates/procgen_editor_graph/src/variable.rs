// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named variables shared across node properties.
//!
//! A variable holds a template [`Property`] with the shared value and a list
//! of (node, property) bindings. Writing the variable is coordinated by
//! [`Designer::set_variable`](crate::designer::Designer::set_variable), which
//! fans the value out and re-dirties each bound node once.

use crate::node::NodeId;
use crate::property::{Property, PropertyError, PropertyKind, PropertyValue};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableId(pub Uuid);

impl VariableId {
    /// Create a new random variable ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VariableId {
    fn default() -> Self {
        Self::new()
    }
}

/// A property driven by a variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableBinding {
    /// Bound node
    pub node_id: NodeId,
    /// Property on that node
    pub property_name: String,
}

impl VariableBinding {
    /// Create a binding
    pub fn new(node_id: NodeId, property_name: &str) -> Self {
        Self {
            node_id,
            property_name: property_name.to_string(),
        }
    }
}

/// A named shared value
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Unique id
    pub id: VariableId,
    /// Name, unique within the registry
    pub name: String,
    property: Property,
    bindings: Vec<VariableBinding>,
}

impl Variable {
    /// Create a variable holding the default value of `kind`
    pub fn new(name: &str, display_name: &str, kind: PropertyKind) -> Self {
        Self::from_property(VariableId::new(), Property::new(name, display_name, kind.default_value()))
    }

    /// Create a variable around an existing template property
    pub fn from_property(id: VariableId, property: Property) -> Self {
        Self {
            id,
            name: property.name.clone(),
            property,
            bindings: Vec::new(),
        }
    }

    /// Kind of value the variable carries
    pub fn kind(&self) -> PropertyKind {
        self.property.kind()
    }

    /// Name shown in the UI
    pub fn display_name(&self) -> &str {
        &self.property.display_name
    }

    /// Template property holding the shared value
    pub fn property(&self) -> &Property {
        &self.property
    }

    /// Current shared value
    pub fn value(&self) -> &PropertyValue {
        self.property.value()
    }

    /// Bindings in the order they were added
    pub fn bindings(&self) -> &[VariableBinding] {
        &self.bindings
    }

    /// Bound nodes, each listed once
    pub fn bound_nodes(&self) -> IndexSet<NodeId> {
        self.bindings.iter().map(|b| b.node_id).collect()
    }

    /// Store a new shared value, clamped into the range every binding accepts
    pub(crate) fn set_value(&mut self, value: PropertyValue) -> Result<(), VariableError> {
        self.property.set_value(value).map_err(|err| match err {
            PropertyError::KindMismatch { .. } => VariableError::KindMismatch {
                variable: self.name.clone(),
                expected: self.kind(),
            },
            other => VariableError::Rejected(other),
        })
    }

    /// Narrow the shared value's range and options to what `property` stores
    /// unchanged, so every binding reads exactly the variable's value
    pub(crate) fn constrain_to(&mut self, property: &Property) -> Result<(), VariableError> {
        if property.kind() != self.kind() {
            return Err(VariableError::KindMismatch {
                variable: self.name.clone(),
                expected: self.kind(),
            });
        }
        if !self.property.constrain_to(property) {
            return Err(VariableError::IncompatibleRange {
                variable: self.name.clone(),
                property: property.name.clone(),
            });
        }
        Ok(())
    }

    /// Append a binding; an identical binding is not duplicated
    pub(crate) fn bind(&mut self, binding: VariableBinding) -> bool {
        if self.bindings.contains(&binding) {
            return false;
        }
        self.bindings.push(binding);
        true
    }

    pub(crate) fn unbind(&mut self, node_id: NodeId, property_name: &str) -> bool {
        let before = self.bindings.len();
        self.bindings
            .retain(|b| !(b.node_id == node_id && b.property_name == property_name));
        self.bindings.len() != before
    }

    pub(crate) fn unbind_node(&mut self, node_id: NodeId) {
        self.bindings.retain(|b| b.node_id != node_id);
    }
}

/// All variables of a designer, in definition order
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: IndexMap<String, Variable>,
}

impl VariableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new variable with an empty binding list
    pub fn define(&mut self, name: &str, display_name: &str, kind: PropertyKind) -> Result<&Variable, VariableError> {
        if self.variables.contains_key(name) {
            return Err(VariableError::AlreadyDefined(name.to_string()));
        }
        let variable = Variable::new(name, display_name, kind);
        Ok(self.variables.entry(name.to_string()).or_insert(variable))
    }

    /// Insert a fully built variable (used when loading)
    pub(crate) fn insert(&mut self, variable: Variable) -> Result<(), VariableError> {
        if self.variables.contains_key(&variable.name) {
            return Err(VariableError::AlreadyDefined(variable.name));
        }
        self.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Get a variable by name
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    /// Remove a variable
    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.variables.shift_remove(name)
    }

    /// Iterate variables in definition order
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether no variable is defined
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Drop every binding that points at `node_id`
    pub(crate) fn remove_node(&mut self, node_id: NodeId) {
        for variable in self.variables.values_mut() {
            variable.unbind_node(node_id);
        }
    }
}

/// Error from variable operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VariableError {
    /// A variable with this name exists
    #[error("Variable '{0}' is already defined")]
    AlreadyDefined(String),

    /// Value or bound property has a different kind
    #[error("Variable '{variable}' carries {expected} values")]
    KindMismatch {
        /// Variable name
        variable: String,
        /// Kind of the variable
        expected: PropertyKind,
    },

    /// Bound property's range does not overlap the variable's
    #[error("Variable '{variable}' cannot drive '{property}': ranges do not overlap")]
    IncompatibleRange {
        /// Variable name
        variable: String,
        /// Property that was being bound
        property: String,
    },

    /// Value outside what the bound properties accept
    #[error(transparent)]
    Rejected(PropertyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_rejects_duplicates() {
        let mut registry = VariableRegistry::new();
        let var = registry.define("tint", "Tint", PropertyKind::Color).unwrap();
        assert_eq!(var.kind(), PropertyKind::Color);
        assert!(var.bindings().is_empty());

        assert_eq!(
            registry.define("tint", "Other", PropertyKind::Float).unwrap_err(),
            VariableError::AlreadyDefined("tint".into())
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bindings_dedupe() {
        let mut var = Variable::new("scale", "Scale", PropertyKind::Float);
        let node = NodeId::new();

        assert!(var.bind(VariableBinding::new(node, "x")));
        assert!(!var.bind(VariableBinding::new(node, "x")));
        assert!(var.bind(VariableBinding::new(node, "y")));
        assert_eq!(var.bindings().len(), 2);
        assert_eq!(var.bound_nodes().len(), 1);

        assert!(var.unbind(node, "x"));
        assert!(!var.unbind(node, "x"));
        var.unbind_node(node);
        assert!(var.bindings().is_empty());
    }

    #[test]
    fn test_set_value_checks_kind() {
        let mut var = Variable::new("on", "On", PropertyKind::Bool);
        assert!(var.set_value(PropertyValue::Bool(true)).is_ok());
        assert_eq!(var.value(), &PropertyValue::Bool(true));
        assert!(matches!(
            var.set_value(PropertyValue::Int(1)),
            Err(VariableError::KindMismatch { expected: PropertyKind::Bool, .. })
        ));
    }

    #[test]
    fn test_constrain_to_bound_properties() {
        let mut var = Variable::new("scale", "Scale", PropertyKind::Float);
        var.constrain_to(&Property::float("scale", "Scale", 4.0).with_range(1.0, 64.0, 1.0))
            .unwrap();
        var.set_value(PropertyValue::Float(100.0)).unwrap();
        assert_eq!(var.value(), &PropertyValue::Float(64.0));

        assert_eq!(
            var.constrain_to(&Property::float("opacity", "Opacity", 1.0).with_range(0.0, 0.5, 0.01)),
            Err(VariableError::IncompatibleRange {
                variable: "scale".into(),
                property: "opacity".into()
            })
        );
        assert!(matches!(
            var.constrain_to(&Property::int("octaves", "Octaves", 4)),
            Err(VariableError::KindMismatch { .. })
        ));

        let mut mode = Variable::new("mode", "Mode", PropertyKind::Enum);
        mode.constrain_to(&Property::enumeration("mode", "Mode", &["normal", "add"], 0))
            .unwrap();
        assert!(matches!(
            mode.set_value(PropertyValue::Enum(5)),
            Err(VariableError::Rejected(PropertyError::EnumOutOfRange { index: 5, .. }))
        ));
        assert_eq!(mode.value(), &PropertyValue::Enum(0));
    }

    #[test]
    fn test_remove_node_drops_bindings() {
        let mut registry = VariableRegistry::new();
        registry.define("a", "A", PropertyKind::Float).unwrap();
        registry.define("b", "B", PropertyKind::Float).unwrap();
        let node = NodeId::new();
        let keep = NodeId::new();
        registry.get_mut("a").unwrap().bind(VariableBinding::new(node, "amount"));
        registry.get_mut("b").unwrap().bind(VariableBinding::new(node, "amount"));
        registry.get_mut("b").unwrap().bind(VariableBinding::new(keep, "amount"));

        registry.remove_node(node);
        assert!(registry.get("a").unwrap().bindings().is_empty());
        assert_eq!(registry.get("b").unwrap().bindings(), [VariableBinding::new(keep, "amount")]);
    }
}
