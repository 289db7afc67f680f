// SPDX-License-Identifier: MIT OR Apache-2.0
//! Saving and loading designers.
//!
//! A [`DesignerDocument`] is plain data: node records with their local
//! property values, connection records and variables with their bindings.
//! Node ids survive a round trip, so bindings and connections resolve
//! against the same ids after loading. Documents are stored as RON or JSON.

use crate::connection::{Connection, ConnectionId};
use crate::designer::{Designer, DesignerError};
use crate::node::{Node, NodeId, NodeRegistry};
use crate::property::{Property, PropertyKind, PropertyValue};
use crate::settings::DesignerSettings;
use crate::variable::{Variable, VariableBinding, VariableError, VariableId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current document format version
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

fn current_version() -> u32 {
    DOCUMENT_FORMAT_VERSION
}

/// Serialized designer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignerDocument {
    /// Format version
    #[serde(default = "current_version")]
    pub version: u32,
    /// Nodes in insertion order
    pub nodes: Vec<NodeRecord>,
    /// Connections in insertion order
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
    /// Variables in definition order
    #[serde(default)]
    pub variables: Vec<VariableRecord>,
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Node id
    pub id: NodeId,
    /// Factory key in the node registry
    pub type_name: String,
    /// Display title; the type's title when absent
    #[serde(default)]
    pub title: Option<String>,
    /// Local property values by name
    #[serde(default)]
    pub properties: IndexMap<String, PropertyValue>,
    /// Names of exposed properties; the type's defaults when absent
    #[serde(default)]
    pub exposed: Option<Vec<String>>,
    /// Canvas x position
    #[serde(default)]
    pub x: f32,
    /// Canvas y position
    #[serde(default)]
    pub y: f32,
}

/// Serialized connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    /// Connection id
    pub id: ConnectionId,
    /// Producer node
    pub left_node_id: NodeId,
    /// Producer output (empty = default output)
    #[serde(default)]
    pub left_output_name: String,
    /// Consumer node
    pub right_node_id: NodeId,
    /// Input socket or exposed property on the consumer
    pub right_input_name: String,
}

impl From<&Connection> for ConnectionRecord {
    fn from(connection: &Connection) -> Self {
        Self {
            id: connection.id,
            left_node_id: connection.left_node_id,
            left_output_name: connection.left_output_name.clone(),
            right_node_id: connection.right_node_id,
            right_input_name: connection.right_input_name.clone(),
        }
    }
}

impl From<&ConnectionRecord> for Connection {
    fn from(record: &ConnectionRecord) -> Self {
        Self {
            id: record.id,
            left_node_id: record.left_node_id,
            left_output_name: record.left_output_name.clone(),
            right_node_id: record.right_node_id,
            right_input_name: record.right_input_name.clone(),
        }
    }
}

/// Serialized variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableRecord {
    /// Variable id
    pub id: VariableId,
    /// Unique name
    pub name: String,
    /// Name shown in the UI
    #[serde(default)]
    pub display_name: String,
    /// Kind of value carried
    pub kind: PropertyKind,
    /// Shared value
    pub value: PropertyValue,
    /// Bound node properties
    #[serde(default)]
    pub bindings: Vec<VariableBinding>,
}

/// Error when saving or loading a designer
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Node type missing from the registry
    #[error("Unknown node type '{type_name}' for node {node}")]
    UnknownNodeType {
        /// Node being loaded
        node: NodeId,
        /// Missing factory key
        type_name: String,
    },

    /// Document written by a newer version
    #[error("Document version {0} is newer than supported version {DOCUMENT_FORMAT_VERSION}")]
    UnsupportedVersion(u32),

    /// RON parse error
    #[error("Failed to parse RON: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON write error
    #[error("Failed to write RON: {0}")]
    Ron(#[from] ron::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rebuilding the graph failed
    #[error("Invalid document: {0}")]
    Designer(#[from] DesignerError),
}

impl DesignerDocument {
    fn check_version(self) -> Result<Self, PersistenceError> {
        if self.version > DOCUMENT_FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(self.version));
        }
        Ok(self)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, PersistenceError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Parse from RON
    pub fn from_ron(content: &str) -> Result<Self, PersistenceError> {
        let document: DesignerDocument = ron::from_str(content)?;
        document.check_version()
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON
    pub fn from_json(content: &str) -> Result<Self, PersistenceError> {
        let document: DesignerDocument = serde_json::from_str(content)?;
        document.check_version()
    }

    /// Write to a file; `.json` files are JSON, anything else RON
    pub fn save_to_file(&self, path: &Path) -> Result<(), PersistenceError> {
        let content = if is_json(path) { self.to_json()? } else { self.to_ron()? };
        std::fs::write(path, content)?;
        tracing::info!(path = %path.display(), nodes = self.nodes.len(), "Saved designer");
        Ok(())
    }

    /// Read from a file; `.json` files are JSON, anything else RON
    pub fn load_from_file(path: &Path) -> Result<Self, PersistenceError> {
        let content = std::fs::read_to_string(path)?;
        if is_json(path) {
            Self::from_json(&content)
        } else {
            Self::from_ron(&content)
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

impl Designer {
    /// Capture topology, local property values and variables
    pub fn save(&self) -> DesignerDocument {
        let nodes = self
            .nodes()
            .map(|node| NodeRecord {
                id: node.id,
                type_name: node.type_name.clone(),
                title: Some(node.title.clone()),
                properties: node
                    .properties()
                    .iter()
                    .map(|p| (p.name.clone(), p.value().clone()))
                    .collect(),
                exposed: Some(
                    node.properties()
                        .iter()
                        .filter(|p| p.is_exposed())
                        .map(|p| p.name.clone())
                        .collect(),
                ),
                x: node.position[0],
                y: node.position[1],
            })
            .collect();

        let variables = self
            .variables()
            .iter()
            .map(|v| VariableRecord {
                id: v.id,
                name: v.name.clone(),
                display_name: v.display_name().to_string(),
                kind: v.kind(),
                value: v.value().clone(),
                bindings: v.bindings().to_vec(),
            })
            .collect();

        DesignerDocument {
            version: DOCUMENT_FORMAT_VERSION,
            nodes,
            connections: self.graph().connections().map(ConnectionRecord::from).collect(),
            variables,
        }
    }

    /// Rebuild a designer from a document.
    ///
    /// Nodes are created from `registry` with their saved ids, connections
    /// go through the same checks as [`Designer::add_connection`], and every
    /// node starts dirty. Saved values for properties the node type no longer
    /// declares are skipped, as are bindings to such properties. A variable
    /// whose saved value does not match its kind is rejected.
    pub fn load(
        document: &DesignerDocument,
        registry: &NodeRegistry,
        settings: DesignerSettings,
    ) -> Result<Self, PersistenceError> {
        let mut designer = Designer::new(settings);

        for record in &document.nodes {
            let node = build_node(record, registry, designer.settings())?;
            designer.add_node(node, true)?;
        }

        for record in &document.connections {
            designer.connect(Connection::from(record))?;
        }

        for record in &document.variables {
            if record.value.kind() != record.kind {
                return Err(DesignerError::from(VariableError::KindMismatch {
                    variable: record.name.clone(),
                    expected: record.kind,
                })
                .into());
            }
            let display_name = if record.display_name.is_empty() {
                record.name.as_str()
            } else {
                record.display_name.as_str()
            };
            let property = Property::new(record.name.as_str(), display_name, record.value.clone());
            designer.insert_variable(Variable::from_property(record.id, property))?;

            for binding in &record.bindings {
                designer.bind_variable(&record.name, binding.node_id, &binding.property_name)?;
            }
        }

        tracing::info!(
            nodes = document.nodes.len(),
            connections = document.connections.len(),
            variables = document.variables.len(),
            "Loaded designer"
        );
        Ok(designer)
    }
}

fn build_node(
    record: &NodeRecord,
    registry: &NodeRegistry,
    settings: &DesignerSettings,
) -> Result<Node, PersistenceError> {
    let node_type = registry
        .get(&record.type_name)
        .ok_or_else(|| PersistenceError::UnknownNodeType {
            node: record.id,
            type_name: record.type_name.clone(),
        })?;

    let mut node = Node::with_id(node_type, record.id).with_position(record.x, record.y);
    if let Some(title) = &record.title {
        node.title = title.clone();
    }
    // Init hooks first so saved values win over stamped defaults
    node.attach(settings);

    for (name, value) in &record.properties {
        let Some(property) = node.property_mut(name) else {
            tracing::warn!(node = %record.id, property = %name, "Skipping saved value for unknown property");
            continue;
        };
        property.set_value(value.clone()).map_err(DesignerError::from)?;
        property.reset_parent_value();
    }

    if let Some(exposed) = &record.exposed {
        let names: Vec<String> = node.properties().iter().map(|p| p.name.clone()).collect();
        for name in names {
            if let Some(property) = node.property_mut(&name) {
                property.set_exposed(exposed.contains(&name));
            }
        }
    }

    Ok(node)
}
