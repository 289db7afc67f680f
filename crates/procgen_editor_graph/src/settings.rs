// SPDX-License-Identifier: MIT OR Apache-2.0
//! Designer configuration.

use crate::node::TextureSize;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Tunables for a [`Designer`](crate::designer::Designer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignerSettings {
    /// Settings format version
    pub version: u32,
    /// Refuse connections that would close a cycle
    pub reject_cycles: bool,
    /// Size of rendered nodes that do not inherit from a parent input
    pub default_texture_size: TextureSize,
    /// Edge length requested for thumbnails
    pub thumbnail_size: u32,
    /// Seed stamped into procedural nodes on init
    pub random_seed: u32,
}

impl Default for DesignerSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            reject_cycles: true,
            default_texture_size: TextureSize::new(1024, 1024),
            thumbnail_size: 128,
            random_seed: 32,
        }
    }
}

impl DesignerSettings {
    /// Parse settings from RON
    pub fn from_ron(content: &str) -> std::io::Result<Self> {
        let settings: DesignerSettings = ron::from_str(content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Settings version {} is newer than supported version {}",
                    settings.version, SETTINGS_FORMAT_VERSION
                ),
            ));
        }

        Ok(settings)
    }

    /// Serialize settings to pretty RON
    pub fn to_ron(&self) -> std::io::Result<String> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        ron::ser::to_string_pretty(self, config).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_ron()?)
    }
}
