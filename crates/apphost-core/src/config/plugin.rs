//! Plugin system configuration.

use serde::{Deserialize, Serialize};

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Plugins to load at startup, in order. Each entry is a local path or a
    /// package name (resolved as `{package_prefix}{name}`).
    #[serde(default)]
    pub enabled: Vec<String>,
    /// Base directory for relative plugin paths and package plugin resources.
    #[serde(default = "default_plugin_directory")]
    pub directory: String,
    /// Prefix of conventionally-named plugin packages.
    #[serde(default = "default_package_prefix")]
    pub package_prefix: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: Vec::new(),
            directory: default_plugin_directory(),
            package_prefix: default_package_prefix(),
        }
    }
}

fn default_plugin_directory() -> String {
    "./plugins".to_string()
}

fn default_package_prefix() -> String {
    "apphost-".to_string()
}
