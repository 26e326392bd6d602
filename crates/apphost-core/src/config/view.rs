//! View and asset configuration.

use serde::{Deserialize, Serialize};

/// View rendering and asset serving configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Extension appended to template names that have none.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// File used for unresolved views. The built-in page is used when unset.
    #[serde(default)]
    pub not_found_template: Option<String>,
    /// URL prefix under which assets are served.
    #[serde(default = "default_asset_mount")]
    pub asset_mount: String,
    /// Register every file under the search roots at startup when not in
    /// debug mode.
    #[serde(default = "default_true")]
    pub preload: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            not_found_template: None,
            asset_mount: default_asset_mount(),
            preload: default_true(),
        }
    }
}

fn default_extension() -> String {
    ".html".to_string()
}

fn default_asset_mount() -> String {
    "/assets".to_string()
}

fn default_true() -> bool {
    true
}
