//! Plugin registry: attached plugin instances and their metadata, kept in
//! registration order.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use apphost_core::error::AppError;
use apphost_core::result::AppResult;

use crate::api::context::AttachContext;

/// Lifecycle state of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Resolved but not yet attached.
    Uninitialized,
    /// Attach completed; contributions are in the shared registries.
    Attached,
    /// `init` completed.
    Initialized,
}

/// Metadata about a registered plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Unique plugin name.
    pub name: String,
    /// Directory holding the plugin's `view/` and `asset/` folders.
    pub directory: Option<PathBuf>,
    /// Current lifecycle state.
    pub state: PluginState,
    /// Resolution strategy that produced the plugin.
    pub source: String,
    /// When attach completed.
    pub attached_at: Option<DateTime<Utc>>,
    /// When init completed.
    pub initialized_at: Option<DateTime<Utc>>,
}

impl PluginInfo {
    /// Creates metadata for a freshly resolved plugin.
    pub fn new(name: &str, directory: Option<PathBuf>, source: &str) -> Self {
        Self {
            name: name.to_string(),
            directory,
            state: PluginState::Uninitialized,
            source: source.to_string(),
            attached_at: None,
            initialized_at: None,
        }
    }
}

/// Trait that all plugins must implement.
///
/// `attach` runs synchronously when the plugin is registered and is where a
/// plugin contributes calls, hooks, template extensions, resources, and
/// routes. `init` runs once every plugin has attached.
#[async_trait]
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Returns the unique plugin name.
    fn name(&self) -> &str;

    /// Returns the plugin directory, if it ships views or assets.
    fn directory(&self) -> Option<PathBuf> {
        None
    }

    /// Registers the plugin's capabilities.
    fn attach(&self, ctx: &mut AttachContext<'_>) -> AppResult<()>;

    /// Called once after all plugins have attached.
    async fn init(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Registry of all attached plugins.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<(Arc<dyn Plugin>, PluginInfo)>,
}

impl PluginRegistry {
    /// Creates a new empty plugin registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin. Names must be unique.
    pub fn insert(&mut self, plugin: Arc<dyn Plugin>, info: PluginInfo) -> AppResult<()> {
        if self.contains(&info.name) {
            return Err(AppError::conflict(format!(
                "Plugin '{}' is already registered",
                info.name
            )));
        }
        self.plugins.push((plugin, info));
        Ok(())
    }

    /// Gets a plugin by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(plugin, _)| plugin)
    }

    /// Gets a plugin's metadata by name.
    pub fn info(&self, name: &str) -> Option<&PluginInfo> {
        self.plugins
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(_, info)| info)
    }

    /// Checks whether a plugin is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|(_, info)| info.name == name)
    }

    /// Lists plugin metadata in registration order.
    pub fn list(&self) -> Vec<PluginInfo> {
        self.plugins.iter().map(|(_, info)| info.clone()).collect()
    }

    /// Plugin names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|(_, info)| info.name.as_str()).collect()
    }

    /// Returns plugin count.
    pub fn count(&self) -> usize {
        self.plugins.len()
    }

    /// Returns whether no plugin is registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugins with their metadata, in registration order.
    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut (Arc<dyn Plugin>, PluginInfo)> {
        self.plugins.iter_mut()
    }
}
