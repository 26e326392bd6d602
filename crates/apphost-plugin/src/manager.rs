//! Plugin manager: resolves plugins, runs the attach and init phases, and
//! hands the filled registries to the host.

use std::sync::Arc;

use chrono::Utc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use apphost_core::config::AppConfig;
use apphost_core::error::AppError;
use apphost_core::namespace::Namespace;
use apphost_core::resource::{ResourceClass, ResourceResolver};
use apphost_core::result::AppResult;
use apphost_view::registry::TemplateRegistry;

use crate::api::context::{AttachContext, Registries};
use crate::call::registry::CallRegistry;
use crate::hooks::registry::HookRegistry;
use crate::loader::{LoadedLibraries, PluginLoader, PluginSpec};
use crate::registry::{PluginInfo, PluginRegistry, PluginState};
use crate::routes::RouteTable;

/// Registries filled during attach, ready to be frozen by the host.
///
/// `libraries` is declared last: handlers and plugins in the other fields
/// may run code from those libraries, so they must be dropped first.
#[derive(Debug)]
pub struct PluginParts {
    /// Host configuration.
    pub config: Arc<AppConfig>,
    /// Shared namespace.
    pub namespace: Namespace,
    /// Named calls.
    pub calls: CallRegistry,
    /// Hook pipes.
    pub hooks: HookRegistry,
    /// Resource resolver with every plugin's roots.
    pub resources: ResourceResolver,
    /// Template filters, globals, and locals.
    pub templates: TemplateRegistry,
    /// Plugin routes.
    pub routes: RouteTable,
    /// Attached plugins.
    pub plugins: PluginRegistry,
    /// Shared libraries backing dynamically loaded plugins.
    pub libraries: Arc<LoadedLibraries>,
}

/// Owns the shared registries while plugins attach.
#[derive(Debug)]
pub struct PluginManager {
    config: Arc<AppConfig>,
    loader: PluginLoader,
    plugins: PluginRegistry,
    namespace: Namespace,
    calls: CallRegistry,
    hooks: HookRegistry,
    resources: ResourceResolver,
    templates: TemplateRegistry,
    routes: RouteTable,
}

impl PluginManager {
    /// Creates a manager and publishes the configuration under `config`.
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let mut namespace = Namespace::new();
        namespace.set("config", config.to_value()?);

        Ok(Self {
            loader: PluginLoader::new(&config.plugins),
            resources: ResourceResolver::new(config.debug),
            config,
            plugins: PluginRegistry::new(),
            namespace,
            calls: CallRegistry::new(),
            hooks: HookRegistry::new(),
            templates: TemplateRegistry::new(),
            routes: RouteTable::new(),
        })
    }

    /// Resolves and attaches a plugin.
    ///
    /// After `attach` succeeds the plugin's `asset/` and `view/` folders are
    /// appended as search roots and its metadata is published under
    /// `plugin.<name>`.
    pub fn use_plugin(&mut self, spec: impl Into<PluginSpec>) -> AppResult<PluginInfo> {
        let spec = spec.into();
        let (plugin, source) = self.loader.resolve(&spec)?;
        let name = plugin.name().to_string();

        if self.plugins.contains(&name) {
            return Err(AppError::conflict(format!(
                "Plugin '{name}' is already registered"
            )));
        }

        let mut info = PluginInfo::new(&name, plugin.directory(), source);
        let span = info_span!("plugin", plugin = %name);
        let _entered = span.enter();
        debug!(source = source, "Attaching plugin");

        let directory = info.directory.clone();
        {
            let registries = Registries {
                namespace: &mut self.namespace,
                calls: &mut self.calls,
                hooks: &mut self.hooks,
                resources: &mut self.resources,
                templates: &mut self.templates,
                routes: &mut self.routes,
            };
            let mut ctx = AttachContext::new(&name, directory.as_deref(), &self.config, registries);
            plugin.attach(&mut ctx).map_err(|e| {
                error!(error = %e, "Plugin attach failed");
                AppError::plugin_attach(&name, e)
            })?;
        }

        if let Some(dir) = &directory {
            self.resources.add_root(ResourceClass::Asset, dir.join("asset"));
            self.resources.add_root(ResourceClass::View, dir.join("view"));
        }

        info.state = PluginState::Attached;
        info.attached_at = Some(Utc::now());
        publish(&mut self.namespace, &info)?;
        self.plugins.insert(plugin, info.clone())?;

        info!(source = source, "Plugin attached");
        Ok(info)
    }

    /// Runs `init` on every plugin in registration order.
    ///
    /// Starting without plugins is allowed and only logs a warning.
    pub async fn initialize_all(&mut self) -> AppResult<()> {
        if self.plugins.is_empty() {
            warn!("No plugin was loaded");
            return Ok(());
        }

        let mut initialized = Vec::new();
        for (plugin, info) in self.plugins.entries_mut() {
            let span = info_span!("plugin", plugin = %info.name);
            plugin.init().instrument(span).await.map_err(|e| {
                error!(plugin = %info.name, error = %e, "Plugin init failed");
                AppError::plugin_init(&info.name, e)
            })?;

            info.state = PluginState::Initialized;
            info.initialized_at = Some(Utc::now());
            initialized.push(info.clone());
        }

        for info in &initialized {
            publish(&mut self.namespace, info)?;
        }

        info!(count = initialized.len(), "Plugins initialized");
        Ok(())
    }

    /// Returns the plugin loader, for registering compiled-in packages.
    pub fn loader_mut(&mut self) -> &mut PluginLoader {
        &mut self.loader
    }

    /// Returns the host configuration.
    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    /// Returns the shared namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the attached plugins.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Returns the call registry.
    pub fn calls(&self) -> &CallRegistry {
        &self.calls
    }

    /// Returns the hook registry.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Returns the resource resolver.
    pub fn resources(&self) -> &ResourceResolver {
        &self.resources
    }

    /// Returns the route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Consumes the manager, returning the filled registries.
    pub fn into_parts(self) -> PluginParts {
        PluginParts {
            config: self.config,
            namespace: self.namespace,
            calls: self.calls,
            hooks: self.hooks,
            resources: self.resources,
            templates: self.templates,
            routes: self.routes,
            plugins: self.plugins,
            libraries: Arc::new(self.loader.into_libraries()),
        }
    }
}

fn publish(namespace: &mut Namespace, info: &PluginInfo) -> AppResult<()> {
    namespace.set(&format!("plugin.{}", info.name), serde_json::to_value(info)?);
    Ok(())
}
