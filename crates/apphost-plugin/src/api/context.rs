//! Attach context: the scoped handle a plugin receives while attaching.
//!
//! Every registration made through the context is tagged with the plugin's
//! name, so logs and conflict warnings can name the contributing plugin.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::routing::MethodRouter;
use serde_json::Value;

use apphost_core::config::AppConfig;
use apphost_core::namespace::Namespace;
use apphost_core::resource::{ResourceClass, ResourceResolver};
use apphost_core::result::AppResult;
use apphost_view::registry::{LocalsProvider, TemplateRegistry};

use crate::api::services::SharedServices;
use crate::call::registry::{CallHandler, CallRegistry};
use crate::hooks::definitions::{Payload, PipeKey};
use crate::hooks::registry::{HookHandler, HookRegistry};
use crate::routes::RouteTable;
use crate::traits::ClosureHandler;

/// Mutable access to the shared registries, scoped to one plugin.
pub struct AttachContext<'a> {
    plugin: &'a str,
    directory: Option<&'a Path>,
    config: &'a AppConfig,
    namespace: &'a mut Namespace,
    calls: &'a mut CallRegistry,
    hooks: &'a mut HookRegistry,
    resources: &'a mut ResourceResolver,
    templates: &'a mut TemplateRegistry,
    routes: &'a mut RouteTable,
}

/// The registries a plugin may write to during attach.
pub(crate) struct Registries<'a> {
    pub namespace: &'a mut Namespace,
    pub calls: &'a mut CallRegistry,
    pub hooks: &'a mut HookRegistry,
    pub resources: &'a mut ResourceResolver,
    pub templates: &'a mut TemplateRegistry,
    pub routes: &'a mut RouteTable,
}

impl<'a> AttachContext<'a> {
    pub(crate) fn new(
        plugin: &'a str,
        directory: Option<&'a Path>,
        config: &'a AppConfig,
        registries: Registries<'a>,
    ) -> Self {
        Self {
            plugin,
            directory,
            config,
            namespace: registries.namespace,
            calls: registries.calls,
            hooks: registries.hooks,
            resources: registries.resources,
            templates: registries.templates,
            routes: registries.routes,
        }
    }

    /// Name of the attaching plugin.
    pub fn plugin_name(&self) -> &str {
        self.plugin
    }

    /// Directory of the attaching plugin.
    pub fn directory(&self) -> Option<&Path> {
        self.directory
    }

    /// Host configuration.
    pub fn config(&self) -> &AppConfig {
        self.config
    }

    /// Shared namespace, read-only.
    pub fn namespace(&self) -> &Namespace {
        self.namespace
    }

    /// Publishes a value into the shared namespace.
    pub fn publish(&mut self, path: &str, value: impl Into<Value>) {
        self.namespace.set(path, value);
    }

    /// Registers an async call handler.
    pub fn call<F, Fut>(&mut self, name: &str, handler: F)
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Payload>> + Send + 'static,
    {
        let handler = ClosureHandler::new(self.plugin, name, handler);
        self.calls.register(name, Arc::new(handler));
    }

    /// Registers a call handler implementation.
    pub fn call_handler(&mut self, name: &str, handler: Arc<dyn CallHandler>) {
        self.calls.register(name, handler);
    }

    /// Appends an async hook to `before.<call>`.
    pub fn before<F, Fut>(&mut self, call: &str, hook: F)
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Payload>> + Send + 'static,
    {
        let key = PipeKey::before(call);
        let handler = ClosureHandler::new(self.plugin, &key.to_string(), hook);
        self.hooks.register(key, Arc::new(handler));
    }

    /// Appends an async hook to `after.<call>`.
    pub fn after<F, Fut>(&mut self, call: &str, hook: F)
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Payload>> + Send + 'static,
    {
        let key = PipeKey::after(call);
        let handler = ClosureHandler::new(self.plugin, &key.to_string(), hook);
        self.hooks.register(key, Arc::new(handler));
    }

    /// Appends a hook implementation to the pipe `key`.
    pub fn hook(&mut self, key: PipeKey, handler: Arc<dyn HookHandler>) {
        self.hooks.register(key, handler);
    }

    /// Registers a template filter.
    pub fn filter<F>(&mut self, name: &str, filter: F)
    where
        F: Fn(&minijinja::Value, &[minijinja::Value]) -> Result<minijinja::Value, minijinja::Error>
            + Send
            + Sync
            + 'static,
    {
        self.templates.add_filter(self.plugin, name, filter);
    }

    /// Registers a constant template global.
    pub fn global(&mut self, name: &str, value: impl Into<Value>) {
        self.templates.add_global(name, value.into());
    }

    /// Registers an async locals provider computing `name` for every render.
    pub fn locals(&mut self, name: &str, provider: Arc<dyn LocalsProvider>) {
        self.templates.add_locals(self.plugin, name, provider);
    }

    /// Appends a view search root.
    pub fn view_root(&mut self, path: impl Into<PathBuf>) {
        self.resources.add_root(ResourceClass::View, path);
    }

    /// Appends an asset search root.
    pub fn asset_root(&mut self, path: impl Into<PathBuf>) {
        self.resources.add_root(ResourceClass::Asset, path);
    }

    /// Registers a named resource, resolved before any search root.
    pub fn resource(&mut self, class: ResourceClass, name: &str, path: impl Into<PathBuf>) {
        self.resources.register(class, name, path);
    }

    /// Registers an HTTP route. Paths must start with `/`.
    pub fn route(&mut self, path: &str, router: MethodRouter<SharedServices>) -> AppResult<()> {
        self.routes.add(self.plugin, path, router)
    }
}
