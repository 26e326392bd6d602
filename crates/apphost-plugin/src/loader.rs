//! Plugin resolution: turns a [`PluginSpec`] into a plugin instance by
//! trying an ordered list of strategies.
//!
//! 1. explicit instance (including setup closures)
//! 2. local path: a shared library exporting `create_plugin` (feature `dynamic`)
//! 3. a conventionally named package (`apphost-<name>`) from the compiled-in
//!    catalog
//!
//! Each strategy reports `Found` or `Miss(reason)`; when every strategy
//! misses, the reasons are collected into a `PluginNotFound` error.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use apphost_core::config::plugin::PluginConfig;
use apphost_core::error::AppError;
use apphost_core::result::AppResult;

use crate::api::context::AttachContext;
use crate::registry::Plugin;

/// What the host was asked to use as a plugin.
#[derive(Clone)]
pub enum PluginSpec {
    /// An already constructed plugin.
    Instance(Arc<dyn Plugin>),
    /// A local path or package name.
    Named(String),
}

impl PluginSpec {
    /// Wraps a plugin instance.
    pub fn instance(plugin: impl Plugin + 'static) -> Self {
        Self::Instance(Arc::new(plugin))
    }

    /// Wraps an anonymous setup closure; the plugin gets a random name.
    pub fn setup<F>(setup: F) -> Self
    where
        F: Fn(&mut AttachContext<'_>) -> AppResult<()> + Send + Sync + 'static,
    {
        Self::instance(FnPlugin::new(setup))
    }

    /// Human-readable description for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Instance(plugin) => plugin.name().to_string(),
            Self::Named(name) => name.clone(),
        }
    }
}

impl fmt::Debug for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(plugin) => f.debug_tuple("Instance").field(&plugin.name()).finish(),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

impl From<&str> for PluginSpec {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for PluginSpec {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<FnPlugin> for PluginSpec {
    fn from(plugin: FnPlugin) -> Self {
        Self::instance(plugin)
    }
}

impl From<Arc<dyn Plugin>> for PluginSpec {
    fn from(plugin: Arc<dyn Plugin>) -> Self {
        Self::Instance(plugin)
    }
}

type SetupFn = Box<dyn Fn(&mut AttachContext<'_>) -> AppResult<()> + Send + Sync>;

/// A plugin defined by a setup closure.
pub struct FnPlugin {
    name: String,
    directory: Option<PathBuf>,
    setup: SetupFn,
}

impl FnPlugin {
    /// Creates a plugin with a random 8-character name.
    pub fn new<F>(setup: F) -> Self
    where
        F: Fn(&mut AttachContext<'_>) -> AppResult<()> + Send + Sync + 'static,
    {
        let mut name = Uuid::new_v4().simple().to_string();
        name.truncate(8);
        Self::named(&name, setup)
    }

    /// Creates a plugin with an explicit name.
    pub fn named<F>(name: &str, setup: F) -> Self
    where
        F: Fn(&mut AttachContext<'_>) -> AppResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            directory: None,
            setup: Box::new(setup),
        }
    }

    /// Sets the directory holding the plugin's views and assets.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

impl fmt::Debug for FnPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPlugin")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .field("setup", &"<closure>")
            .finish()
    }
}

#[async_trait::async_trait]
impl Plugin for FnPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn directory(&self) -> Option<PathBuf> {
        self.directory.clone()
    }

    fn attach(&self, ctx: &mut AttachContext<'_>) -> AppResult<()> {
        (self.setup)(ctx)
    }
}

/// Outcome of one resolution strategy.
#[derive(Debug)]
pub enum Resolution {
    /// The strategy produced a plugin.
    Found(Arc<dyn Plugin>),
    /// The strategy does not apply; the reason is reported if all miss.
    Miss(String),
}

/// One way of turning a spec into a plugin.
pub trait ResolutionStrategy: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Attempts to resolve the spec.
    fn resolve(&mut self, spec: &PluginSpec) -> Resolution;
}

/// Accepts specs that already carry an instance.
#[derive(Debug, Default)]
pub struct ExplicitInstance;

impl ResolutionStrategy for ExplicitInstance {
    fn name(&self) -> &'static str {
        "instance"
    }

    fn resolve(&mut self, spec: &PluginSpec) -> Resolution {
        match spec {
            PluginSpec::Instance(plugin) => Resolution::Found(Arc::clone(plugin)),
            PluginSpec::Named(_) => Resolution::Miss("not a plugin instance".to_string()),
        }
    }
}

/// Loads shared libraries from a path relative to the plugin directory.
#[derive(Debug)]
pub struct LocalPath {
    base: PathBuf,
    libraries: DynamicLoader,
}

impl LocalPath {
    /// Creates the strategy with `base` as the directory for relative paths.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            libraries: DynamicLoader::new(),
        }
    }

    fn into_libraries(self) -> LoadedLibraries {
        self.libraries.into_libraries()
    }

    fn candidate(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

impl ResolutionStrategy for LocalPath {
    fn name(&self) -> &'static str {
        "local_path"
    }

    fn resolve(&mut self, spec: &PluginSpec) -> Resolution {
        let PluginSpec::Named(name) = spec else {
            return Resolution::Miss("not a named plugin".to_string());
        };
        let path = self.candidate(name);
        if !path.is_file() {
            return Resolution::Miss(format!("no file at '{}'", path.display()));
        }
        self.libraries.load(&path)
    }
}

type PluginFactory = Arc<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

/// Compiled-in plugin packages, keyed by package name.
#[derive(Default)]
pub struct PackageCatalog {
    prefix: String,
    packages: HashMap<String, PluginFactory>,
}

impl PackageCatalog {
    /// Creates an empty catalog for packages named `<prefix><name>`.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            packages: HashMap::new(),
        }
    }

    /// Registers a package factory under its full package name.
    pub fn register<F>(&mut self, package: &str, factory: F)
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        debug!(package = %package, "Plugin package registered in catalog");
        self.packages.insert(package.to_string(), Arc::new(factory));
    }

    /// Registered package names, sorted.
    pub fn packages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.packages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn package_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

impl fmt::Debug for PackageCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageCatalog")
            .field("prefix", &self.prefix)
            .field("packages", &self.packages())
            .finish()
    }
}

impl ResolutionStrategy for PackageCatalog {
    fn name(&self) -> &'static str {
        "package"
    }

    fn resolve(&mut self, spec: &PluginSpec) -> Resolution {
        let PluginSpec::Named(name) = spec else {
            return Resolution::Miss("not a named plugin".to_string());
        };
        let package = self.package_name(name);
        match self.packages.get(&package) {
            Some(factory) => Resolution::Found(factory()),
            None => Resolution::Miss(format!("package '{package}' is not in the catalog")),
        }
    }
}

/// Resolves plugin specs through the instance, local path, and package
/// strategies, in that order.
#[derive(Debug)]
pub struct PluginLoader {
    explicit: ExplicitInstance,
    local: LocalPath,
    catalog: PackageCatalog,
}

impl PluginLoader {
    /// Creates a loader from the plugin configuration.
    pub fn new(config: &PluginConfig) -> Self {
        Self {
            explicit: ExplicitInstance,
            local: LocalPath::new(&config.directory),
            catalog: PackageCatalog::new(&config.package_prefix),
        }
    }

    /// Registers a compiled-in package.
    pub fn register_package<F>(&mut self, package: &str, factory: F)
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        self.catalog.register(package, factory);
    }

    /// Returns the package catalog.
    pub fn catalog(&self) -> &PackageCatalog {
        &self.catalog
    }

    /// Consumes the loader, keeping every loaded shared library mapped.
    ///
    /// Plugins resolved from a library run code from it, so the returned
    /// value must outlive every plugin, handler, and route they registered.
    pub fn into_libraries(self) -> LoadedLibraries {
        self.local.into_libraries()
    }

    /// Resolves a spec, returning the plugin and the strategy that found it.
    pub fn resolve(&mut self, spec: &PluginSpec) -> AppResult<(Arc<dyn Plugin>, &'static str)> {
        let strategies: [&mut dyn ResolutionStrategy; 3] =
            [&mut self.explicit, &mut self.local, &mut self.catalog];

        let mut misses = Vec::new();
        for strategy in strategies {
            match strategy.resolve(spec) {
                Resolution::Found(plugin) => {
                    debug!(
                        plugin = %plugin.name(),
                        strategy = strategy.name(),
                        "Plugin resolved"
                    );
                    return Ok((plugin, strategy.name()));
                }
                Resolution::Miss(reason) => {
                    debug!(spec = %spec.describe(), strategy = strategy.name(), reason = %reason, "Strategy missed");
                    misses.push(format!("{}: {}", strategy.name(), reason));
                }
            }
        }

        Err(AppError::plugin_not_found(format!(
            "Plugin '{}' not found ({})",
            spec.describe(),
            misses.join("; ")
        )))
    }
}

#[cfg(feature = "dynamic")]
mod dynamic_loader {
    use std::path::Path;
    use std::sync::Arc;

    use tracing::info;

    use super::Resolution;
    use crate::registry::Plugin;

    /// Type of the plugin creation function exported by dynamic plugins.
    ///
    /// Dynamic plugins must export:
    /// `extern "C" fn create_plugin() -> *mut dyn Plugin` returning a boxed plugin.
    pub type CreatePluginFn = unsafe extern "C" fn() -> *mut dyn Plugin;

    /// Loads plugins from shared libraries (.so / .dll / .dylib).
    pub struct DynamicLoader {
        libraries: Vec<libloading::Library>,
    }

    /// Shared libraries that loaded plugins; unloaded when dropped.
    pub struct LoadedLibraries {
        libraries: Vec<libloading::Library>,
    }

    impl LoadedLibraries {
        /// Number of loaded libraries.
        pub fn len(&self) -> usize {
            self.libraries.len()
        }

        /// Returns whether no library was loaded.
        pub fn is_empty(&self) -> bool {
            self.libraries.is_empty()
        }
    }

    impl std::fmt::Debug for LoadedLibraries {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("LoadedLibraries")
                .field("count", &self.libraries.len())
                .finish()
        }
    }

    impl DynamicLoader {
        pub fn new() -> Self {
            Self {
                libraries: Vec::new(),
            }
        }

        pub fn into_libraries(self) -> LoadedLibraries {
            LoadedLibraries {
                libraries: self.libraries,
            }
        }

        pub fn load(&mut self, path: &Path) -> Resolution {
            // SAFETY: loading a library runs its initializers; only trusted
            // plugin paths are configured.
            let lib = match unsafe { libloading::Library::new(path) } {
                Ok(lib) => lib,
                Err(e) => {
                    return Resolution::Miss(format!(
                        "failed to load library '{}': {e}",
                        path.display()
                    ));
                }
            };

            // SAFETY: `create_plugin` must have the `CreatePluginFn` signature
            // and return a pointer obtained from `Box::into_raw`.
            let plugin = unsafe {
                let create_fn: libloading::Symbol<CreatePluginFn> = match lib.get(b"create_plugin") {
                    Ok(symbol) => symbol,
                    Err(e) => {
                        return Resolution::Miss(format!(
                            "'{}' has no 'create_plugin' symbol: {e}",
                            path.display()
                        ));
                    }
                };
                Box::from_raw(create_fn())
            };

            info!(path = %path.display(), plugin = %plugin.name(), "Dynamic plugin loaded");
            self.libraries.push(lib);
            Resolution::Found(Arc::from(plugin))
        }
    }

    impl std::fmt::Debug for DynamicLoader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("DynamicLoader")
                .field("loaded_count", &self.libraries.len())
                .finish()
        }
    }
}

#[cfg(not(feature = "dynamic"))]
mod dynamic_loader {
    use std::path::Path;

    use super::Resolution;

    /// Loader used when the `dynamic` feature is disabled.
    #[derive(Debug)]
    pub struct DynamicLoader;

    /// Shared libraries that loaded plugins; always empty without the
    /// `dynamic` feature.
    #[derive(Debug, Default)]
    pub struct LoadedLibraries;

    impl LoadedLibraries {
        /// Number of loaded libraries.
        pub fn len(&self) -> usize {
            0
        }

        /// Returns whether no library was loaded.
        pub fn is_empty(&self) -> bool {
            true
        }
    }

    impl DynamicLoader {
        pub fn new() -> Self {
            Self
        }

        pub fn into_libraries(self) -> LoadedLibraries {
            LoadedLibraries
        }

        pub fn load(&mut self, path: &Path) -> Resolution {
            Resolution::Miss(format!(
                "'{}' exists but dynamic loading is disabled (enable the `dynamic` feature)",
                path.display()
            ))
        }
    }
}

use dynamic_loader::DynamicLoader;
pub use dynamic_loader::LoadedLibraries;
