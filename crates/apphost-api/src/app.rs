//! Host bootstrap: collects plugins, starts them, and serves HTTP.

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use apphost_core::config::AppConfig;
use apphost_core::error::{AppError, ErrorKind};
use apphost_core::resource::ResourceClass;
use apphost_core::result::AppResult;
use apphost_plugin::manager::PluginParts;
use apphost_plugin::{
    CallFailure, CallPipeline, CookieKeys, HostServices, LoadedLibraries, Payload, PluginInfo,
    PluginLoader, PluginManager, PluginSpec, SharedServices,
};
use apphost_view::ViewRenderer;
use apphost_view::renderer::NOT_FOUND_VIEW;

use crate::database;
use crate::router::build_router;

/// A host that is still collecting plugins.
#[derive(Debug)]
pub struct Host {
    manager: PluginManager,
}

impl Host {
    /// Creates a host for the given configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Ok(Self {
            manager: PluginManager::new(Arc::new(config))?,
        })
    }

    /// Returns the plugin loader, for registering compiled-in packages.
    pub fn loader_mut(&mut self) -> &mut PluginLoader {
        self.manager.loader_mut()
    }

    /// Resolves and attaches a plugin.
    pub fn use_plugin(&mut self, spec: impl Into<PluginSpec>) -> AppResult<PluginInfo> {
        self.manager.use_plugin(spec)
    }

    /// Returns the plugin manager.
    pub fn manager(&self) -> &PluginManager {
        &self.manager
    }

    /// Initializes plugins, freezes the registries, and builds the router.
    pub async fn start(mut self) -> AppResult<RunningHost> {
        info!("Starting AppHost v{}", env!("CARGO_PKG_VERSION"));

        let config = Arc::clone(self.manager.config());

        // ── Step 1: Database and signing keys ────────────────────────
        let database = database::create_pool(&config.mysql)?;
        let cookies = CookieKeys::from_config(&config)?;

        // ── Step 2: Plugin init ──────────────────────────────────────
        self.manager.initialize_all().await?;

        let PluginParts {
            namespace,
            calls,
            hooks,
            mut resources,
            templates,
            routes,
            plugins,
            libraries,
            ..
        } = self.manager.into_parts();

        // ── Step 3: Default views and resource preload ───────────────
        let not_found_view = format!("{NOT_FOUND_VIEW}{}", config.view.extension);
        if let Some(path) = &config.view.not_found_template {
            resources.register_if_absent(ResourceClass::View, &not_found_view, path);
        }
        if !config.debug && config.view.preload {
            for class in ResourceClass::all() {
                resources.preload(class);
            }
        }

        // ── Step 4: Renderer and services ────────────────────────────
        let resources = Arc::new(resources);
        let config_value = namespace.get("config").cloned().unwrap_or_default();
        let views = ViewRenderer::new(
            Arc::clone(&resources),
            Arc::new(templates),
            &config.view,
            config_value,
            config.debug,
        );

        let services = Arc::new(HostServices {
            config: Arc::clone(&config),
            namespace: Arc::new(namespace),
            pipeline: CallPipeline::new(Arc::new(calls), Arc::new(hooks)),
            resources,
            views,
            plugins: Arc::new(plugins),
            database,
            cookies,
            libraries: Arc::clone(&libraries),
        });

        // ── Step 5: Router ───────────────────────────────────────────
        let router = build_router(Arc::clone(&services), routes);

        info!(
            plugins = services.plugins.count(),
            calls = services.pipeline.calls().len(),
            debug = config.debug,
            "AppHost started"
        );

        Ok(RunningHost {
            services,
            router,
            libraries,
        })
    }
}

/// A started host: registries are frozen and the router is built.
#[derive(Debug, Clone)]
pub struct RunningHost {
    services: SharedServices,
    router: Router,
    // Dropped after the router and its plugin handlers.
    libraries: Arc<LoadedLibraries>,
}

impl RunningHost {
    /// Runs a named call through the pipeline.
    pub async fn call(&self, name: &str, payload: Payload) -> Result<Payload, CallFailure> {
        self.services.pipeline.call(name, payload).await
    }

    /// Returns the shared services.
    pub fn services(&self) -> &SharedServices {
        &self.services
    }

    /// Returns the shared libraries backing dynamically loaded plugins.
    pub fn libraries(&self) -> &LoadedLibraries {
        &self.libraries
    }

    /// Returns a clone of the router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Binds `server.host:port` and serves until Ctrl+C or SIGTERM.
    pub async fn listen(self, port: u16) -> AppResult<()> {
        let addr = format!("{}:{}", self.services.config.server.host, port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}: {e}"), e)
        })?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    ///
    /// In-flight requests get `server.shutdown_grace_seconds` to finish.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let grace = Duration::from_secs(self.services.config.server.shutdown_grace_seconds);
        info!(addr = %addr, "AppHost listening");

        let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Shutdown signal received, starting graceful shutdown...");
                let _ = signalled_tx.send(());
            })
            .into_future();

        let deadline = async move {
            if signalled_rx.await.is_ok() {
                tokio::time::sleep(grace).await;
            } else {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = server => {
                result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
            }
            _ = deadline => {
                warn!(grace_seconds = grace.as_secs(), "Grace period elapsed, closing open connections");
            }
        }

        if let Some(pool) = &self.services.database {
            pool.close().await;
        }
        info!("AppHost shut down");
        Ok(())
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
