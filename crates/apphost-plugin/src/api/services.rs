//! Host services shared with request handlers as axum state.

use std::sync::Arc;

use axum::response::Html;
use sqlx::MySqlPool;

use apphost_core::config::AppConfig;
use apphost_core::error::AppError;
use apphost_core::namespace::Namespace;
use apphost_core::resource::ResourceResolver;
use apphost_core::result::AppResult;
use apphost_view::{RenderContext, ViewRenderer};

use super::cookies::CookieKeys;
use crate::call::pipeline::CallPipeline;
use crate::hooks::definitions::Payload;
use crate::loader::LoadedLibraries;
use crate::registry::PluginRegistry;

/// Everything a request handler can reach once the host has started.
///
/// All registries are frozen; nothing here is mutated while serving.
/// `libraries` stays the last field so it is dropped after every handler.
#[derive(Debug)]
pub struct HostServices {
    /// Host configuration.
    pub config: Arc<AppConfig>,
    /// Shared namespace as of start.
    pub namespace: Arc<Namespace>,
    /// Call pipeline.
    pub pipeline: CallPipeline,
    /// Resource resolver.
    pub resources: Arc<ResourceResolver>,
    /// View renderer.
    pub views: ViewRenderer,
    /// Attached plugins.
    pub plugins: Arc<PluginRegistry>,
    /// MySQL pool, when `mysql.url` is configured.
    pub database: Option<MySqlPool>,
    /// Signing keys for plugin cookies and the session cookie.
    pub cookies: CookieKeys,
    /// Shared libraries backing dynamically loaded plugins.
    pub libraries: Arc<LoadedLibraries>,
}

/// Shared handle to the host services.
pub type SharedServices = Arc<HostServices>;

impl HostServices {
    /// Runs a named call through the pipeline on its own task.
    ///
    /// The failure is converted to the error of the failing handler.
    pub async fn call(&self, name: &str, payload: Payload) -> AppResult<Payload> {
        self.pipeline
            .call_detached(name, payload)
            .await
            .map_err(AppError::from)
    }

    /// Renders a view as an HTML response.
    pub async fn render(&self, ctx: &RenderContext, name: &str) -> AppResult<Html<String>> {
        self.views.render_html(ctx, name).await
    }

    /// Returns the MySQL pool.
    pub fn database(&self) -> AppResult<&MySqlPool> {
        self.database
            .as_ref()
            .ok_or_else(|| AppError::configuration("No database configured (set mysql.url)"))
    }
}
