//! Router assembly: plugin routes, asset serving, health, and the
//! middleware stack (session, logging, timeout, tracing).

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::get;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use apphost_plugin::{RouteTable, SharedServices};

use crate::handlers;
use crate::middleware;

const HEALTH_PATH: &str = "/health";

/// Builds the complete Axum router.
///
/// Plugin routes take precedence over the built-in health and asset routes
/// when they claim the same path.
pub fn build_router(services: SharedServices, routes: RouteTable) -> Router {
    let asset_path = asset_route(&services.config.view.asset_mount);
    let timeout = Duration::from_secs(services.config.server.request_timeout_seconds);

    let mut builtin = Router::new();
    if routes.contains(HEALTH_PATH) {
        warn!(path = HEALTH_PATH, "Plugin route shadows built-in health check");
    } else {
        builtin = builtin.route(HEALTH_PATH, get(handlers::health::health));
    }
    if routes.contains(&asset_path) {
        warn!(path = %asset_path, "Plugin route shadows built-in asset route");
    } else {
        builtin = builtin.route(&asset_path, get(handlers::assets::serve_asset));
    }

    routes
        .into_router()
        .merge(builtin)
        .fallback(handlers::fallback::not_found)
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&services),
            middleware::session::session,
        ))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(services)
}

fn asset_route(mount: &str) -> String {
    let mount = mount.trim_end_matches('/');
    if mount.is_empty() {
        "/{*path}".to_string()
    } else if mount.starts_with('/') {
        format!("{mount}/{{*path}}")
    } else {
        format!("/{mount}/{{*path}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_route() {
        assert_eq!(asset_route("/assets"), "/assets/{*path}");
        assert_eq!(asset_route("static/"), "/static/{*path}");
        assert_eq!(asset_route("/"), "/{*path}");
    }
}
