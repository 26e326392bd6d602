//! Route table: HTTP routes contributed by plugins.

use std::fmt;

use axum::Router;
use axum::routing::MethodRouter;
use tracing::{info, warn};

use apphost_core::error::AppError;
use apphost_core::result::AppResult;

use crate::api::services::SharedServices;

struct RouteEntry {
    path: String,
    plugin_id: String,
    router: MethodRouter<SharedServices>,
}

/// Routes in registration order. A later route on the same path replaces
/// the earlier one.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("paths", &self.paths())
            .finish()
    }
}

impl RouteTable {
    /// Creates an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route for `plugin_id`.
    pub fn add(
        &mut self,
        plugin_id: &str,
        path: &str,
        router: MethodRouter<SharedServices>,
    ) -> AppResult<()> {
        if !path.starts_with('/') {
            return Err(AppError::validation(format!(
                "Route path '{path}' must start with '/'"
            )));
        }

        if let Some(previous) = self.routes.iter().find(|r| r.path == path) {
            warn!(
                path = %path,
                previous_plugin = %previous.plugin_id,
                plugin_id = %plugin_id,
                "Route replaced"
            );
        } else {
            info!(path = %path, plugin_id = %plugin_id, "Route registered");
        }
        self.routes.retain(|r| r.path != path);
        self.routes.push(RouteEntry {
            path: path.to_string(),
            plugin_id: plugin_id.to_string(),
            router,
        });
        Ok(())
    }

    /// Registered paths in registration order.
    pub fn paths(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.path.as_str()).collect()
    }

    /// Returns whether a route is registered on `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.routes.iter().any(|r| r.path == path)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Builds an axum router holding every route.
    pub fn into_router(self) -> Router<SharedServices> {
        self.routes
            .into_iter()
            .fold(Router::new(), |router, entry| router.route(&entry.path, entry.router))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[test]
    fn test_rejects_relative_paths() {
        let mut table = RouteTable::new();
        let err = table.add("p", "hello", get(|| async { "hi" })).unwrap_err();
        assert!(err.message.contains("must start with '/'"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_later_route_replaces_earlier() {
        let mut table = RouteTable::new();
        table.add("a", "/x", get(|| async { "a" })).unwrap();
        table.add("a", "/y", get(|| async { "y" })).unwrap();
        table.add("b", "/x", get(|| async { "b" })).unwrap();

        assert_eq!(table.paths(), vec!["/y", "/x"]);
    }
}
