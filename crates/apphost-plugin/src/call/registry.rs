//! Call registry: at most one handler per call name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use apphost_core::result::AppResult;

use crate::hooks::definitions::Payload;

/// Trait for named call implementations.
#[async_trait]
pub trait CallHandler: Send + Sync + fmt::Debug {
    /// Runs the operation on the (already before-hooked) payload.
    async fn call(&self, payload: Payload) -> AppResult<Payload>;

    /// Returns the plugin ID owning this handler.
    fn plugin_id(&self) -> &str;
}

/// Registry of named calls.
#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: HashMap<String, Arc<dyn CallHandler>>,
}

impl CallRegistry {
    /// Creates a new empty call registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `name`. A later registration replaces an
    /// earlier one.
    pub fn register(&mut self, name: &str, handler: Arc<dyn CallHandler>) {
        let plugin_id = handler.plugin_id().to_string();
        if let Some(previous) = self.calls.insert(name.to_string(), handler) {
            warn!(
                call = %name,
                previous_plugin = %previous.plugin_id(),
                plugin_id = %plugin_id,
                "Call handler replaced"
            );
        } else {
            info!(call = %name, plugin_id = %plugin_id, "Call registered");
        }
    }

    /// Returns the handler for `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn CallHandler>> {
        self.calls.get(name)
    }

    /// Returns whether a handler is registered for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.calls.contains_key(name)
    }

    /// Registered call names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.calls.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered calls.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Returns whether no calls are registered.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ClosureHandler;
    use serde_json::json;

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut registry = CallRegistry::new();
        registry.register(
            "greet",
            Arc::new(ClosureHandler::from_sync("a", "greet", |_| Ok(json!("a")))),
        );
        registry.register(
            "greet",
            Arc::new(ClosureHandler::from_sync("b", "greet", |_| Ok(json!("b")))),
        );

        assert_eq!(registry.len(), 1);
        let handler = registry.get("greet").unwrap();
        assert_eq!(handler.plugin_id(), "b");
        assert_eq!(handler.call(json!(null)).await.unwrap(), json!("b"));
    }
}
