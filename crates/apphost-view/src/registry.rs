//! Template registry: filters, globals, and async locals contributed by
//! plugins and installed on every rendering environment.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use minijinja::value::{Rest, Value};
use minijinja::Environment;
use tracing::{debug, warn};

use apphost_core::result::AppResult;

use crate::context::RenderContext;

/// A template filter: receives the filtered value and the filter arguments.
pub type FilterFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, minijinja::Error> + Send + Sync>;

/// Computes a template local for each render.
///
/// Providers run before every render and receive the request's context;
/// their output is stored under the name they were registered with.
#[async_trait]
pub trait LocalsProvider: Send + Sync {
    /// Produces the value of the local.
    async fn provide(&self, ctx: &RenderContext) -> AppResult<serde_json::Value>;
}

#[derive(Clone)]
struct FilterEntry {
    name: String,
    plugin_id: String,
    filter: FilterFn,
}

#[derive(Clone)]
struct LocalsEntry {
    name: String,
    plugin_id: String,
    provider: Arc<dyn LocalsProvider>,
}

/// Registry of template extensions, filled during the attach phase.
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    filters: Vec<FilterEntry>,
    globals: serde_json::Map<String, serde_json::Value>,
    locals: Vec<LocalsEntry>,
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("filters", &self.filter_names())
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .field("locals", &self.locals_names())
            .finish()
    }
}

impl TemplateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a filter. A later filter with the same name replaces the
    /// earlier one.
    pub fn add_filter<F>(&mut self, plugin_id: &str, name: &str, filter: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, minijinja::Error> + Send + Sync + 'static,
    {
        if let Some(previous) = self.filters.iter().find(|e| e.name == name) {
            warn!(
                filter = %name,
                previous_plugin = %previous.plugin_id,
                plugin_id = %plugin_id,
                "Template filter replaced"
            );
        }
        self.filters.retain(|e| e.name != name);
        self.filters.push(FilterEntry {
            name: name.to_string(),
            plugin_id: plugin_id.to_string(),
            filter: Arc::new(filter),
        });
    }

    /// Registers a constant global visible to every template.
    pub fn add_global(&mut self, name: &str, value: serde_json::Value) {
        self.globals.insert(name.to_string(), value);
    }

    /// Registers a provider computing the local `name` for every render.
    pub fn add_locals(&mut self, plugin_id: &str, name: &str, provider: Arc<dyn LocalsProvider>) {
        debug!(local = %name, plugin_id = %plugin_id, "Template locals provider registered");
        self.locals.push(LocalsEntry {
            name: name.to_string(),
            plugin_id: plugin_id.to_string(),
            provider,
        });
    }

    /// Names of the registered filters, in registration order.
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|e| e.name.as_str()).collect()
    }

    /// Names of the registered locals providers, in registration order.
    pub fn locals_names(&self) -> Vec<&str> {
        self.locals.iter().map(|e| e.name.as_str()).collect()
    }

    /// Installs filters and globals on a rendering environment.
    pub fn install(&self, env: &mut Environment<'static>) {
        for entry in &self.filters {
            let filter = Arc::clone(&entry.filter);
            env.add_filter(entry.name.clone(), move |value: Value, args: Rest<Value>| {
                filter(&value, &args.0)
            });
        }
        for (name, value) in &self.globals {
            env.add_global(name.clone(), Value::from_serialize(value));
        }
    }

    /// Runs every locals provider for one render.
    ///
    /// Providers run concurrently; the first failure aborts the render.
    /// When two providers share a name the later registration wins.
    pub async fn collect_locals(
        &self,
        ctx: &RenderContext,
    ) -> AppResult<serde_json::Map<String, serde_json::Value>> {
        let values = try_join_all(self.locals.iter().map(|e| e.provider.provide(ctx))).await?;

        Ok(self
            .locals
            .iter()
            .zip(values)
            .map(|(entry, value)| (entry.name.clone(), value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apphost_core::AppError;
    use serde_json::json;

    struct Fixed(serde_json::Value);

    #[async_trait]
    impl LocalsProvider for Fixed {
        async fn provide(&self, _ctx: &RenderContext) -> AppResult<serde_json::Value> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl LocalsProvider for Failing {
        async fn provide(&self, _ctx: &RenderContext) -> AppResult<serde_json::Value> {
            Err(AppError::internal("locals unavailable"))
        }
    }

    #[test]
    fn test_filter_replaced_by_later_registration() {
        let mut registry = TemplateRegistry::new();
        registry.add_filter("a", "shout", |v, _| Ok(v.clone()));
        registry.add_filter("b", "shout", |v, _| Ok(v.clone()));
        registry.add_filter("b", "trim", |v, _| Ok(v.clone()));

        assert_eq!(registry.filter_names(), vec!["shout", "trim"]);
    }

    #[test]
    fn test_installed_filter_and_global_render() {
        let mut registry = TemplateRegistry::new();
        registry.add_filter("p", "shout", |v, _| {
            Ok(Value::from(v.as_str().unwrap_or_default().to_uppercase()))
        });
        registry.add_global("site", json!("Demo"));

        let mut env = Environment::new();
        registry.install(&mut env);
        let out = env
            .render_str("{{ site }}: {{ 'hi' | shout }}", ())
            .unwrap();
        assert_eq!(out, "Demo: HI");
    }

    #[tokio::test]
    async fn test_collect_locals() {
        let mut registry = TemplateRegistry::new();
        registry.add_locals("p", "menu", Arc::new(Fixed(json!(["home"]))));
        registry.add_locals("p", "count", Arc::new(Fixed(json!(2))));

        let locals = registry.collect_locals(&RenderContext::default()).await.unwrap();
        assert_eq!(locals.get("menu"), Some(&json!(["home"])));
        assert_eq!(locals.get("count"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_collect_locals_failure_propagates() {
        let mut registry = TemplateRegistry::new();
        registry.add_locals("p", "ok", Arc::new(Fixed(json!(1))));
        registry.add_locals("p", "bad", Arc::new(Failing));

        let err = registry
            .collect_locals(&RenderContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.message, "locals unavailable");
    }
}
