//! View renderer: resolves template names through the resource resolver
//! and renders them with minijinja.
//!
//! In production mode one environment is built up front; minijinja caches
//! every template it loads, keyed by name, for the lifetime of the process.
//! In debug mode a fresh environment is built per render so edits to view
//! files show up immediately.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use axum::response::Html;
use minijinja::Environment;
use serde_json::Value;
use tracing::debug;

use apphost_core::config::view::ViewConfig;
use apphost_core::error::AppError;
use apphost_core::resource::{ResourceClass, ResourceResolver};
use apphost_core::result::AppResult;

use crate::context::RenderContext;
use crate::registry::TemplateRegistry;

/// Logical name (without extension) of the view used for unresolved names.
pub const NOT_FOUND_VIEW: &str = "view_not_found";

const BUILTIN_NOT_FOUND: &str = "<!doctype html>
<html>
<head><title>View not found</title></head>
<body>
<h1>View not found</h1>
<p>{{ _view_name }}</p>
</body>
</html>
";

/// Renders views for request handlers.
#[derive(Clone)]
pub struct ViewRenderer {
    resolver: Arc<ResourceResolver>,
    templates: Arc<TemplateRegistry>,
    extension: String,
    config: Value,
    cached: Option<Arc<Environment<'static>>>,
}

impl fmt::Debug for ViewRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRenderer")
            .field("extension", &self.extension)
            .field("caching", &self.is_caching())
            .field("templates", &self.templates)
            .finish()
    }
}

impl ViewRenderer {
    /// Creates a renderer.
    ///
    /// `config` is exposed to templates as `_config`; `debug` disables the
    /// template cache.
    pub fn new(
        resolver: Arc<ResourceResolver>,
        templates: Arc<TemplateRegistry>,
        view_config: &ViewConfig,
        config: Value,
        debug: bool,
    ) -> Self {
        let mut renderer = Self {
            resolver,
            templates,
            extension: view_config.extension.clone(),
            config,
            cached: None,
        };
        if !debug {
            renderer.cached = Some(Arc::new(renderer.build_environment()));
        }
        renderer
    }

    /// Returns whether compiled templates are reused across renders.
    pub fn is_caching(&self) -> bool {
        self.cached.is_some()
    }

    /// Normalizes a requested name: strips a leading `/` and appends the
    /// configured extension when the name has none.
    pub fn template_name(&self, name: &str) -> String {
        with_extension(name, &self.extension)
    }

    /// Renders the view `name` with the given context.
    pub async fn render(&self, ctx: &RenderContext, name: &str) -> AppResult<String> {
        let template = self.template_name(name);
        let view_name = template
            .strip_suffix(self.extension.as_str())
            .unwrap_or(&template)
            .to_string();

        let base = self.templates.collect_locals(ctx).await?;
        let context = ctx.to_value(base, &self.config, &view_name);
        let env = self.environment();

        debug!(view = %template, cached = self.is_caching(), "Rendering view");

        tokio::task::spawn_blocking(move || -> Result<String, minijinja::Error> {
            env.get_template(&template)?.render(&context)
        })
        .await
        .map_err(|e| AppError::internal(format!("Render task failed: {e}")))?
        .map_err(|e| AppError::template(format!("Failed to render view: {e:#}"), e))
    }

    /// Renders the view as an HTML response.
    pub async fn render_html(&self, ctx: &RenderContext, name: &str) -> AppResult<Html<String>> {
        self.render(ctx, name).await.map(Html)
    }

    fn environment(&self) -> Arc<Environment<'static>> {
        match &self.cached {
            Some(env) => Arc::clone(env),
            None => Arc::new(self.build_environment()),
        }
    }

    fn build_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        self.templates.install(&mut env);

        let resolver = Arc::clone(&self.resolver);
        let extension = self.extension.clone();
        let not_found = with_extension(NOT_FOUND_VIEW, &extension);
        env.set_loader(move |name| {
            load_view(&resolver, &with_extension(name, &extension), &not_found)
        });
        env
    }
}

fn with_extension(name: &str, extension: &str) -> String {
    let name = name.trim_start_matches('/');
    if Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{name}{extension}")
    }
}

fn load_view(
    resolver: &ResourceResolver,
    name: &str,
    not_found: &str,
) -> Result<Option<String>, minijinja::Error> {
    let path = resolver.resolve(ResourceClass::View, name).or_else(|| {
        debug!(view = %name, "View not resolved, using not-found view");
        resolver.resolve(ResourceClass::View, not_found)
    });

    match path {
        Some(path) => {
            debug!(view = %name, path = %path.display(), "View resolved");
            std::fs::read_to_string(&path).map(Some).map_err(|e| {
                minijinja::Error::new(
                    minijinja::ErrorKind::InvalidOperation,
                    format!("failed to read view '{}': {e}", path.display()),
                )
                .with_source(e)
            })
        }
        None => Ok(Some(BUILTIN_NOT_FOUND.to_string())),
    }
}
