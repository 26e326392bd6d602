//! Greet plugin implementation.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::routing::{get, post};
use tracing::info;

use apphost_core::result::AppResult;
use apphost_plugin::{AttachContext, PipeKey, Plugin};

use crate::handlers;
use crate::hooks::{CountGreeting, GreetCall, GreetStats, GreetedLocals, UppercaseName};

/// Name the plugin registers under.
pub const PLUGIN_NAME: &str = "greet";

const DEFAULT_SALUTATION: &str = "Hello";

/// The greet plugin.
#[derive(Debug, Default)]
pub struct GreetPlugin {
    stats: Arc<GreetStats>,
}

impl GreetPlugin {
    /// Creates the plugin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Greeting statistics.
    pub fn stats(&self) -> &Arc<GreetStats> {
        &self.stats
    }
}

#[async_trait]
impl Plugin for GreetPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn directory(&self) -> Option<PathBuf> {
        Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")))
    }

    fn attach(&self, ctx: &mut AttachContext<'_>) -> AppResult<()> {
        let salutation = ctx
            .namespace()
            .get_as::<String>("config.greet.salutation")?
            .unwrap_or_else(|| DEFAULT_SALUTATION.to_string());

        ctx.hook(PipeKey::before("greet"), Arc::new(UppercaseName));
        ctx.call_handler("greet", Arc::new(GreetCall::new(&salutation)));
        ctx.hook(
            PipeKey::after("greet"),
            Arc::new(CountGreeting::new(Arc::clone(&self.stats))),
        );

        ctx.filter("exclaim", |value, _args| {
            Ok(minijinja::Value::from(format!("{value}!")))
        });
        ctx.locals("greeted", Arc::new(GreetedLocals::new(Arc::clone(&self.stats))));
        ctx.route("/hello/{name}", get(handlers::hello))?;
        ctx.route("/hello", post(handlers::hello_form))?;

        ctx.publish("greet.salutation", salutation);
        Ok(())
    }

    async fn init(&self) -> AppResult<()> {
        info!(plugin = PLUGIN_NAME, "Greet plugin ready");
        Ok(())
    }
}

/// Package factory for the plugin catalog.
pub fn create() -> Arc<dyn Plugin> {
    Arc::new(GreetPlugin::new())
}
