//! Hook and call implementations for the greet plugin.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use apphost_core::error::AppError;
use apphost_core::result::AppResult;
use apphost_plugin::{CallHandler, HookHandler, Payload};
use apphost_view::{LocalsProvider, RenderContext};

use crate::plugin::PLUGIN_NAME;

/// Counts completed greetings.
#[derive(Debug, Default)]
pub struct GreetStats {
    count: AtomicU64,
}

impl GreetStats {
    /// Number of greetings so far.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// `before.greet`: upper-cases `payload.name`.
#[derive(Debug)]
pub struct UppercaseName;

#[async_trait]
impl HookHandler for UppercaseName {
    async fn handle(&self, mut payload: Payload) -> AppResult<Payload> {
        let name = payload
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::hook("greet requires a string 'name'"))?
            .to_uppercase();
        payload["name"] = Value::String(name);
        Ok(payload)
    }

    fn plugin_id(&self) -> &str {
        PLUGIN_NAME
    }
}

/// The `greet` call: turns `{ "name": .. }` into a greeting string.
#[derive(Debug)]
pub struct GreetCall {
    salutation: String,
}

impl GreetCall {
    /// Creates the call with the given salutation.
    pub fn new(salutation: &str) -> Self {
        Self {
            salutation: salutation.to_string(),
        }
    }
}

#[async_trait]
impl CallHandler for GreetCall {
    async fn call(&self, payload: Payload) -> AppResult<Payload> {
        let name = payload
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::operation("greet requires a string 'name'"))?;
        Ok(json!(format!("{}, {}", self.salutation, name)))
    }

    fn plugin_id(&self) -> &str {
        PLUGIN_NAME
    }
}

/// `after.greet`: counts the greeting and passes it through.
#[derive(Debug)]
pub struct CountGreeting {
    stats: Arc<GreetStats>,
}

impl CountGreeting {
    pub fn new(stats: Arc<GreetStats>) -> Self {
        Self { stats }
    }
}

#[async_trait]
impl HookHandler for CountGreeting {
    async fn handle(&self, payload: Payload) -> AppResult<Payload> {
        let count = self.stats.count.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(count = count, "Greeting counted");
        Ok(payload)
    }

    fn plugin_id(&self) -> &str {
        PLUGIN_NAME
    }
}

/// Template local `greeted`: greetings served so far.
#[derive(Debug)]
pub struct GreetedLocals {
    stats: Arc<GreetStats>,
}

impl GreetedLocals {
    pub fn new(stats: Arc<GreetStats>) -> Self {
        Self { stats }
    }
}

#[async_trait]
impl LocalsProvider for GreetedLocals {
    async fn provide(&self, _ctx: &RenderContext) -> AppResult<Value> {
        Ok(json!(self.stats.count()))
    }
}
