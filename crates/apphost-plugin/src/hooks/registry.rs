//! Hook registry: ordered, append-only hook pipes keyed by `before.<call>`
//! and `after.<call>`.
//!
//! Pipes are filled during the attach phase through `&mut` access and are
//! read-only once the host starts. Within a pipe, hooks run in exact
//! registration order; each hook receives the payload produced by the
//! previous one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use apphost_core::error::AppError;
use apphost_core::result::AppResult;

use super::definitions::{Payload, PipeKey};

/// Trait for hook handler implementations.
#[async_trait]
pub trait HookHandler: Send + Sync + fmt::Debug {
    /// Transforms the payload, or fails and stops the pipeline.
    async fn handle(&self, payload: Payload) -> AppResult<Payload>;

    /// Returns the plugin ID owning this handler.
    fn plugin_id(&self) -> &str;
}

/// A hook failure with the position and input of the failing hook.
#[derive(Debug)]
pub struct PipeFailure {
    /// The error returned by the hook.
    pub error: AppError,
    /// The payload the failing hook received.
    pub payload: Payload,
    /// Plugin owning the failing hook.
    pub plugin_id: String,
    /// Zero-based position of the failing hook in its pipe.
    pub position: usize,
}

/// An ordered sequence of hook handlers.
#[derive(Debug, Clone, Default)]
pub struct HookPipe {
    handlers: Vec<Arc<dyn HookHandler>>,
}

impl HookPipe {
    /// Appends a handler.
    pub fn push(&mut self, handler: Arc<dyn HookHandler>) {
        self.handlers.push(handler);
    }

    /// Number of handlers in this pipe.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns whether the pipe has no handlers.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Plugin IDs of the handlers, in execution order.
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.plugin_id()).collect()
    }

    /// Runs every handler in order, threading the payload through.
    ///
    /// Stops at the first failure; later handlers do not run.
    pub async fn run(&self, key: &PipeKey, mut payload: Payload) -> Result<Payload, PipeFailure> {
        for (position, handler) in self.handlers.iter().enumerate() {
            let input = payload.clone();
            match handler.handle(payload).await {
                Ok(next) => payload = next,
                Err(error) => {
                    warn!(
                        pipe = %key,
                        plugin_id = %handler.plugin_id(),
                        position = position,
                        error = %error,
                        "Hook failed, stopping pipe"
                    );
                    return Err(PipeFailure {
                        error,
                        payload: input,
                        plugin_id: handler.plugin_id().to_string(),
                        position,
                    });
                }
            }
        }
        Ok(payload)
    }
}

/// Registry of hook pipes.
#[derive(Debug, Default)]
pub struct HookRegistry {
    pipes: HashMap<PipeKey, HookPipe>,
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to the pipe `key`, creating the pipe on first use.
    pub fn register(&mut self, key: PipeKey, handler: Arc<dyn HookHandler>) {
        let plugin_id = handler.plugin_id().to_string();
        let pipe = self.pipes.entry(key.clone()).or_default();
        pipe.push(handler);

        info!(
            pipe = %key,
            plugin_id = %plugin_id,
            position = pipe.len() - 1,
            "Hook handler registered"
        );
    }

    /// Appends a handler to `before.<call>`.
    pub fn before(&mut self, call: &str, handler: Arc<dyn HookHandler>) {
        self.register(PipeKey::before(call), handler);
    }

    /// Appends a handler to `after.<call>`.
    pub fn after(&mut self, call: &str, handler: Arc<dyn HookHandler>) {
        self.register(PipeKey::after(call), handler);
    }

    /// Returns the pipe for `key`, if any handler was registered on it.
    pub fn pipe(&self, key: &PipeKey) -> Option<&HookPipe> {
        self.pipes.get(key)
    }

    /// Returns the number of handlers on the pipe `key`.
    pub fn handler_count(&self, key: &PipeKey) -> usize {
        self.pipes.get(key).map(HookPipe::len).unwrap_or(0)
    }

    /// Returns all pipes with at least one handler, sorted by key.
    pub fn registered_pipes(&self) -> Vec<&PipeKey> {
        let mut keys: Vec<&PipeKey> = self.pipes.keys().collect();
        keys.sort();
        keys
    }

    /// Runs the pipe `key`. A pipe without handlers passes the payload through.
    pub async fn run(&self, key: &PipeKey, payload: Payload) -> Result<Payload, PipeFailure> {
        match self.pipes.get(key) {
            Some(pipe) => {
                debug!(pipe = %key, handler_count = pipe.len(), "Running hook pipe");
                pipe.run(key, payload).await
            }
            None => Ok(payload),
        }
    }
}
