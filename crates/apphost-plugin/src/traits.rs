//! Closure-backed handlers for quick hook and call registration.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use apphost_core::result::AppResult;

use crate::call::registry::CallHandler;
use crate::hooks::definitions::Payload;
use crate::hooks::registry::HookHandler;

type HandlerFn = Arc<dyn Fn(Payload) -> BoxFuture<'static, AppResult<Payload>> + Send + Sync>;

/// A closure-based handler usable both as a hook and as a call handler.
#[derive(Clone)]
pub struct ClosureHandler {
    /// Plugin ID.
    id: String,
    /// Label used in logs.
    name: String,
    /// Handler function.
    handler: HandlerFn,
}

impl fmt::Debug for ClosureHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureHandler")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureHandler {
    /// Creates a handler from an async closure.
    pub fn new<F, Fut>(plugin_id: &str, name: &str, handler: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Payload>> + Send + 'static,
    {
        Self {
            id: plugin_id.to_string(),
            name: name.to_string(),
            handler: Arc::new(move |payload| Box::pin(handler(payload))),
        }
    }

    /// Creates a handler from a synchronous closure.
    pub fn from_sync<F>(plugin_id: &str, name: &str, handler: F) -> Self
    where
        F: Fn(Payload) -> AppResult<Payload> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(plugin_id, name, move |payload| {
            let handler = Arc::clone(&handler);
            async move { handler(payload) }
        })
    }

    /// Returns the handler's label.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl HookHandler for ClosureHandler {
    async fn handle(&self, payload: Payload) -> AppResult<Payload> {
        (self.handler)(payload).await
    }

    fn plugin_id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl CallHandler for ClosureHandler {
    async fn call(&self, payload: Payload) -> AppResult<Payload> {
        (self.handler)(payload).await
    }

    fn plugin_id(&self) -> &str {
        &self.id
    }
}
