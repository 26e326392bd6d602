//! Call pipeline: `before.<name>` hooks, the call handler, then
//! `after.<name>` hooks, with one payload threaded through every step.
//!
//! The first failure ends the call. The failure carries the stage that
//! failed and the payload the failing step received; its error is the one
//! the failing handler returned, unchanged.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};

use apphost_core::error::AppError;

use super::registry::CallRegistry;
use crate::hooks::definitions::{Payload, PipeKey, PipelineStage};
use crate::hooks::registry::{HookRegistry, PipeFailure};

/// A failed call.
#[derive(Debug, Error)]
#[error("call '{call}' failed at {stage}: {error}")]
pub struct CallFailure {
    /// Name of the call.
    pub call: String,
    /// Stage that failed.
    pub stage: PipelineStage,
    /// The error returned by the failing handler.
    #[source]
    pub error: AppError,
    /// The payload as of the failure (the failing step's input).
    pub payload: Payload,
    /// Plugin owning the failing handler, when one ran.
    pub plugin_id: Option<String>,
}

impl CallFailure {
    fn from_pipe(call: &str, stage: PipelineStage, failure: PipeFailure) -> Self {
        Self {
            call: call.to_string(),
            stage,
            error: failure.error,
            payload: failure.payload,
            plugin_id: Some(failure.plugin_id),
        }
    }
}

impl From<CallFailure> for AppError {
    fn from(failure: CallFailure) -> Self {
        failure.error
    }
}

/// Executes named calls against frozen call and hook registries.
#[derive(Debug, Clone)]
pub struct CallPipeline {
    calls: Arc<CallRegistry>,
    hooks: Arc<HookRegistry>,
}

impl CallPipeline {
    /// Creates a pipeline over the given registries.
    pub fn new(calls: Arc<CallRegistry>, hooks: Arc<HookRegistry>) -> Self {
        Self { calls, hooks }
    }

    /// Returns the call registry.
    pub fn calls(&self) -> &CallRegistry {
        &self.calls
    }

    /// Returns the hook registry.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Runs the call `name` with `payload`.
    pub async fn call(&self, name: &str, payload: Payload) -> Result<Payload, CallFailure> {
        let Some(handler) = self.calls.get(name) else {
            warn!(call = %name, "Unknown call");
            return Err(CallFailure {
                call: name.to_string(),
                stage: PipelineStage::Lookup,
                error: AppError::call_not_found(name),
                payload,
                plugin_id: None,
            });
        };

        debug!(call = %name, "call: before");
        let payload = self
            .hooks
            .run(&PipeKey::before(name), payload)
            .await
            .map_err(|f| CallFailure::from_pipe(name, PipelineStage::Before, f))?;

        debug!(call = %name, plugin_id = %handler.plugin_id(), "call: operation");
        let input = payload.clone();
        let payload = handler.call(payload).await.map_err(|error| {
            warn!(call = %name, plugin_id = %handler.plugin_id(), error = %error, "Call handler failed");
            CallFailure {
                call: name.to_string(),
                stage: PipelineStage::Operation,
                error,
                payload: input,
                plugin_id: Some(handler.plugin_id().to_string()),
            }
        })?;

        debug!(call = %name, "call: after");
        self.hooks
            .run(&PipeKey::after(name), payload)
            .await
            .map_err(|f| CallFailure::from_pipe(name, PipelineStage::After, f))
    }

    /// Runs the call on its own task.
    ///
    /// Dropping the returned future does not cancel the pipeline; every
    /// hook that has started still runs to completion.
    pub async fn call_detached(&self, name: &str, payload: Payload) -> Result<Payload, CallFailure> {
        let pipeline = self.clone();
        let call = name.to_string();
        let task = tokio::spawn(async move { pipeline.call(&call, payload).await });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(call = %name, error = %e, "Call task aborted");
                Err(CallFailure {
                    call: name.to_string(),
                    stage: PipelineStage::Operation,
                    error: AppError::internal(format!("Call '{name}' aborted: {e}")),
                    payload: Payload::Null,
                    plugin_id: None,
                })
            }
        }
    }
}
