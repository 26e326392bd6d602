//! # apphost-plugin
//!
//! Plugin composition for AppHost. Provides:
//!
//! - Plugin resolution (instance, local shared library, compiled-in package)
//! - Two-phase plugin lifecycle (attach, then init)
//! - Hook pipes keyed by `before.<call>` / `after.<call>`
//! - The call pipeline: before hooks, operation, after hooks
//! - The attach context through which plugins register calls, hooks,
//!   template extensions, resources, and routes

pub mod api;
pub mod call;
pub mod hooks;
pub mod loader;
pub mod manager;
pub mod prelude;
pub mod registry;
pub mod routes;
pub mod traits;

pub use api::context::AttachContext;
pub use api::cookies::CookieKeys;
pub use api::services::{HostServices, SharedServices};
pub use call::pipeline::{CallFailure, CallPipeline};
pub use call::registry::{CallHandler, CallRegistry};
pub use hooks::definitions::{HookStage, Payload, PipeKey, PipelineStage};
pub use hooks::registry::{HookHandler, HookRegistry};
pub use loader::{FnPlugin, LoadedLibraries, PluginLoader, PluginSpec};
pub use manager::{PluginManager, PluginParts};
pub use registry::{Plugin, PluginInfo, PluginRegistry, PluginState};
pub use routes::RouteTable;
