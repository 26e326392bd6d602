//! # apphost-view
//!
//! Template rendering adapter for AppHost. Provides:
//!
//! - [`TemplateRegistry`] where plugins register filters, globals, and
//!   async locals during attach
//! - [`RenderContext`], the per-request set of locals, extractable from
//!   any axum request
//! - [`ViewRenderer`], which resolves template names through the resource
//!   resolver and renders them with minijinja

pub mod context;
pub mod registry;
pub mod renderer;

pub use context::{RenderContext, ServerLocals, SessionLocals, WithBody};
pub use registry::{LocalsProvider, TemplateRegistry};
pub use renderer::ViewRenderer;
