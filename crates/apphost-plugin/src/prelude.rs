//! Prelude for plugin authors.

pub use async_trait::async_trait;

pub use apphost_core::error::AppError;
pub use apphost_core::resource::ResourceClass;
pub use apphost_core::result::AppResult;
pub use apphost_view::{LocalsProvider, RenderContext};

pub use crate::api::context::AttachContext;
pub use crate::api::services::{HostServices, SharedServices};
pub use crate::call::registry::CallHandler;
pub use crate::hooks::definitions::{Payload, PipeKey};
pub use crate::hooks::registry::HookHandler;
pub use crate::loader::{FnPlugin, PluginSpec};
pub use crate::registry::Plugin;
pub use crate::traits::ClosureHandler;
