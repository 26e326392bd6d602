//! Plugin API: the attach-time context and the services shared with request
//! handlers.

pub mod context;
pub mod cookies;
pub mod services;

pub use context::AttachContext;
pub use cookies::CookieKeys;
pub use services::{HostServices, SharedServices};
