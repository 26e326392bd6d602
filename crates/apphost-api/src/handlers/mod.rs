//! Built-in route handlers.

pub mod assets;
pub mod fallback;
pub mod health;
