//! # apphost-core
//!
//! Core crate for AppHost. Contains the configuration schema, the shared
//! namespace, the resource resolver, and the unified error system.
//!
//! This crate has **no** internal dependencies on other AppHost crates.

pub mod config;
pub mod error;
pub mod namespace;
pub mod resource;
pub mod result;

pub use error::AppError;
pub use namespace::Namespace;
pub use resource::{ResourceClass, ResourceResolver};
pub use result::AppResult;
