//! # apphost-api
//!
//! HTTP host for AppHost built on Axum.
//!
//! [`Host`] collects plugins, and [`Host::start`] initializes them, freezes
//! the shared registries, and builds the router. The resulting
//! [`RunningHost`] runs named calls and serves HTTP.

pub mod app;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use app::{Host, RunningHost, shutdown_signal};
