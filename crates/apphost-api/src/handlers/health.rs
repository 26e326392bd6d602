//! Health check handler.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use apphost_plugin::SharedServices;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while serving.
    pub status: String,
    /// Host version.
    pub version: String,
    /// Attached plugins in registration order.
    pub plugins: Vec<String>,
    /// Registered call names.
    pub calls: Vec<String>,
    /// Whether the host runs in debug mode.
    pub debug: bool,
}

/// GET /health
pub async fn health(State(services): State<SharedServices>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        plugins: services.plugins.names().into_iter().map(String::from).collect(),
        calls: services
            .pipeline
            .calls()
            .names()
            .into_iter()
            .map(String::from)
            .collect(),
        debug: services.config.debug,
    })
}
