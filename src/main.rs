//! AppHost Server: plugin-composed web application host.
//!
//! Main entry point that loads configuration, attaches the enabled plugins,
//! and starts the server.

use tracing_subscriber::{EnvFilter, fmt};

use apphost_api::Host;
use apphost_core::config::AppConfig;
use apphost_core::error::AppError;

#[tokio::main]
async fn main() {
    let env = std::env::var("APPHOST_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    let port = config.server.port;
    let enabled = config.plugins.enabled.clone();

    let mut host = Host::new(config)?;

    // ── Compiled-in plugin packages ──────────────────────────────
    host.loader_mut()
        .register_package("apphost-greet", plugin_greet::create);

    // ── Attach enabled plugins, in order ─────────────────────────
    for name in &enabled {
        let info = host.use_plugin(name.as_str())?;
        tracing::info!(plugin = %info.name, source = %info.source, "Plugin enabled");
    }

    host.start().await?.listen(port).await
}
