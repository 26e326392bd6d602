//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Every field carries a serde default, so an empty source
//! produces a valid configuration (the defaults are merged under whatever
//! the user supplies).

pub mod app;
pub mod database;
pub mod logging;
pub mod plugin;
pub mod view;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use self::app::{SecretConfig, ServerConfig};
use self::database::DatabaseConfig;
use self::logging::LoggingConfig;
use self::plugin::PluginConfig;
use self::view::ViewConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Cookie signing settings.
    #[serde(default)]
    pub cookie: SecretConfig,
    /// Session signing settings.
    #[serde(default)]
    pub session: SecretConfig,
    /// MySQL connection settings.
    #[serde(default)]
    pub mysql: DatabaseConfig,
    /// Plugin loading settings.
    #[serde(default)]
    pub plugins: PluginConfig,
    /// View and asset settings.
    #[serde(default)]
    pub view: ViewConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Development mode: filesystem view lookup, no template caching.
    #[serde(default)]
    pub debug: bool,
    /// Free-form settings for plugins, published under `config.*`.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl AppConfig {
    /// Load configuration from `config/default` and `config/{env}`.
    ///
    /// Environment variables prefixed with `APPHOST__` override file values,
    /// e.g. `APPHOST__SERVER__PORT=9000`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config", env)
    }

    /// Load configuration from the given directory.
    pub fn load_from(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("APPHOST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Serializes the configuration for publication in the namespace.
    pub fn to_value(&self) -> Result<serde_json::Value, AppError> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "server": { "port": 4000 },
            "site_name": "demo",
        }))
        .unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.request_timeout_seconds, 30);
        assert!(!config.debug);
        assert!(config.mysql.url.is_none());
        assert_eq!(config.view.extension, ".html");
        assert_eq!(config.extra.get("site_name"), Some(&serde_json::json!("demo")));
    }

    #[test]
    fn test_load_from_toml_overlay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "debug = false\n[server]\nport = 3000\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("test.toml"), "debug = true\n").unwrap();

        let config = AppConfig::load_from(dir.path().to_str().unwrap(), "test").unwrap();
        assert!(config.debug);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_to_value_exposes_sections() {
        let value = AppConfig::default().to_value().unwrap();
        assert_eq!(value["server"]["port"], serde_json::json!(3000));
        assert_eq!(value["debug"], serde_json::json!(false));
    }
}
