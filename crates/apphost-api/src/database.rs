//! MySQL connection pool management.

use std::time::Duration;

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::info;

use apphost_core::config::database::DatabaseConfig;
use apphost_core::error::{AppError, ErrorKind};
use apphost_core::result::AppResult;

/// Creates a lazily connecting pool when `mysql.url` is configured.
///
/// No connection is opened here; the first query connects.
pub fn create_pool(config: &DatabaseConfig) -> AppResult<Option<MySqlPool>> {
    let Some(url) = config.url.as_deref() else {
        info!("No database configured");
        return Ok(None);
    };

    info!(
        url = %mask_password(url),
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating MySQL pool"
    );

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .connect_lazy(url)
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Invalid database URL: {e}"),
                e,
            )
        })?;

    Ok(Some(pool))
}

/// Mask the password portion of a database URL for safe logging.
fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
