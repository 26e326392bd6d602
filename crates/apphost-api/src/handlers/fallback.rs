//! Fallback for unmatched routes.

use axum::http::Uri;

use apphost_core::error::AppError;

/// Any unmatched path.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("No route for {}", uri.path()))
}
