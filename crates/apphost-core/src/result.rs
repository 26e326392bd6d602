//! Convenience result type alias for AppHost.

use crate::error::AppError;

/// A specialized `Result` type for AppHost operations.
pub type AppResult<T> = Result<T, AppError>;
