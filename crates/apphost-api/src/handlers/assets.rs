//! Static asset serving backed by the resource resolver.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use apphost_core::error::{AppError, ErrorKind};
use apphost_core::resource::ResourceClass;
use apphost_plugin::SharedServices;

/// GET {asset_mount}/{*path}
pub async fn serve_asset(
    State(services): State<SharedServices>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let full_path = services
        .resources
        .resolve(ResourceClass::Asset, &path)
        .ok_or_else(|| AppError::not_found(format!("Asset not found: {path}")))?;

    debug!(asset = %path, file = %full_path.display(), "Serving asset");

    let file = fs::File::open(&full_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::not_found(format!("Asset not found: {path}"))
        } else {
            AppError::with_source(ErrorKind::Internal, format!("Failed to open asset: {path}"), e)
        }
    })?;

    let cache_control = if services.config.debug {
        "no-cache"
    } else {
        "public, max-age=3600"
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(&full_path))
        .header(header::CACHE_CONTROL, cache_control)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))
}

fn content_type(path: &FsPath) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type(FsPath::new("a/site.CSS")), "text/css");
        assert_eq!(content_type(FsPath::new("logo.svg")), "image/svg+xml");
        assert_eq!(content_type(FsPath::new("doc.pdf")), "application/pdf");
        assert_eq!(content_type(FsPath::new("blob")), "application/octet-stream");
    }
}
