//! Signed session cookie middleware.
//!
//! The session cookie holds a JSON object signed with `session.secret`. It
//! is decoded into [`SessionLocals`] before the handler runs; a handler
//! replaces the session by returning `Extension(SessionLocals(..))` as
//! part of its response.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::Cookie;
use serde_json::{Map, Value};
use tracing::debug;

use apphost_plugin::SharedServices;
use apphost_view::SessionLocals;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "apphost.session";

/// Loads the session into request extensions and persists handler updates.
pub async fn session(
    State(services): State<SharedServices>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = services.cookies.session(request.headers());
    let data = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| match serde_json::from_str::<Value>(cookie.value()) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => {
                debug!("Ignoring malformed session cookie");
                None
            }
        })
        .unwrap_or_else(|| Value::Object(Map::new()));
    request.extensions_mut().insert(SessionLocals(data));

    let mut response = next.run(request).await;

    match response.extensions_mut().remove::<SessionLocals>() {
        Some(SessionLocals(updated)) => {
            let cookie = Cookie::build((SESSION_COOKIE, updated.to_string()))
                .path("/")
                .http_only(true);
            (jar.add(cookie), response).into_response()
        }
        None => response,
    }
}
