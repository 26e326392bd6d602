//! HTTP handlers for the greet plugin.

use axum::Extension;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use serde_json::{Value, json};

use apphost_core::error::AppError;
use apphost_core::result::AppResult;
use apphost_plugin::SharedServices;
use apphost_view::{RenderContext, SessionLocals, WithBody};

/// Signed cookie counting greeting pages served to one browser.
pub const VISITS_COOKIE: &str = "greet.visits";

/// Response of a greeting page: the updated session, the visit counter
/// cookie, and the rendered view.
type GreetingPage = (Extension<SessionLocals>, SignedCookieJar, Html<String>);

/// GET /hello/{name}
pub async fn hello(
    State(services): State<SharedServices>,
    Path(name): Path<String>,
    headers: HeaderMap,
    ctx: RenderContext,
) -> AppResult<GreetingPage> {
    greet_page(&services, &headers, ctx, name).await
}

/// POST /hello with a `name` field in a form or JSON body.
pub async fn hello_form(
    State(services): State<SharedServices>,
    headers: HeaderMap,
    WithBody(ctx): WithBody,
) -> AppResult<GreetingPage> {
    let name = match &ctx.server().body["name"] {
        Value::String(name) if !name.is_empty() => name.clone(),
        _ => return Err(AppError::validation("Field 'name' is required")),
    };
    greet_page(&services, &headers, ctx, name).await
}

async fn greet_page(
    services: &SharedServices,
    headers: &HeaderMap,
    mut ctx: RenderContext,
    name: String,
) -> AppResult<GreetingPage> {
    let message = services.call("greet", json!({ "name": name })).await?;

    let jar = services.cookies.cookies(headers);
    let visits = jar
        .get(VISITS_COOKIE)
        .and_then(|cookie| cookie.value().parse::<u64>().ok())
        .unwrap_or(0)
        + 1;

    ctx.set_local("message", message);
    ctx.set_local("visits", visits);
    let page = services.render(&ctx, "hello").await?;

    let jar = jar.add(
        Cookie::build((VISITS_COOKIE, visits.to_string()))
            .path("/")
            .http_only(true),
    );

    let mut session = ctx.server().session.clone();
    if !session.is_object() {
        session = json!({});
    }
    session["last"] = Value::String(name);
    Ok((Extension(SessionLocals(session)), jar, page))
}
