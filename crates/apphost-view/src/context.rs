//! Per-request render context.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::Json;
use axum::extract::{Form, FromRequest, FromRequestParts, Query, RawPathParams, Request};
use axum::http::header;
use axum::http::request::Parts;
use serde::Serialize;
use serde_json::{Map, Value};

use apphost_core::error::AppError;

/// Request data exposed to templates as `_server`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerLocals {
    /// Query string parameters.
    pub query: Value,
    /// Parsed request body, when extracted through [`WithBody`].
    pub body: Value,
    /// Path parameters of the matched route.
    pub params: Value,
    /// Request headers (last value wins for repeated names).
    pub headers: Value,
    /// Session data inserted by an upstream session layer.
    pub session: Value,
}

/// Session data placed in request extensions by a session middleware.
///
/// The render context copies it into `_server.session`.
#[derive(Debug, Clone)]
pub struct SessionLocals(pub Value);

/// Locals and request data for rendering one view.
///
/// Created per request (usually through the axum extractor) and consumed by
/// [`ViewRenderer::render`](crate::ViewRenderer::render).
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    server: ServerLocals,
    locals: Map<String, Value>,
}

impl RenderContext {
    /// Creates a context for the given request data.
    pub fn new(server: ServerLocals) -> Self {
        Self {
            server,
            locals: Map::new(),
        }
    }

    /// Request data of this context.
    pub fn server(&self) -> &ServerLocals {
        &self.server
    }

    /// Attaches a parsed request body.
    pub fn set_body(&mut self, body: Value) {
        self.server.body = body;
    }

    /// Sets a template local, replacing any previous value.
    pub fn set_local(&mut self, name: &str, value: impl Into<Value>) {
        self.locals.insert(name.to_string(), value.into());
    }

    /// Builder form of [`set_local`](Self::set_local).
    pub fn with_local(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_local(name, value);
        self
    }

    /// Returns a template local set on this context.
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Builds the template context.
    ///
    /// Precedence, lowest first: `base` (provider locals), `_server`,
    /// `_config`, locals set on this context, `_view_name`.
    pub fn to_value(&self, base: Map<String, Value>, config: &Value, view_name: &str) -> Value {
        let mut merged = base;
        merged.insert(
            "_server".to_string(),
            serde_json::to_value(&self.server).unwrap_or(Value::Null),
        );
        merged.insert("_config".to_string(), config.clone());
        for (name, value) in &self.locals {
            merged.insert(name.clone(), value.clone());
        }
        merged.insert("_view_name".to_string(), Value::from(view_name));
        Value::Object(merged)
    }
}

impl<S> FromRequestParts<S> for RenderContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        let params: Map<String, Value> = match RawPathParams::from_request_parts(parts, state).await
        {
            Ok(raw) => raw
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(v)))
                .collect(),
            Err(_) => Map::new(),
        };

        let headers: Map<String, Value> = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), Value::from(v)))
            })
            .collect();

        let session = parts
            .extensions
            .get::<SessionLocals>()
            .map(|s| s.0.clone())
            .unwrap_or(Value::Null);

        Ok(Self::new(ServerLocals {
            query: serde_json::to_value(query).unwrap_or(Value::Null),
            body: Value::Null,
            params: Value::Object(params),
            headers: Value::Object(headers),
            session,
        }))
    }
}

/// A [`RenderContext`] whose `_server.body` holds the parsed request body.
///
/// JSON and URL-encoded form bodies are parsed; any other content type
/// leaves the body `null`.
#[derive(Debug, Clone)]
pub struct WithBody(pub RenderContext);

impl<S> FromRequest<S> for WithBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = request.into_parts();
        let mut ctx = match RenderContext::from_request_parts(&mut parts, state).await {
            Ok(ctx) => ctx,
            Err(never) => match never {},
        };

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let request = Request::from_parts(parts, body);

        let body = if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(request, state)
                .await
                .map_err(|e| AppError::validation(format!("Invalid JSON body: {}", e.body_text())))?;
            value
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(request, state)
                .await
                .map_err(|e| AppError::validation(format!("Invalid form body: {}", e.body_text())))?;
            serde_json::to_value(fields)?
        } else {
            Value::Null
        };

        ctx.set_body(body);
        Ok(Self(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    #[tokio::test]
    async fn test_extracts_query_headers_and_session() {
        let request = Request::builder()
            .uri("/posts?page=2")
            .header("x-requested-with", "test")
            .extension(SessionLocals(json!({ "user": "ann" })))
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let ctx = RenderContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.server().query, json!({ "page": "2" }));
        assert_eq!(ctx.server().headers["x-requested-with"], json!("test"));
        assert_eq!(ctx.server().session, json!({ "user": "ann" }));
        assert_eq!(ctx.server().params, json!({}));
    }

    #[test]
    fn test_to_value_precedence() {
        let ctx = RenderContext::default()
            .with_local("title", "Handler")
            .with_local("_config", "overridden");
        let mut base = Map::new();
        base.insert("title".to_string(), json!("Provider"));
        base.insert("menu".to_string(), json!(["home"]));

        let value = ctx.to_value(base, &json!({ "debug": true }), "index");
        assert_eq!(value["title"], json!("Handler"));
        assert_eq!(value["menu"], json!(["home"]));
        assert_eq!(value["_config"], json!("overridden"));
        assert_eq!(value["_view_name"], json!("index"));
        assert!(value["_server"].is_object());
    }

    fn post(content_type: &str, body: &str) -> Request<axum::body::Body> {
        Request::builder()
            .method("POST")
            .uri("/hello?via=test")
            .header(header::CONTENT_TYPE, content_type)
            .body(axum::body::Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_with_body_parses_form() {
        let WithBody(ctx) = WithBody::from_request(
            post("application/x-www-form-urlencoded", "name=ann&lang=en"),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(ctx.server().body, json!({ "name": "ann", "lang": "en" }));
        assert_eq!(ctx.server().query, json!({ "via": "test" }));
    }

    #[tokio::test]
    async fn test_with_body_parses_json() {
        let WithBody(ctx) = WithBody::from_request(
            post("application/json", r#"{"name":"bo","tags":[1,2]}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(ctx.server().body, json!({ "name": "bo", "tags": [1, 2] }));
    }

    #[tokio::test]
    async fn test_with_body_rejects_malformed_json() {
        let err = WithBody::from_request(post("application/json", "{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.kind, apphost_core::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_with_body_ignores_other_content_types() {
        let WithBody(ctx) = WithBody::from_request(post("text/plain", "hello"), &())
            .await
            .unwrap();
        assert_eq!(ctx.server().body, Value::Null);
    }
}
