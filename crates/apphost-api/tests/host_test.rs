//! Integration tests for host startup, calls, and HTTP serving.

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tower::ServiceExt;

use apphost_api::{Host, RunningHost};
use apphost_core::config::AppConfig;
use apphost_core::error::ErrorKind;
use apphost_plugin::{PipelineStage, PluginSpec};
use plugin_greet::GreetPlugin;

struct TestResponse {
    status: StatusCode,
    content_type: Option<String>,
    set_cookies: Vec<String>,
    body: String,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json body")
    }

    /// Set-Cookie header for `name`.
    fn set_cookie(&self, name: &str) -> Option<&str> {
        self.set_cookies
            .iter()
            .map(String::as_str)
            .find(|c| c.starts_with(&format!("{name}=")))
    }

    /// A Cookie header echoing every cookie this response set.
    fn cookie_header(&self) -> String {
        self.set_cookies
            .iter()
            .filter_map(|c| c.split(';').next())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

async fn send(host: &RunningHost, request: Request<Body>) -> TestResponse {
    let response = host.router().oneshot(request).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let set_cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(String::from)
        .collect();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    TestResponse {
        status,
        content_type,
        set_cookies,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

async fn request(host: &RunningHost, uri: &str) -> TestResponse {
    send(host, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

fn post(uri: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn greet_host(config: AppConfig) -> RunningHost {
    let mut host = Host::new(config).unwrap();
    host.use_plugin(PluginSpec::instance(GreetPlugin::new()))
        .unwrap();
    host.start().await.unwrap()
}

#[tokio::test]
async fn test_greet_end_to_end() {
    let running = greet_host(AppConfig::default()).await;

    let out = running.call("greet", json!({ "name": "ann" })).await.unwrap();
    assert_eq!(out, json!("Hello, ANN"));
}

#[tokio::test]
async fn test_greet_failure_reports_before_stage() {
    let running = greet_host(AppConfig::default()).await;

    let failure = running.call("greet", json!({})).await.unwrap_err();
    assert_eq!(failure.stage, PipelineStage::Before);
    assert_eq!(failure.error.kind, ErrorKind::Hook);
}

#[tokio::test]
async fn test_package_resolution_through_catalog() {
    let mut host = Host::new(AppConfig::default()).unwrap();
    host.loader_mut()
        .register_package("apphost-greet", plugin_greet::create);
    let info = host.use_plugin("greet").unwrap();
    assert_eq!(info.source, "package");

    let running = host.start().await.unwrap();
    let out = running.call("greet", json!({ "name": "bo" })).await.unwrap();
    assert_eq!(out, json!("Hello, BO"));
}

#[tokio::test]
async fn test_hello_page_renders_view() {
    let running = greet_host(AppConfig::default()).await;

    let response = request(&running, "/hello/ann").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type.unwrap().starts_with("text/html"));
    assert!(response.body.contains("Hello, ANN!"));
    assert!(response.body.contains("Greetings served: 1"));
    assert!(response.body.contains("<footer>hello</footer>"));
}

#[tokio::test]
async fn test_assets_served_from_plugin_directory() {
    let running = greet_host(AppConfig::default()).await;

    let response = request(&running, "/assets/greet.css").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.content_type.as_deref(),
        Some("text/css")
    );
    assert!(response.body.contains(".greeting"));

    let missing = request(&running, "/assets/missing.css").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_debug_mode_resolves_views_from_disk() {
    let config = AppConfig {
        debug: true,
        ..Default::default()
    };
    let running = greet_host(config).await;

    assert!(!running.services().views.is_caching());
    let response = request(&running, "/hello/zed").await;
    assert!(response.body.contains("Hello, ZED!"));
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let running = greet_host(AppConfig::default()).await;

    let response = request(&running, "/nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn test_health_lists_plugins() {
    let running = greet_host(AppConfig::default()).await;

    let response = request(&running, "/health").await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["plugins"], json!(["greet"]));
    assert_eq!(body["calls"], json!(["greet"]));
}

#[tokio::test]
async fn test_session_remembers_last_greeting() {
    let running = greet_host(AppConfig::default()).await;

    let first = request(&running, "/hello/ann").await;
    assert_eq!(first.status, StatusCode::OK);
    assert!(!first.body.contains("Last greeted"));
    assert!(first.body.contains("Your visits: 1"));
    assert!(first.set_cookie("apphost.session").unwrap().contains("HttpOnly"));
    assert!(first.set_cookie("greet.visits").is_some());
    let cookie = first.cookie_header();

    let second = send(
        &running,
        Request::builder()
            .uri("/hello/bo")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(second.body.contains("Hello, BO!"));
    assert!(second.body.contains("Last greeted: ann"));
    assert!(second.body.contains("Your visits: 2"));
}

#[tokio::test]
async fn test_forged_session_cookie_is_ignored() {
    let running = greet_host(AppConfig::default()).await;

    let response = send(
        &running,
        Request::builder()
            .uri("/hello/bo")
            .header(
                header::COOKIE,
                "apphost.session=%7B%22last%22%3A%22eve%22%7D; greet.visits=41",
            )
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body.contains("Last greeted"));
    assert!(response.body.contains("Your visits: 1"));
}

#[tokio::test]
async fn test_form_and_json_bodies_reach_handler() {
    let running = greet_host(AppConfig::default()).await;

    let form = send(
        &running,
        post("/hello", "application/x-www-form-urlencoded", "name=cy"),
    )
    .await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("Hello, CY!"));

    let json_body = send(&running, post("/hello", "application/json", r#"{"name":"di"}"#)).await;
    assert!(json_body.body.contains("Hello, DI!"));

    let missing = send(&running, post("/hello", "application/json", "{}")).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.json()["error"], json!("VALIDATION"));
}

#[tokio::test]
async fn test_short_session_secret_fails_startup() {
    let mut config = AppConfig::default();
    config.session.secret = "short".to_string();

    let err = Host::new(config).unwrap().start().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert!(err.message.contains("session.secret"));
}

#[tokio::test]
async fn test_host_and_services_share_loaded_libraries() {
    let running = greet_host(AppConfig::default()).await;

    assert!(running.libraries().is_empty());
    assert!(std::ptr::eq(
        running.libraries(),
        running.services().libraries.as_ref()
    ));
}

#[tokio::test]
async fn test_starts_and_listens_without_plugins() {
    let running = Host::new(AppConfig::default())
        .unwrap()
        .start()
        .await
        .unwrap();
    assert!(running.services().plugins.is_empty());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(running.serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    assert!(raw.starts_with("HTTP/1.1 200 OK"));
    assert!(raw.contains("\"plugins\":[]"));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
