//! Integration tests for the call pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use apphost_core::config::AppConfig;
use apphost_core::error::{AppError, ErrorKind};
use apphost_plugin::{CallPipeline, FnPlugin, PipelineStage, PluginManager, PluginSpec};

fn manager() -> PluginManager {
    PluginManager::new(Arc::new(AppConfig::default())).expect("manager")
}

fn pipeline(manager: PluginManager) -> CallPipeline {
    let parts = manager.into_parts();
    CallPipeline::new(Arc::new(parts.calls), Arc::new(parts.hooks))
}

fn push(mut payload: Value, tag: &str) -> Value {
    if let Some(trail) = payload["trail"].as_array_mut() {
        trail.push(json!(tag));
    }
    payload
}

#[tokio::test]
async fn test_before_operation_after_compose_in_order() {
    let mut manager = manager();
    manager
        .use_plugin(PluginSpec::setup(|ctx| {
            ctx.before("save", |p| async move { Ok(push(p, "h1")) });
            ctx.before("save", |p| async move { Ok(push(p, "h2")) });
            ctx.call("save", |p| async move { Ok(push(p, "op")) });
            ctx.after("save", |p| async move { Ok(push(p, "a1")) });
            Ok(())
        }))
        .unwrap();

    let out = pipeline(manager)
        .call("save", json!({ "trail": [] }))
        .await
        .unwrap();
    assert_eq!(out["trail"], json!(["h1", "h2", "op", "a1"]));
}

#[tokio::test]
async fn test_before_failure_short_circuits() {
    let ran = Arc::new(AtomicBool::new(false));
    let after_ran = Arc::new(AtomicBool::new(false));

    let mut manager = manager();
    let (op_flag, after_flag) = (ran.clone(), after_ran.clone());
    manager
        .use_plugin(FnPlugin::named("guard", move |ctx| {
            ctx.before("save", |p| async move { Ok(push(p, "h1")) });
            ctx.before("save", |_| async { Err(AppError::hook("title required")) });
            let op_flag = op_flag.clone();
            ctx.call("save", move |p| {
                let op_flag = op_flag.clone();
                async move {
                    op_flag.store(true, Ordering::SeqCst);
                    Ok(p)
                }
            });
            let after_flag = after_flag.clone();
            ctx.after("save", move |p| {
                let after_flag = after_flag.clone();
                async move {
                    after_flag.store(true, Ordering::SeqCst);
                    Ok(p)
                }
            });
            Ok(())
        }))
        .unwrap();

    let failure = pipeline(manager)
        .call("save", json!({ "trail": [] }))
        .await
        .unwrap_err();

    assert_eq!(failure.stage, PipelineStage::Before);
    assert_eq!(failure.error.kind, ErrorKind::Hook);
    assert_eq!(failure.error.message, "title required");
    assert_eq!(failure.plugin_id.as_deref(), Some("guard"));
    assert_eq!(failure.payload["trail"], json!(["h1"]));
    assert!(!ran.load(Ordering::SeqCst));
    assert!(!after_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_unknown_call_runs_nothing() {
    let hook_ran = Arc::new(AtomicBool::new(false));
    let flag = hook_ran.clone();

    let mut manager = manager();
    manager
        .use_plugin(PluginSpec::setup(move |ctx| {
            let flag = flag.clone();
            ctx.before("missing", move |p| {
                let flag = flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(p)
                }
            });
            Ok(())
        }))
        .unwrap();

    let failure = pipeline(manager).call("missing", json!(1)).await.unwrap_err();
    assert_eq!(failure.stage, PipelineStage::Lookup);
    assert_eq!(failure.error.kind, ErrorKind::CallNotFound);
    assert_eq!(failure.error.message, "Cannot call 'missing'");
    assert_eq!(failure.payload, json!(1));
    assert!(!hook_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_operation_and_after_failures_report_stage() {
    let mut manager = manager();
    manager
        .use_plugin(PluginSpec::setup(|ctx| {
            ctx.call("broken", |_| async { Err(AppError::operation("db down")) });
            ctx.call("audited", |p| async move { Ok(push(p, "op")) });
            ctx.after("audited", |_| async { Err(AppError::hook("audit failed")) });
            Ok(())
        }))
        .unwrap();
    let pipeline = pipeline(manager);

    let failure = pipeline.call("broken", json!({ "id": 7 })).await.unwrap_err();
    assert_eq!(failure.stage, PipelineStage::Operation);
    assert_eq!(failure.payload, json!({ "id": 7 }));
    let error: AppError = failure.into();
    assert_eq!(error.kind, ErrorKind::Operation);

    let failure = pipeline
        .call("audited", json!({ "trail": [] }))
        .await
        .unwrap_err();
    assert_eq!(failure.stage, PipelineStage::After);
    assert_eq!(failure.payload["trail"], json!(["op"]));
}

#[tokio::test]
async fn test_attach_order_defines_hook_order() {
    let mut manager = manager();
    manager
        .use_plugin(FnPlugin::named("first", |ctx| {
            ctx.before("greet", |p| async move { Ok(push(p, "first")) });
            Ok(())
        }))
        .unwrap();
    manager
        .use_plugin(FnPlugin::named("second", |ctx| {
            ctx.before("greet", |p| async move { Ok(push(p, "second")) });
            ctx.call("greet", |p| async move { Ok(p) });
            Ok(())
        }))
        .unwrap();

    let out = pipeline(manager)
        .call("greet", json!({ "trail": [] }))
        .await
        .unwrap();
    assert_eq!(out["trail"], json!(["first", "second"]));
}

#[tokio::test]
async fn test_detached_call_survives_dropped_caller() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();

    let mut manager = manager();
    manager
        .use_plugin(PluginSpec::setup(move |ctx| {
            ctx.call("slow", |p| async move { Ok(p) });
            let flag = flag.clone();
            ctx.after("slow", move |p| {
                let flag = flag.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    flag.store(true, Ordering::SeqCst);
                    Ok(p)
                }
            });
            Ok(())
        }))
        .unwrap();
    let pipeline = pipeline(manager);

    let timed_out =
        tokio::time::timeout(Duration::from_millis(5), pipeline.call_detached("slow", json!(null)))
            .await
            .is_err();
    assert!(timed_out);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(finished.load(Ordering::SeqCst));
}
