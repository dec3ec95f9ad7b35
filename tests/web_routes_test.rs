//! Tests for the HTTP trigger surface.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{harness, post, FakeDestination, FakeSource};
use tweet_mirror::config::Config;
use tweet_mirror::store::{MirrorStore, LATEST_KEY};
use tweet_mirror::web::{create_app, AppState};

fn scheduled(cron: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/scheduled")
        .header("content-type", "application/json")
        .body(Body::from(format!(r#"{{"cron": "{cron}"}}"#)))
        .unwrap()
}

#[tokio::test]
async fn test_root_is_empty_ok() {
    let h = harness(FakeSource::default(), FakeDestination::default());
    let app = create_app(AppState {
        config: Arc::new(Config::for_testing()),
        ctx: h.ctx.clone(),
    });

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(body.is_empty());
    assert!(h.source.fetch_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_post_schedule_runs_post_cycle() {
    let source = FakeSource::with_timeline(vec![post("4", "4", "hi")], vec![]);
    let h = harness(source, FakeDestination::default());
    let app = create_app(AppState {
        config: Arc::new(Config::for_testing()),
        ctx: h.ctx.clone(),
    });

    let response = app.oneshot(scheduled("*/5 * * * *")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["cycle"], "post-sync");
    assert_eq!(report["published"], 1);
    assert_eq!(h.store.get(LATEST_KEY).await.unwrap().as_deref(), Some("4"));
}

#[tokio::test]
async fn test_unknown_schedule_is_not_found() {
    let h = harness(FakeSource::default(), FakeDestination::default());
    let app = create_app(AppState {
        config: Arc::new(Config::for_testing()),
        ctx: h.ctx.clone(),
    });

    let response = app.oneshot(scheduled("0 12 * * *")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(h.source.fetch_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_cycle_is_server_error() {
    let h = harness(FakeSource::default(), FakeDestination::default());
    let app = create_app(AppState {
        config: Arc::new(Config::for_testing()),
        ctx: h.ctx.clone(),
    });

    // The fake source has no profile to serve.
    let response = app.oneshot(scheduled("0 0 * * *")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
