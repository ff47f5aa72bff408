// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_health_reports_ready_and_streams() {
    let node = test_node();
    send(&node.app, post_json("/logs", json!({ "type": "info", "title": "x" }))).await;

    let (status, body) = send_json(&node.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["streams"].as_array().unwrap().len(), 4);
    assert_eq!(body["streams"][0]["file"], "aggregate.log");
    assert!(body["streams"][0]["bytes"].as_u64().unwrap() > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_checks_alongside_appends() {
    let node = test_node();

    let checks: Vec<_> = (0..8)
        .map(|i| {
            let app = node.app.clone();
            tokio::spawn(async move {
                send(&app, post_json("/logs/info", json!({ "title": format!("tick {}", i) }))).await;
                send_json(&app, get("/health")).await
            })
        })
        .collect();

    for check in checks {
        let (status, body) = check.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
    }

    let (_, body) = send_json(&node.app, get("/logs?type=info")).await;
    assert_eq!(body["count"], 8);
    // The writability check leaves no stray files next to the streams
    let stray: Vec<_> = std::fs::read_dir(node.dir.path().join("logs"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|n| !n.to_string_lossy().ends_with(".log"))
        .collect();
    assert!(stray.is_empty(), "stray files: {:?}", stray);
}

#[tokio::test]
async fn test_health_unavailable_without_directory() {
    let node = test_node();
    std::fs::remove_dir_all(node.dir.path().join("logs")).unwrap();

    let (status, body) = send_json(&node.app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    // Appends now fail and are reported, not swallowed
    let (status, body) = send_json(&node.app, post_json("/logs", json!({ "type": "info", "title": "x" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    // Reads of missing streams stay empty rather than erroring
    let (status, body) = send_json(&node.app, get("/logs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_dashboard_renders_newest_first() {
    let node = test_node();
    send(&node.app, post_json("/logs", json!({ "type": "error", "title": "First <b>" }))).await;
    send(&node.app, post_json("/logs", json!({ "type": "error", "title": "Second" }))).await;

    let (status, bytes) = send(&node.app, get("/dashboard?type=error")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(bytes).unwrap();

    let second = html.find("Second").unwrap();
    let first = html.find("First &lt;b&gt;").unwrap();
    assert!(second < first);
    assert!(html.contains("Showing up to 50"));

    let (status, bytes) = send(&node.app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(bytes).unwrap();
    assert!(html.contains("<a href=\"/dashboard?type=aggregate\" class=\"active\">"));
    assert!(html.contains("Second"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let node = test_node();
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/logs")
        .header("origin", "https://app.example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(node.app.clone(), req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
