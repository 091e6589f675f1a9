mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use imagecompare::{create_router, Config, ImageLimits};

use common::{png_base64, state_with, ScriptedModel};

// Helper function to send requests to the app
async fn send_request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Body>,
) -> (StatusCode, Option<String>, Value) {
    let request_builder = Request::builder().method(method).uri(uri);

    let request = match body {
        Some(body) => request_builder
            .header("content-type", "application/json")
            .body(body)
            .unwrap(),
        None => request_builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cache = response
        .headers()
        .get("x-cache")
        .map(|v| v.to_str().unwrap().to_string());

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, cache, json)
}

fn json_body(value: Value) -> Option<Body> {
    Some(Body::from(serde_json::to_string(&value).unwrap()))
}

fn app_with(replies: &[&str]) -> (Router, std::sync::Arc<ScriptedModel>) {
    let model = ScriptedModel::new(replies.iter().copied());
    let app = create_router(state_with(model.clone(), Config::default()));
    (app, model)
}

#[tokio::test]
async fn test_root_endpoint() {
    let (app, _) = app_with(&["Score: 1"]);

    let (status, cache, body) = send_request(&app, Method::GET, "/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache, None);
    assert_eq!(body, json!({ "message": "Image Comparison API is running" }));
}

#[tokio::test]
async fn test_compare_miss_then_hit() {
    let (app, model) = app_with(&["Score: 82\nExplanation: Both show a green square."]);
    let payload = json!({
        "image1": png_base64(8, 8, [0, 200, 0]),
        "image2": format!("data:image/png;base64,{}", png_base64(16, 16, [0, 190, 0])),
    });

    let (status, cache, body) =
        send_request(&app, Method::POST, "/compare", json_body(payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
    let score = body["similarity_score"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));
    assert_eq!(score, 82.0);
    assert!(!body["explanation"].as_str().unwrap().is_empty());
    assert_eq!(body["status"], "success");
    assert!(body["timestamp"].is_string());
    assert_eq!(body["data"]["model"], "scripted");

    let (status, cache, second) =
        send_request(&app, Method::POST, "/compare", json_body(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("HIT"));
    assert_eq!(second, body);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_compare_unparseable_reply_still_succeeds() {
    let (app, _) = app_with(&["They look alike to me."]);
    let payload = json!({
        "image1": png_base64(2, 2, [1, 1, 1]),
        "image2": png_base64(2, 2, [9, 9, 9]),
    });

    let (status, _, body) = send_request(&app, Method::POST, "/compare", json_body(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["similarity_score"], 50.0);
    assert_eq!(body["status"], "degraded");
    assert!(body["explanation"]
        .as_str()
        .unwrap()
        .contains("They look alike to me."));
}

#[tokio::test]
async fn test_compare_empty_image_is_bad_request() {
    let (app, model) = app_with(&["Score: 1"]);
    let payload = json!({ "image1": "", "image2": png_base64(2, 2, [0, 0, 0]) });

    let (status, cache, body) =
        send_request(&app, Method::POST, "/compare", json_body(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(cache, None);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("Invalid base64 image"));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_compare_garbage_image_is_bad_request() {
    let (app, _) = app_with(&["Score: 1"]);
    let payload = json!({ "image1": "aGVsbG8gd29ybGQ=", "image2": "aGVsbG8gd29ybGQ=" });

    let (status, _, body) = send_request(&app, Method::POST, "/compare", json_body(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid base64 image: "));
}

#[tokio::test]
async fn test_compare_malformed_body_is_rejected() {
    let (app, model) = app_with(&["Score: 1"]);

    let (status, _, body) = send_request(
        &app,
        Method::POST,
        "/compare",
        json_body(json!({ "image1": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("image2"));

    let (status, _, _) = send_request(
        &app,
        Method::POST,
        "/compare",
        Some(Body::from("{not json")),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_compare_without_content_type_is_validation_error() {
    let (app, model) = app_with(&["Score: 1"]);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/compare")
        .body(Body::from(r#"{"image1": "a", "image2": "b"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_compare_body_over_limit_is_payload_too_large() {
    let model = ScriptedModel::new(["Score: 1"]);
    let config = Config {
        limits: ImageLimits {
            max_bytes: 16,
            ..ImageLimits::default()
        },
        ..Config::default()
    };
    let limit = config.max_body_bytes();
    let app = create_router(state_with(model.clone(), config));

    // No content-length, so the limit trips while the body is buffered
    let oversized = json!({ "image1": "A".repeat(limit), "image2": "A" });
    let (status, _, _) = send_request(&app, Method::POST, "/compare", json_body(oversized)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_compare_model_failure_is_server_error() {
    // An empty script makes every model call fail.
    let (app, _) = app_with(&[]);
    let payload = json!({
        "image1": png_base64(2, 2, [1, 1, 1]),
        "image2": png_base64(2, 2, [2, 2, 2]),
    });

    let (status, cache, body) =
        send_request(&app, Method::POST, "/compare", json_body(payload)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(cache, None);
    assert!(body["detail"].as_str().unwrap().contains("no scripted reply"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _) = app_with(&["Score: 1"]);
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}
