mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chat_service::services::fallback::TEXT_APOLOGY;
use chat_service::services::GatewayError;
use common::TestContext;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn chat_request(body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn multipart_request(field: &str, file: &[u8]) -> Request<Body> {
    let boundary = "chat-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"photo.jpg\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/process-image")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn chat_returns_canonical_reply() {
    let ctx = TestContext::new();
    ctx.gateway.reply("We have mugs.", Some("c-1"));

    let response = ctx
        .router()
        .oneshot(chat_request(json!({"message": "mugs?"}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::SET_COOKIE));
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        body_json(response).await,
        json!({
            "message": "We have mugs.",
            "products": [{"id": 42, "name": "Blue Mug"}],
            "faqs": []
        })
    );
}

#[tokio::test]
async fn chat_without_message_is_rejected() {
    let ctx = TestContext::new();

    let response = ctx
        .router()
        .oneshot(chat_request(json!({"text": "wrong field"}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Missing message parameter"));
    assert_eq!(ctx.gateway.call_count(), 0);
}

#[tokio::test]
async fn chat_with_malformed_json_is_rejected() {
    let ctx = TestContext::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = ctx.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.gateway.call_count(), 0);
}

#[tokio::test]
async fn gateway_failure_still_answers_200() {
    let ctx = TestContext::new();
    ctx.gateway.push(Err(GatewayError::Timeout));

    let response = ctx
        .router()
        .oneshot(chat_request(json!({"message": "hello"}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], TEXT_APOLOGY);
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn session_cookie_links_turns() {
    let ctx = TestContext::new();
    ctx.gateway.reply("First", Some("c-123"));
    ctx.gateway.reply("Second", Some("c-123"));
    let router = ctx.router();

    let first = router
        .clone()
        .oneshot(chat_request(json!({"message": "hello"}), None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = first
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    let second = router
        .oneshot(chat_request(json!({"message": "more please"}), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    let calls = ctx.gateway.calls();
    assert_eq!(calls[0].0.conversation_id, None);
    assert_eq!(calls[1].0.conversation_id.as_deref(), Some("c-123"));
}

#[tokio::test]
async fn process_image_forwards_upload() {
    let ctx = TestContext::new();
    ctx.gateway.reply("Nice shoes.", None);

    let response = ctx
        .router()
        .oneshot(multipart_request("image", &[0xFF, 0xD8, 0xFF]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Nice shoes.");
    assert_eq!(ctx.gateway.call_count(), 1);
}

#[tokio::test]
async fn process_image_without_file_is_rejected() {
    let ctx = TestContext::new();

    let response = ctx
        .router()
        .oneshot(multipart_request("attachment", &[0xFF, 0xD8]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("No image uploaded or upload error"));
    assert_eq!(ctx.gateway.call_count(), 0);
}

#[tokio::test]
async fn process_image_without_multipart_is_rejected() {
    let ctx = TestContext::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/process-image")
        .body(Body::empty())
        .unwrap();

    let response = ctx.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.gateway.call_count(), 0);
}

#[tokio::test]
async fn unknown_api_path_is_404() {
    let ctx = TestContext::new();
    let request = Request::builder()
        .uri("/api/does-not-exist")
        .body(Body::empty())
        .unwrap();

    let response = ctx.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("Invalid API endpoint"));
}

#[tokio::test]
async fn search_by_query_and_category() {
    let ctx = TestContext::new();

    let by_query = ctx
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/search?q=lamp")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(by_query.status(), StatusCode::OK);
    let body = body_json(by_query).await;
    assert_eq!(body["count"], 2);

    let by_category = ctx
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/search?category=furniture&limit=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(by_category).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["products"][0]["name"], "Oak Desk");
}

#[tokio::test]
async fn search_without_parameters_is_rejected() {
    let ctx = TestContext::new();

    let response = ctx
        .router()
        .oneshot(Request::builder().uri("/api/search").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("Missing search parameters"));
}

#[tokio::test]
async fn faq_lists_matching_entries() {
    let ctx = TestContext::new();

    let response = ctx
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/faq?q=shipping")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn health_reports_service() {
    let ctx = TestContext::new();

    let response = ctx
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-content-type-options")
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "chat-service");
}
