use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- fixtures ---

#[tokio::test]
async fn test_returns_fixture() {
    let resp = app().oneshot(get("/test")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"], "一段文字");
    assert_eq!(body["some"], 111);
}

#[tokio::test]
async fn delay_answers_after_waiting() {
    let started = std::time::Instant::now();
    let resp = app().oneshot(get("/test/delay")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(started.elapsed().as_millis() >= u128::from(mock_server::DELAY_MS));
    let body = body_json(resp).await;
    assert_eq!(body["some"], 111);
}

#[tokio::test]
async fn sleep_reports_duration() {
    let resp = app().oneshot(get("/sleep/5")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["slept_ms"], 5);
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app().oneshot(get("/status/503")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(resp).await["status"], 503);
}

#[tokio::test]
async fn status_accepts_any_method() {
    let req = Request::builder()
        .method("DELETE")
        .uri("/status/404")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_non_numeric_returns_400() {
    let resp = app().oneshot(get("/status/teapot")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_request() {
    let req = Request::builder()
        .method("POST")
        .uri("/echo?id=1&id=2")
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("x-trace", "abc")
        .body(r#"{"q":"rust"}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["method"], "POST");
    assert_eq!(body["query"], "id=1&id=2");
    assert_eq!(body["headers"]["x-trace"], "abc");
    assert_eq!(body["headers"]["content-type"], "application/json");
    assert_eq!(body["body"], r#"{"q":"rust"}"#);
}

#[tokio::test]
async fn echo_without_query_is_null() {
    let resp = app().oneshot(get("/echo")).await.unwrap();

    let body = body_json(resp).await;
    assert!(body["query"].is_null());
    assert_eq!(body["body"], "");
}

// --- content types ---

#[tokio::test]
async fn text_is_plain() {
    let resp = app().oneshot(get("/text")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[http::header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(body_bytes(resp).await, "plain text body");
}

#[tokio::test]
async fn html_is_markup() {
    let resp = app().oneshot(get("/html")).await.unwrap();

    assert!(resp.headers()[http::header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let body = body_bytes(resp).await;
    assert!(body.starts_with(b"<!doctype html>"));
}

#[tokio::test]
async fn bytes_are_binary() {
    let resp = app().oneshot(get("/bytes")).await.unwrap();

    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(&body_bytes(resp).await[..], &[0u8, 1, 2, 255]);
}

#[tokio::test]
async fn malformed_claims_json() {
    let resp = app().oneshot(get("/malformed")).await.unwrap();

    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/json");
    let bytes = body_bytes(resp).await;
    assert!(serde_json::from_slice::<Value>(&bytes).is_err());
}

#[tokio::test]
async fn redirect_points_at_test() {
    let resp = app().oneshot(get("/redirect")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(resp.headers()[http::header::LOCATION], "/test");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let resp = app().oneshot(get("/nope")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
