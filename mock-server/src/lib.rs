use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{Path, RawQuery},
    http::{header, HeaderMap, Method, StatusCode},
    response::{Html, IntoResponse, Redirect},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// How long `/test/delay` waits before answering.
pub const DELAY_MS: u64 = 200;

pub fn app() -> Router {
    Router::new()
        .route("/test", get(test))
        .route("/test/delay", get(test_delay))
        .route("/sleep/{ms}", get(sleep))
        .route("/status/{code}", any(status))
        .route("/echo", any(echo))
        .route("/text", get(text))
        .route("/html", get(html))
        .route("/bytes", get(bytes))
        .route("/malformed", get(malformed))
        .route("/redirect", get(redirect))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn test() -> Json<Value> {
    Json(json!({ "data": "一段文字", "some": 111 }))
}

async fn test_delay() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(DELAY_MS)).await;
    Json(json!({ "some": 111 }))
}

async fn sleep(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "slept_ms": ms }))
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, Json(json!({ "status": code }))))
}

/// What `/echo` saw on the wire.
#[derive(Debug, Serialize)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

async fn echo(method: Method, RawQuery(query): RawQuery, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_string(), value)
        })
        .collect();
    Json(Echo {
        method: method.as_str().to_string(),
        query,
        headers,
        body,
    })
}

async fn text() -> &'static str {
    "plain text body"
}

async fn html() -> Html<&'static str> {
    Html("<!doctype html><html><body><p>hello</p></body></html>")
}

async fn bytes() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        vec![0u8, 1, 2, 255],
    )
}

async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{not json")
}

async fn redirect() -> Redirect {
    Redirect::temporary("/test")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_rejects_out_of_range_codes() {
        let err = status(Path(1000)).await.unwrap_err();
        assert_eq!(err, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_echoes_code() {
        let (code, Json(body)) = status(Path(404)).await.unwrap();
        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_payload_matches_fixture() {
        let Json(body) = test().await;
        assert_eq!(body, json!({ "data": "一段文字", "some": 111 }));
    }
}
