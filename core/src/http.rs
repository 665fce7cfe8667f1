//! HTTP exchange types passed between the manager and its transport.
//!
//! # Design
//! Requests and responses are plain owned data. The manager builds a
//! `TransportRequest`, hands it to a [`Transport`](crate::transport::Transport),
//! and turns the `RawResponse` it gets back into a decoded [`Response`]. No
//! type here knows how the bytes travel, which keeps scripted transports in
//! tests trivial to write.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::UnknownMethod;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    /// Case-insensitive, so `"get"` and `"GET"` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// How the response body should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseType {
    ArrayBuffer,
    Blob,
    Document,
    #[default]
    Json,
    Text,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseType::ArrayBuffer => "arrayBuffer",
            ResponseType::Blob => "blob",
            ResponseType::Document => "document",
            ResponseType::Json => "json",
            ResponseType::Text => "text",
        };
        f.write_str(name)
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    Bytes(Vec<u8>),
    /// Serialized by the transport; sets `content-type: application/json`
    /// unless the caller already set one.
    Json(serde_json::Value),
}

/// Transport pass-through options (credentials mode, redirect policy, ...).
///
/// The manager never reads these. Each transport decides which keys it
/// honors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions(BTreeMap<String, String>);

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Bytes moved so far in one direction of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    /// Expected size, when the peer announced one.
    pub total: Option<u64>,
}

/// Callback receiving [`ProgressEvent`]s.
#[derive(Clone)]
pub struct ProgressHandler(Arc<dyn Fn(ProgressEvent) + Send + Sync>);

impl ProgressHandler {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(handler))
    }

    pub fn emit(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for ProgressHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressHandler(<fn>)")
    }
}

/// A fully resolved request, ready for the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    /// Canonical URL, query already merged.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub options: TransportOptions,
    pub upload_progress: Option<ProgressHandler>,
    pub download_progress: Option<ProgressHandler>,
}

/// What the transport hands back once the body has been read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    /// Final URL after any redirects the transport followed.
    pub url: String,
    /// Header pairs as received; names may repeat.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn into_response(self, data: ResponseData) -> Response {
        Response {
            headers: collect_headers(self.headers),
            status: self.status,
            status_text: self.status_text,
            url: self.url,
            data,
        }
    }
}

/// Decoded body, shaped by the requested [`ResponseType`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ResponseData {
    ArrayBuffer(Vec<u8>),
    Blob {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    /// Markup text. Building a DOM from it is up to the caller.
    Document(String),
    Json(serde_json::Value),
    Text(String),
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) | ResponseData::Document(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ResponseData::ArrayBuffer(bytes) | ResponseData::Blob { bytes, .. } => Some(bytes.as_slice()),
            _ => None,
        }
    }
}

/// A settled, successfully exchanged response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Lower-cased names; repeated headers joined with `, `.
    pub headers: BTreeMap<String, String>,
    pub status: u16,
    pub status_text: String,
    pub url: String,
    pub data: ResponseData,
}

fn collect_headers(pairs: Vec<(String, String)>) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in pairs {
        let value = decode_header_value(&value);
        headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    headers
}

/// Reserved characters whose `%XX` escapes stay encoded.
const RESERVED: &[u8] = b";/?:@&=+$,#";

/// Percent-decode a header value, keeping escapes of reserved characters.
/// A malformed escape or non-UTF-8 result leaves the value untouched.
fn decode_header_value(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let decoded = bytes
            .get(i + 1..i + 3)
            .and_then(|hex| Some((hex_digit(hex[0])? << 4) | hex_digit(hex[1])?));
        match decoded {
            Some(byte) if !RESERVED.contains(&byte) => out.push(byte),
            Some(_) => out.extend_from_slice(&bytes[i..i + 3]),
            None => return value.to_string(),
        }
        i += 3;
    }
    String::from_utf8(out).unwrap_or_else(|_| value.to_string())
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn response_type_uses_camel_case_names() {
        let parsed: ResponseType = serde_json::from_str(r#""arrayBuffer""#).unwrap();
        assert_eq!(parsed, ResponseType::ArrayBuffer);
        assert_eq!(ResponseType::ArrayBuffer.to_string(), "arrayBuffer");
        assert_eq!(ResponseType::default(), ResponseType::Json);
    }

    #[test]
    fn repeated_headers_are_joined() {
        let raw = RawResponse {
            status: 200,
            status_text: "OK".to_string(),
            url: "http://x/".to_string(),
            headers: vec![
                ("Set-Cookie".to_string(), "a=1".to_string()),
                ("set-cookie".to_string(), "b=2".to_string()),
                ("Content-Type".to_string(), "text/plain".to_string()),
            ],
            body: Vec::new(),
        };
        assert_eq!(raw.header("content-type"), Some("text/plain"));
        let response = raw.into_response(ResponseData::Text(String::new()));
        assert_eq!(response.headers["set-cookie"], "a=1, b=2");
        assert_eq!(response.headers["content-type"], "text/plain");
    }

    #[test]
    fn header_values_are_percent_decoded() {
        let raw = RawResponse {
            status: 200,
            status_text: "OK".to_string(),
            url: "http://x/".to_string(),
            headers: vec![
                ("X-Name".to_string(), "%E4%B8%80%20file".to_string()),
                ("X-Path".to_string(), "a%2Fb%3Fc".to_string()),
                ("X-Broken".to_string(), "100%".to_string()),
            ],
            body: Vec::new(),
        };
        let response = raw.into_response(ResponseData::Text(String::new()));
        assert_eq!(response.headers["x-name"], "一 file");
        assert_eq!(response.headers["x-path"], "a%2Fb%3Fc");
        assert_eq!(response.headers["x-broken"], "100%");
    }

    #[test]
    fn options_iterate_in_key_order() {
        let mut options = TransportOptions::new();
        options.insert("redirect", "manual");
        options.insert("credentials", "include");
        let pairs: Vec<(&str, &str)> = options.iter().collect();
        assert_eq!(pairs, vec![("credentials", "include"), ("redirect", "manual")]);
    }

    #[test]
    fn progress_handler_forwards_events() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let handler = ProgressHandler::new({
            let seen = Arc::clone(&seen);
            move |event| seen.lock().unwrap().push(event)
        });
        handler.emit(ProgressEvent { loaded: 3, total: Some(9) });
        assert_eq!(seen.lock().unwrap()[0], ProgressEvent { loaded: 3, total: Some(9) });
        assert_eq!(format!("{handler:?}"), "ProgressHandler(<fn>)");
    }
}
