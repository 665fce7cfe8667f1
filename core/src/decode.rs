//! Body decoding keyed by [`ResponseType`].

use crate::error::RequestError;
use crate::http::{RawResponse, ResponseData, ResponseType};

/// Decode `raw.body` as `response_type`.
///
/// An empty body decodes to JSON `null` rather than failing, since
/// `204 No Content` with the default `json` type is common.
pub fn decode_body(response_type: ResponseType, raw: &RawResponse) -> Result<ResponseData, RequestError> {
    let decode_error = |message: String| RequestError::Decode {
        url: raw.url.clone(),
        response_type,
        message,
    };

    match response_type {
        ResponseType::ArrayBuffer => Ok(ResponseData::ArrayBuffer(raw.body.clone())),
        ResponseType::Blob => Ok(ResponseData::Blob {
            content_type: raw.header("content-type").map(str::to_string),
            bytes: raw.body.clone(),
        }),
        ResponseType::Json => {
            if raw.body.iter().all(u8::is_ascii_whitespace) {
                return Ok(ResponseData::Json(serde_json::Value::Null));
            }
            serde_json::from_slice(&raw.body)
                .map(ResponseData::Json)
                .map_err(|e| decode_error(e.to_string()))
        }
        ResponseType::Text => utf8(&raw.body).map(ResponseData::Text).map_err(decode_error),
        ResponseType::Document => utf8(&raw.body).map(ResponseData::Document).map_err(decode_error),
    }
}

fn utf8(body: &[u8]) -> Result<String, String> {
    String::from_utf8(body.to_vec()).map_err(|e| e.to_string())
}
