//! Content-negotiated response decoding.

use crate::rate_limit::{RateLimitConfig, RateLimitInfo};
use crate::transport::TransportResponse;
use crate::{Error, Result};
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The payload kind a response declares through its content-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `application/json` or any `+json` media type.
    Json,
    /// Anything else, including a missing header.
    Text,
}

impl ContentKind {
    /// Reads the kind from response headers.
    ///
    /// # Examples
    ///
    /// ```
    /// use steadycall::decode::ContentKind;
    /// use http::HeaderMap;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", "application/problem+json; charset=utf-8".parse().unwrap());
    /// assert_eq!(ContentKind::from_headers(&headers), ContentKind::Json);
    ///
    /// assert_eq!(ContentKind::from_headers(&HeaderMap::new()), ContentKind::Text);
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
            return ContentKind::Text;
        };

        let essence = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json" || essence.ends_with("+json") {
            ContentKind::Json
        } else {
            ContentKind::Text
        }
    }
}

/// Decodes a 2xx response into `T`.
///
/// JSON responses are parsed; a parse failure becomes
/// [`Error::DeserializationFailed`] carrying the raw text. Text responses are
/// handed over unmodified, so `T` must accept a string (`String`,
/// `serde_json::Value`, ...). Empty bodies decode from `null` first so `()`
/// and `Option<_>` work for 204 responses.
pub fn decode_success<T>(response: &TransportResponse) -> Result<T>
where
    T: DeserializeOwned,
{
    let raw = response.body.as_str();

    if raw.trim().is_empty() {
        return T::deserialize(Value::Null)
            .or_else(|_| T::deserialize(Value::String(raw.to_string())))
            .map_err(|e| deserialization_failed(response, e));
    }

    let decoded = match ContentKind::from_headers(&response.headers) {
        ContentKind::Json => serde_json::from_str::<T>(raw),
        ContentKind::Text => T::deserialize(Value::String(raw.to_string())),
    };

    decoded.map_err(|e| {
        tracing::error!(
            error = %e,
            status = response.status.as_u16(),
            raw_response = %raw,
            "Failed to deserialize response"
        );
        deserialization_failed(response, e)
    })
}

/// Builds the error for a non-2xx response.
///
/// The body is kept as raw text and, when it parses as JSON, as a value too.
pub fn error_from_response(response: TransportResponse, rate_limit: &RateLimitConfig) -> Error {
    let TransportResponse {
        status,
        headers,
        body: raw_response,
    } = response;

    let body = serde_json::from_str::<Value>(&raw_response)
        .ok()
        .map(Box::new);

    let rate_limit_info = if rate_limit.enabled {
        Some(RateLimitInfo::from_headers(&headers)).filter(RateLimitInfo::is_active)
    } else {
        None
    };

    if status.is_client_error() {
        tracing::error!(
            status = status.as_u16(),
            response = %raw_response,
            "Client error (4xx)"
        );
    } else if status.is_server_error() {
        tracing::warn!(
            status = status.as_u16(),
            response = %raw_response,
            "Server error (5xx)"
        );
    }

    Error::HttpError {
        status,
        raw_response: raw_response.into_boxed_str(),
        body,
        headers: Box::new(headers),
        rate_limit_info,
    }
}

fn deserialization_failed(response: &TransportResponse, error: impl std::fmt::Display) -> Error {
    Error::DeserializationFailed {
        raw_response: response.body.clone(),
        serde_error: error.to_string(),
        status: response.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, StatusCode};
    use serde::Deserialize;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Project {
        id: u32,
        name: String,
    }

    fn response(status: u16, content_type: Option<&'static str>, body: &str) -> TransportResponse {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        TransportResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_content_kind_detection() {
        let kind = |ct: &'static str| {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
            ContentKind::from_headers(&headers)
        };
        assert_eq!(kind("application/json"), ContentKind::Json);
        assert_eq!(kind("Application/JSON; charset=utf-8"), ContentKind::Json);
        assert_eq!(kind("application/vnd.api+json"), ContentKind::Json);
        assert_eq!(kind("text/plain"), ContentKind::Text);
        assert_eq!(kind("text/html; charset=utf-8"), ContentKind::Text);
    }

    #[test]
    fn test_decode_json() {
        let resp = response(200, Some("application/json"), r#"{"id":7,"name":"atlas"}"#);
        let project: Project = decode_success(&resp).unwrap();
        assert_eq!(
            project,
            Project {
                id: 7,
                name: "atlas".to_string()
            }
        );
    }

    #[test]
    fn test_decode_invalid_json_is_an_error() {
        let resp = response(200, Some("application/json"), "{\"id\": 7,");
        match decode_success::<Project>(&resp) {
            Err(Error::DeserializationFailed {
                raw_response,
                status,
                ..
            }) => {
                assert_eq!(raw_response, "{\"id\": 7,");
                assert_eq!(status, StatusCode::OK);
            }
            other => panic!("Expected DeserializationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_text_is_unmodified() {
        let resp = response(200, Some("text/plain"), "{\"looks\": \"like json\"}");
        let text: String = decode_success(&resp).unwrap();
        assert_eq!(text, "{\"looks\": \"like json\"}");

        let resp = response(200, None, "plain");
        let value: Value = decode_success(&resp).unwrap();
        assert_eq!(value, Value::String("plain".to_string()));
    }

    #[test]
    fn test_decode_text_into_struct_fails() {
        let resp = response(200, Some("text/plain"), "hello");
        assert!(matches!(
            decode_success::<Project>(&resp),
            Err(Error::DeserializationFailed { .. })
        ));
    }

    #[test]
    fn test_decode_empty_body() {
        let resp = response(204, None, "");
        decode_success::<()>(&resp).unwrap();
        assert_eq!(decode_success::<Value>(&resp).unwrap(), Value::Null);
        assert_eq!(decode_success::<Option<Project>>(&resp).unwrap(), None);
        assert_eq!(decode_success::<String>(&resp).unwrap(), "");
    }

    #[test]
    fn test_error_keeps_json_and_raw_body() {
        let resp = response(422, Some("application/json"), r#"{"error":"name taken"}"#);
        let err = error_from_response(resp, &RateLimitConfig::default());

        assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
        assert_eq!(err.body(), Some(&json!({"error": "name taken"})));
        assert_eq!(err.raw_response(), Some(r#"{"error":"name taken"}"#));
    }

    #[test]
    fn test_error_falls_back_to_raw_text() {
        let resp = response(502, Some("text/html"), "<h1>Bad Gateway</h1>");
        let err = error_from_response(resp, &RateLimitConfig::default());

        assert_eq!(err.body(), None);
        assert_eq!(err.raw_response(), Some("<h1>Bad Gateway</h1>"));
    }

    #[test]
    fn test_error_rate_limit_info_respects_config() {
        let mut resp = response(429, None, "slow down");
        resp.headers
            .insert("retry-after", HeaderValue::from_static("3"));

        let err = error_from_response(resp.clone(), &RateLimitConfig::default());
        assert_eq!(
            err.rate_limit_info().and_then(|i| i.retry_after),
            Some(Duration::from_secs(3))
        );

        let err = error_from_response(resp, &RateLimitConfig::disabled());
        assert!(err.rate_limit_info().is_none());
    }
}
