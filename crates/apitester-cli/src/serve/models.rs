//! Request/response types for the HTTP service.
//!
//! Suites and results travel as the core types themselves; this module
//! adds content negotiation, the error body, and the few replies that
//! have no core counterpart.

use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::error;

use apitester_core::ManagerError;

pub const YAML_MEDIA_TYPE: &str = "application/yaml";

const YAML_ALIASES: [&str; 3] = [YAML_MEDIA_TYPE, "application/x-yaml", "text/yaml"];

// =============================================================================
// Content Negotiation
// =============================================================================

/// Wire format of a request or response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Format of the request body, from `Content-Type`.
    pub fn of_request(headers: &HeaderMap) -> Self {
        Self::from_header(headers, header::CONTENT_TYPE)
    }

    /// Format the client wants back, from `Accept`.
    pub fn of_response(headers: &HeaderMap) -> Self {
        Self::from_header(headers, header::ACCEPT)
    }

    fn from_header(headers: &HeaderMap, name: HeaderName) -> Self {
        let wants_yaml = headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| {
                value.split(',').any(|part| {
                    let media = part.split(';').next().unwrap_or_default().trim();
                    YAML_ALIASES.iter().any(|alias| media.eq_ignore_ascii_case(alias))
                })
            });

        if wants_yaml {
            Format::Yaml
        } else {
            Format::Json
        }
    }

    /// Decodes a request body.
    pub fn parse<T: DeserializeOwned>(self, body: &[u8]) -> Result<T, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::bad_request("No data received."));
        }

        match self {
            Format::Json => serde_json::from_slice(body)
                .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}"))),
            Format::Yaml => serde_yaml::from_slice(body)
                .map_err(|e| ApiError::bad_request(format!("Invalid YAML body: {e}"))),
        }
    }

    /// Encodes a response body.
    pub fn render<T: Serialize>(self, status: StatusCode, value: &T) -> Response {
        match self {
            Format::Json => (status, Json(value)).into_response(),
            Format::Yaml => match serde_yaml::to_string(value) {
                Ok(text) => (status, [(header::CONTENT_TYPE, YAML_MEDIA_TYPE)], text).into_response(),
                Err(e) => ApiError::internal(format!("Could not encode YAML: {e}")).into_response(),
            },
        }
    }
}

// =============================================================================
// Replies
// =============================================================================

/// Reply to `POST /tests/{id}/cancel`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelReply {
    /// False when no run of the suite was in flight.
    pub cancelled: bool,
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// =============================================================================
// Errors
// =============================================================================

/// An error that maps onto an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        let status = if err.is_not_found() {
            StatusCode::NOT_FOUND
        } else if err.is_invalid() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "Request failed");
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use apitester_core::{StorageError, TestSuite};

    fn headers(name: HeaderName, value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_static(value));
        map
    }

    #[test]
    fn test_format_defaults_to_json() {
        assert_eq!(Format::of_response(&HeaderMap::new()), Format::Json);
        assert_eq!(Format::of_response(&headers(header::ACCEPT, "*/*")), Format::Json);
    }

    #[test]
    fn test_format_detects_yaml() {
        assert_eq!(
            Format::of_request(&headers(header::CONTENT_TYPE, "application/yaml; charset=utf-8")),
            Format::Yaml
        );
        assert_eq!(
            Format::of_response(&headers(header::ACCEPT, "text/html, application/x-yaml")),
            Format::Yaml
        );
    }

    #[test]
    fn test_parse_yaml_suite() {
        let body = b"name: people\ntests:\n  - name: t1\n    url: https://example.test\n";
        let suite: TestSuite = Format::Yaml.parse(body).unwrap();
        assert_eq!(suite.tests[0].name, "t1");
    }

    #[test]
    fn test_parse_rejects_empty_body() {
        let err = Format::Json.parse::<TestSuite>(b"  ").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError::from(ManagerError::Storage(StorageError::SuiteNotFound("x".into())));
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let invalid = ApiError::from(ManagerError::Storage(StorageError::InvalidId("..".into())));
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_yaml_render_sets_content_type() {
        let response = Format::Yaml.render(StatusCode::OK, &CancelReply { cancelled: true });
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            YAML_MEDIA_TYPE
        );
    }
}
