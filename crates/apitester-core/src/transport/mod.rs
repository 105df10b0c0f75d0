mod response;
mod reqwest_client;

pub use reqwest_client::ReqwestTransport;
pub use response::ResponseSnapshot;

use async_trait::async_trait;
use thiserror::Error;

use crate::suite::{TestCase, Verb};

/// Errors reaching a target endpoint.
///
/// Any HTTP status is a response, not an error; these cover requests
/// that never got one.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Could not connect: {0}")]
    Connect(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request failed: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// A fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Verb,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl PreparedRequest {
    /// Builds the request for a case, or `None` when the case has no url.
    ///
    /// A structured body gets `content-type: application/json` unless the
    /// case sets its own content type.
    pub fn from_case(case: &TestCase) -> Option<Self> {
        let url = case.target_url()?;
        let mut headers: Vec<(String, String)> = case
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let body = case.request.as_ref().map(|body| {
            let (text, content_type) = body.encode();
            if let Some(content_type) = content_type {
                if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
                    headers.push(("content-type".to_string(), content_type.to_string()));
                }
            }
            text
        });

        Some(Self {
            method: case.verb,
            url,
            headers,
            body,
        })
    }

    /// Adds a header unless the case already set one with that name.
    pub fn with_default_header(mut self, name: &str, value: impl Into<String>) -> Self {
        if !self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name)) {
            self.headers.push((name.to_string(), value.into()));
        }
        self
    }
}

/// Sends prepared requests to target endpoints.
///
/// Implementations must not retry: every case issues its call exactly once.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseSnapshot, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseSnapshot, TransportError> {
        (**self).send(request).await
    }
}
