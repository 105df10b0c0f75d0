use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;

use crate::config::RunnerConfig;
use crate::suite::Verb;

use super::{HttpTransport, PreparedRequest, ResponseSnapshot, TransportError};

/// `HttpTransport` backed by a shared reqwest client.
///
/// The client carries the configured timeout, so a stalled target fails
/// the case instead of hanging the run.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &RunnerConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client as-is.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn method(verb: Verb) -> Method {
    match verb {
        Verb::Get => Method::GET,
        Verb::Post => Method::POST,
        Verb::Put => Method::PUT,
        Verb::Patch => Method::PATCH,
        Verb::Delete => Method::DELETE,
        Verb::Head => Method::HEAD,
        Verb::Options => Method::OPTIONS,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseSnapshot, TransportError> {
        let mut req = self.client.request(method(request.method), &request.url);

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let response = req.send().await?;
        let status = response.status().as_u16();

        let mut snapshot = ResponseSnapshot::new(status, String::new());
        for (name, value) in response.headers() {
            snapshot.insert_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        snapshot.body = response.text().await?;

        debug!(url = %request.url, status, bytes = snapshot.body.len(), "Received response");

        Ok(snapshot)
    }
}
