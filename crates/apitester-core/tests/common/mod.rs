#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use apitester_core::{HttpTransport, PreparedRequest, ResponseSnapshot, TransportError};
use async_trait::async_trait;

enum Reply {
    Respond(ResponseSnapshot),
    Refuse(String),
    Hang,
}

/// Transport double that answers by URL and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<PreparedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, response: ResponseSnapshot) -> Self {
        self.set(url, response);
        self
    }

    pub fn refuse(self, url: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Refuse(format!("connection refused: {url}")));
        self
    }

    /// Never answers requests to `url`.
    pub fn hang(self, url: &str) -> Self {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Hang);
        self
    }

    /// Changes the reply for `url` between runs.
    pub fn set(&self, url: &str, response: ResponseSnapshot) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Respond(response));
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseSnapshot, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = match self.replies.lock().unwrap().get(&request.url) {
            Some(Reply::Respond(response)) => Some(Ok(response.clone())),
            Some(Reply::Refuse(reason)) => Some(Err(TransportError::Connect(reason.clone()))),
            Some(Reply::Hang) => None,
            None => Some(Err(TransportError::Connect(format!("no route to {}", request.url)))),
        };
        match reply {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

pub fn json_response(body: &str) -> ResponseSnapshot {
    ResponseSnapshot::new(200, body)
        .with_header("content-type", "application/json")
        .with_header("content-length", body.len().to_string())
}
