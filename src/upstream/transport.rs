//! HTTP transport seam. The engine only talks to [`Transport`]; production
//! code uses [`UreqTransport`], tests plug in canned responses.

use super::request::{Method, RequestDescriptor};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Failure below HTTP: DNS, connect, TLS, timeout, unreadable body.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

pub trait Transport {
    /// Send one request. Non-2xx statuses are returned as responses, not errors.
    fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .user_agent(concat!("rtimesync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
        let mut req = match request.method {
            Method::Get => self.agent.get(&request.url),
            Method::Post => self.agent.post(&request.url),
        };
        req = req.timeout(request.timeout);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }
        for (key, value) in &request.query {
            req = req.query(key, value);
        }

        let result = match &request.body {
            Some(body) => req
                .set("Content-Type", "application/json")
                .send_string(&body.to_string()),
            None => req.call(),
        };

        match result {
            Ok(resp) => {
                let status = resp.status();
                let body = resp.into_string().map_err(|e| TransportError {
                    message: format!("failed to read response body: {e}"),
                })?;
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::Transport(t)) => Err(TransportError {
                message: t.to_string(),
            }),
        }
    }
}
