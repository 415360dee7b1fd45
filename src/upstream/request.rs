//! Request descriptors and the candidate-chain combinator.
//!
//! The upstream provider does not expose one stable shape per endpoint, so
//! every lookup is expressed as an ordered list of [`RequestDescriptor`]s and
//! handed to [`try_in_order`]. Each candidate is sent exactly once with its
//! own timeout; the first one answering 2xx with a JSON body wins.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::transport::{HttpResponse, Transport};

/// Longest response body kept in a failure record.
pub const BODY_SNIPPET_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl RequestDescriptor {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            timeout: Duration::from_secs(20),
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    pub fn headers(mut self, headers: &[(String, String)]) -> Self {
        self.headers.extend(headers.iter().cloned());
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL with the query string appended, used for diagnostics and by
    /// fake transports to route canned responses.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let qs = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.url, qs)
    }
}

/// One failed candidate, kept for operator diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptFailure {
    pub method: Method,
    pub url: String,
    pub status: Option<u16>,
    pub body: Option<String>,
    pub message: String,
}

/// Every candidate of a chain failed.
#[derive(Debug, Clone, Error)]
pub struct UpstreamError {
    pub context: String,
    pub attempts: Vec<AttemptFailure>,
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Upstream request failed ({}): {} candidate(s) exhausted",
            self.context,
            self.attempts.len()
        )?;
        if let Some(last) = self.attempts.last() {
            write!(f, "; last: {} {}", last.method.as_str(), last.url)?;
            if let Some(status) = last.status {
                write!(f, " -> {status}")?;
            }
            write!(f, " ({})", last.message)?;
        }
        Ok(())
    }
}

/// Successful chain result plus the candidates that failed before it.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub value: Value,
    pub url: String,
    pub failures: Vec<AttemptFailure>,
}

fn snippet(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() <= BODY_SNIPPET_LEN {
        return Some(trimmed.to_string());
    }
    let mut s: String = trimmed.chars().take(BODY_SNIPPET_LEN).collect();
    s.push('…');
    Some(s)
}

fn evaluate(request: &RequestDescriptor, response: HttpResponse) -> Result<Value, AttemptFailure> {
    let failure = |status: Option<u16>, body: &str, message: String| AttemptFailure {
        method: request.method,
        url: request.full_url(),
        status,
        body: snippet(body),
        message,
    };

    if !(200..300).contains(&response.status) {
        return Err(failure(
            Some(response.status),
            &response.body,
            format!("HTTP {}", response.status),
        ));
    }

    serde_json::from_str::<Value>(&response.body).map_err(|e| {
        failure(
            Some(response.status),
            &response.body,
            format!("invalid JSON body: {e}"),
        )
    })
}

/// Send each candidate once, in order, and return the first JSON success.
pub fn try_in_order(
    transport: &dyn Transport,
    context: &str,
    candidates: &[RequestDescriptor],
) -> Result<ChainOutcome, UpstreamError> {
    let mut failures = Vec::new();

    for request in candidates {
        let attempt = match transport.send(request) {
            Ok(response) => evaluate(request, response),
            Err(e) => Err(AttemptFailure {
                method: request.method,
                url: request.full_url(),
                status: None,
                body: None,
                message: e.to_string(),
            }),
        };

        match attempt {
            Ok(value) => {
                if !failures.is_empty() {
                    log::debug!(
                        "{context}: succeeded on candidate {} after {} failure(s)",
                        failures.len() + 1,
                        failures.len()
                    );
                }
                return Ok(ChainOutcome {
                    value,
                    url: request.full_url(),
                    failures,
                });
            }
            Err(failure) => {
                log::debug!(
                    "{context}: {} {} failed: {}",
                    failure.method.as_str(),
                    failure.url,
                    failure.message
                );
                failures.push(failure);
            }
        }
    }

    log::warn!("{context}: all {} candidate(s) failed", failures.len());
    Err(UpstreamError {
        context: context.to_string(),
        attempts: failures,
    })
}
