//! Everything that talks to the upstream time-clock provider.

pub mod lookups;
pub mod request;
pub mod stampings;
pub mod transport;

pub use request::{AttemptFailure, ChainOutcome, Method, RequestDescriptor, UpstreamError, try_in_order};
pub use transport::{HttpResponse, Transport, TransportError, UreqTransport};

use serde_json::Value;

/// Envelope keys for list endpoints, in lookup order.
pub const LIST_ENVELOPE_KEYS: &[&str] = &["items", "data"];

/// Extract the inner array from a bare array or an `{<key>: [...]}` envelope.
/// Returns `None` when no known shape matches.
pub fn unwrap_list(value: Value, keys: &[&str]) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => keys.iter().find_map(|k| match map.remove(*k) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

/// Base URL for the lookup endpoints: everything before `/api/v1` or
/// `/stampings`, without trailing slash.
pub fn base_from_api_url(api_url: &str) -> String {
    let cut = api_url
        .find("/api/v1")
        .or_else(|| api_url.find("/stampings"))
        .unwrap_or(api_url.len());
    api_url[..cut].trim_end_matches('/').to_string()
}
