//! Punch-list fetch for a date window.

use super::{LIST_ENVELOPE_KEYS, RequestDescriptor, Transport, try_in_order, unwrap_list};
use crate::core::credentials::Credentials;
use crate::errors::{AppError, AppResult};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::Value;
use std::time::Duration as StdDuration;

pub const STAMPINGS_LIST_PATH: &str = "/api/v1/stampings/list";
pub const COMPANY_PLACEHOLDER: &str = "{company_id}";
pub const DEFAULT_FETCH_DAYS: i64 = 7;

/// How the configured base URL is turned into the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlShape {
    /// Bare domain or unknown path: append the standard list path + company id.
    BareDomain,
    /// Known path with a `{company_id}` placeholder.
    Placeholder,
    /// Known path ending in `/`: append the company id.
    TrailingSlash,
    /// Known path used as is.
    Verbatim,
}

pub fn classify_url(api_url: &str) -> UrlShape {
    let lower = api_url.to_lowercase();
    if !lower.contains("/api/v1") && !lower.contains("/stampings") {
        UrlShape::BareDomain
    } else if api_url.contains(COMPANY_PLACEHOLDER) {
        UrlShape::Placeholder
    } else if api_url.ends_with('/') {
        UrlShape::TrailingSlash
    } else {
        UrlShape::Verbatim
    }
}

pub fn build_stampings_url(creds: &Credentials) -> AppResult<String> {
    let api_url = creds.api_url.trim();
    if api_url.is_empty() {
        return Err(AppError::Configuration("API URL missing".into()));
    }

    let company = creds.company_id.as_deref().filter(|c| !c.is_empty());

    let url = match (classify_url(api_url), company) {
        (UrlShape::BareDomain, Some(c)) => {
            format!("{}{}/{}", api_url.trim_end_matches('/'), STAMPINGS_LIST_PATH, c)
        }
        (UrlShape::BareDomain, None) => {
            return Err(AppError::Configuration(
                "company id missing for the stampings endpoint".into(),
            ));
        }
        (UrlShape::Placeholder, Some(c)) => api_url.replace(COMPANY_PLACEHOLDER, c),
        (UrlShape::TrailingSlash, Some(c)) => format!("{api_url}{c}"),
        _ => api_url.to_string(),
    };

    Ok(url)
}

/// Candidate chain for the punch list. The primary shape uses
/// `from_date`/`to_date`; some tenants only accept `start_date`/`end_date`.
pub fn stampings_candidates(
    creds: &Credentials,
    from: NaiveDate,
    to: NaiveDate,
    timeout: StdDuration,
) -> AppResult<Vec<RequestDescriptor>> {
    let url = build_stampings_url(creds)?;
    let headers = creds.auth_headers()?;
    let from = from.format("%Y-%m-%d").to_string();
    let to = to.format("%Y-%m-%d").to_string();

    Ok(vec![
        RequestDescriptor::get(&url)
            .headers(&headers)
            .query("from_date", &from)
            .query("to_date", &to)
            .timeout(timeout),
        RequestDescriptor::get(&url)
            .headers(&headers)
            .query("start_date", &from)
            .query("end_date", &to)
            .timeout(timeout),
    ])
}

/// Fetch raw punch objects for `[from, to]`; defaults to the trailing 7 days.
pub fn fetch_stampings(
    transport: &dyn Transport,
    creds: &Credentials,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    timeout: StdDuration,
) -> AppResult<Vec<Value>> {
    let to = to.unwrap_or_else(|| Utc::now().date_naive());
    let from = from.unwrap_or(to - Duration::days(DEFAULT_FETCH_DAYS));

    let candidates = stampings_candidates(creds, from, to, timeout)?;
    let outcome = try_in_order(transport, "stampings", &candidates)?;

    match unwrap_list(outcome.value, LIST_ENVELOPE_KEYS) {
        Some(items) => {
            log::info!("fetched {} stamping(s) from {}", items.len(), outcome.url);
            Ok(items)
        }
        None => {
            log::warn!("unrecognised stampings payload from {}, treating as empty", outcome.url);
            Ok(Vec::new())
        }
    }
}
