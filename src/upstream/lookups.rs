//! Optional enrichment lookups: calendar summary, location directory and the
//! per-contract planned location. Each one is a candidate chain over the
//! endpoint shapes seen across provider deployments.

use super::{RequestDescriptor, Transport, base_from_api_url, try_in_order};
use crate::core::credentials::Credentials;
use crate::errors::AppResult;
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::time::Duration;

/// Calendar endpoint paths relative to the base URL; `{c}` is the company id.
const CALENDAR_PATHS: &[&str] = &[
    "/api/v1/calendar/company/{c}",
    "/api/v1/companies/{c}/calendar",
    "/api/v1/plannings/company/{c}",
    "/api/v1/plannings/{c}",
    "/api/v1/calendar/summary_by_day/{c}",
    "/api/v1/calendar/actual_calendar_with_summary/{c}",
    "/api/v1/calendar/summary/{c}",
    "/api/v1/contracts/{c}/calendar",
    "/api/v1/calendar/events/{c}",
    "/api/v1/schedules/{c}",
    "/api/v1/shifts/{c}",
    "/api/v1/plans/{c}",
];

/// Location directory paths; entries without `{c}` list every location.
const DIRECTORY_PATHS: &[&str] = &[
    "/api/v1/subsidiaries/company/{c}",
    "/api/v1/subsidiaries/{c}",
    "/api/v1/companies/{c}/subsidiaries",
    "/subsidiaries/{c}",
    "/api/v1/subsidiaries",
    "/subsidiaries",
];

pub const DIRECTORY_PAGE_SIZE: &str = "200";

fn expand(base: &str, path: &str, company: &str) -> String {
    format!("{}{}", base, path.replace("{c}", company))
}

/// Per calendar URL: `GET ?date=`, `GET ?start_date=&end_date=`, then `POST`.
pub fn calendar_candidates(
    creds: &Credentials,
    day: NaiveDate,
    timeout: Duration,
) -> AppResult<Vec<RequestDescriptor>> {
    let company = creds.require_company()?;
    let headers = creds.auth_headers()?;
    let base = base_from_api_url(&creds.api_url);
    let day = day.format("%Y-%m-%d").to_string();

    let mut out = Vec::with_capacity(CALENDAR_PATHS.len() * 3);
    for path in CALENDAR_PATHS {
        let url = expand(&base, path, company);
        out.push(
            RequestDescriptor::get(&url)
                .headers(&headers)
                .query("date", &day)
                .timeout(timeout),
        );
        out.push(
            RequestDescriptor::get(&url)
                .headers(&headers)
                .query("start_date", &day)
                .query("end_date", &day)
                .timeout(timeout),
        );
        out.push(
            RequestDescriptor::post(&url, json!({ "start_date": day, "end_date": day }))
                .headers(&headers)
                .timeout(timeout),
        );
    }
    Ok(out)
}

pub fn fetch_calendar(
    transport: &dyn Transport,
    creds: &Credentials,
    day: NaiveDate,
    timeout: Duration,
) -> AppResult<Value> {
    let candidates = calendar_candidates(creds, day, timeout)?;
    let outcome = try_in_order(transport, "calendar", &candidates)?;
    Ok(outcome.value)
}

pub fn directory_candidates(
    creds: &Credentials,
    timeout: Duration,
) -> AppResult<Vec<RequestDescriptor>> {
    let company = creds.require_company()?;
    let headers = creds.auth_headers()?;
    let base = base_from_api_url(&creds.api_url);

    Ok(DIRECTORY_PATHS
        .iter()
        .map(|path| {
            RequestDescriptor::get(expand(&base, path, company))
                .headers(&headers)
                .query("page_size", DIRECTORY_PAGE_SIZE)
                .timeout(timeout)
        })
        .collect())
}

/// Raw directory payload; the caller unwraps the list envelope.
pub fn fetch_location_directory(
    transport: &dyn Transport,
    creds: &Credentials,
    timeout: Duration,
) -> AppResult<Value> {
    let candidates = directory_candidates(creds, timeout)?;
    let outcome = try_in_order(transport, "location directory", &candidates)?;
    Ok(outcome.value)
}

/// Current path first, then the legacy `/api/v1`-prefixed variant.
pub fn planned_location_candidates(
    creds: &Credentials,
    subject_id: &str,
    day: NaiveDate,
    time: &str,
    direction: &str,
    timeout: Duration,
) -> AppResult<Vec<RequestDescriptor>> {
    let headers = creds.auth_headers()?;
    let base = base_from_api_url(&creds.api_url);
    let path = format!(
        "/contracts/{}/planned_subsidiary/date/{}/time/{}/direction/{}",
        subject_id,
        day.format("%Y-%m-%d"),
        time,
        direction
    );

    Ok(vec![
        RequestDescriptor::get(format!("{base}{path}"))
            .headers(&headers)
            .timeout(timeout),
        RequestDescriptor::get(format!("{base}/api/v1{path}"))
            .headers(&headers)
            .timeout(timeout),
    ])
}

pub fn fetch_planned_location(
    transport: &dyn Transport,
    creds: &Credentials,
    subject_id: &str,
    day: NaiveDate,
    time: &str,
    direction: &str,
    timeout: Duration,
) -> AppResult<Value> {
    let candidates =
        planned_location_candidates(creds, subject_id, day, time, direction, timeout)?;
    let outcome = try_in_order(transport, "planned location", &candidates)?;
    Ok(outcome.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::CredentialSource;
    use crate::models::settings::AuthMethod;

    fn creds() -> Credentials {
        Credentials {
            api_url: "https://h.io/api/v1/stampings/list/{company_id}".into(),
            auth_method: AuthMethod::OAuth,
            api_key_header: "x-app-key".into(),
            company_id: Some("C1".into()),
            api_key: None,
            oauth_token: Some("tok".into()),
            source: CredentialSource::Environment,
        }
    }

    #[test]
    fn calendar_tries_three_shapes_per_url() {
        let day = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let list = calendar_candidates(&creds(), day, Duration::from_secs(20)).unwrap();

        assert_eq!(list.len(), CALENDAR_PATHS.len() * 3);
        assert_eq!(
            list[0].full_url(),
            "https://h.io/api/v1/calendar/company/C1?date=2025-05-02"
        );
        assert_eq!(
            list[1].full_url(),
            "https://h.io/api/v1/calendar/company/C1?start_date=2025-05-02&end_date=2025-05-02"
        );
        assert_eq!(list[2].method, crate::upstream::Method::Post);
        assert!(list[0]
            .headers
            .contains(&("Authorization".to_string(), "Bearer tok".to_string())));
    }

    #[test]
    fn planned_location_has_legacy_variant() {
        let day = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let list = planned_location_candidates(
            &creds(),
            "K7",
            day,
            "08:58:00",
            "IN",
            Duration::from_secs(15),
        )
        .unwrap();

        assert_eq!(
            list[0].url,
            "https://h.io/contracts/K7/planned_subsidiary/date/2025-05-02/time/08:58:00/direction/IN"
        );
        assert_eq!(
            list[1].url,
            "https://h.io/api/v1/contracts/K7/planned_subsidiary/date/2025-05-02/time/08:58:00/direction/IN"
        );
    }

    #[test]
    fn directory_asks_for_large_pages() {
        let list = directory_candidates(&creds(), Duration::from_secs(15)).unwrap();
        assert_eq!(list.len(), DIRECTORY_PATHS.len());
        assert!(list.iter().all(|r| r.full_url().ends_with("?page_size=200")));
        assert_eq!(list[4].url, "https://h.io/api/v1/subsidiaries");
    }
}
