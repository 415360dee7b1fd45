//! Effective provider credentials for one run.
//!
//! Two tiers exist: settings stored for the tenant and a process-wide
//! fallback read from the environment. [`resolve_credentials`] is the only
//! place where the precedence between them is decided.

use crate::errors::{AppError, AppResult};
use crate::models::settings::{AuthMethod, TenantSettings};
use serde::Serialize;

pub const ENV_API_URL: &str = "TIMESYNC_API_URL";
pub const ENV_AUTH_METHOD: &str = "TIMESYNC_AUTH_METHOD";
pub const ENV_API_KEY_HEADER: &str = "TIMESYNC_API_KEY_HEADER_NAME";
pub const ENV_COMPANY_ID: &str = "TIMESYNC_COMPANY_ID";
pub const ENV_API_KEY: &str = "TIMESYNC_API_KEY";
pub const ENV_OAUTH_TOKEN: &str = "TIMESYNC_OAUTH_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    Tenant,
    Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub api_url: String,
    pub auth_method: AuthMethod,
    pub api_key_header: String,
    pub company_id: Option<String>,
    pub api_key: Option<String>,
    pub oauth_token: Option<String>,
    pub source: CredentialSource,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Credentials {
    pub fn from_settings(s: TenantSettings) -> Self {
        let header = if s.api_key_header.trim().is_empty() {
            crate::models::settings::DEFAULT_API_KEY_HEADER.to_string()
        } else {
            s.api_key_header
        };

        Self {
            api_url: s.api_url,
            auth_method: s.auth_method,
            api_key_header: header,
            company_id: non_empty(s.company_id),
            api_key: non_empty(s.api_key),
            oauth_token: non_empty(s.oauth_token),
            source: CredentialSource::Tenant,
        }
    }

    /// Header set for every upstream call: the configured API-key header, or
    /// `Authorization: Bearer ...`.
    pub fn auth_headers(&self) -> AppResult<Vec<(String, String)>> {
        match self.auth_method {
            AuthMethod::ApiKey => {
                let key = self
                    .api_key
                    .as_deref()
                    .ok_or_else(|| AppError::Configuration("API key missing".into()))?;
                Ok(vec![(self.api_key_header.clone(), key.to_string())])
            }
            AuthMethod::OAuth => {
                let token = self
                    .oauth_token
                    .as_deref()
                    .ok_or_else(|| AppError::Configuration("OAuth token missing".into()))?;
                Ok(vec![("Authorization".into(), format!("Bearer {token}"))])
            }
        }
    }

    pub fn require_company(&self) -> AppResult<&str> {
        self.company_id
            .as_deref()
            .ok_or_else(|| AppError::Configuration("company id missing".into()))
    }
}

/// Environment tier. Absent when no API URL is set. Only the secret that
/// matches the auth method is picked up.
pub fn env_credentials<F>(lookup: F, default_header: &str) -> Option<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let api_url = non_empty(lookup(ENV_API_URL))?;
    let auth_method = lookup(ENV_AUTH_METHOD)
        .map(|m| AuthMethod::from_db_str(&m))
        .unwrap_or(AuthMethod::ApiKey);
    let api_key_header =
        non_empty(lookup(ENV_API_KEY_HEADER)).unwrap_or_else(|| default_header.to_string());

    let (api_key, oauth_token) = match auth_method {
        AuthMethod::ApiKey => (non_empty(lookup(ENV_API_KEY)), None),
        AuthMethod::OAuth => (None, non_empty(lookup(ENV_OAUTH_TOKEN))),
    };

    Some(Credentials {
        api_url,
        auth_method,
        api_key_header,
        company_id: non_empty(lookup(ENV_COMPANY_ID)),
        api_key,
        oauth_token,
        source: CredentialSource::Environment,
    })
}

/// Process environment reader for [`env_credentials`].
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Stored tenant settings win entirely; there is no per-field merge.
pub fn resolve_credentials(
    stored: Option<TenantSettings>,
    env: Option<Credentials>,
) -> Option<Credentials> {
    match stored {
        Some(s) => Some(Credentials::from_settings(s)),
        None => env,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    fn stored() -> TenantSettings {
        TenantSettings {
            tenant_id: "acme".into(),
            api_url: "https://tenant.example".into(),
            auth_method: AuthMethod::OAuth,
            api_key_header: String::new(),
            company_id: None,
            api_key: None,
            oauth_token: Some("tok".into()),
            updated_at: String::new(),
        }
    }

    #[test]
    fn env_tier_requires_url() {
        assert!(env_credentials(lookup(&[(ENV_API_KEY, "k")]), "x-h").is_none());
    }

    #[test]
    fn env_tier_picks_matching_secret_only() {
        let c = env_credentials(
            lookup(&[
                (ENV_API_URL, "https://env.example"),
                (ENV_AUTH_METHOD, "OAUTH"),
                (ENV_API_KEY, "ignored"),
                (ENV_OAUTH_TOKEN, "t-1"),
                (ENV_COMPANY_ID, "C9"),
            ]),
            "x-h",
        )
        .unwrap();
        assert_eq!(c.auth_method, AuthMethod::OAuth);
        assert_eq!(c.api_key, None);
        assert_eq!(c.api_key_header, "x-h");
        assert_eq!(
            c.auth_headers().unwrap(),
            vec![("Authorization".to_string(), "Bearer t-1".to_string())]
        );
    }

    #[test]
    fn stored_settings_win_without_merge() {
        let env = env_credentials(
            lookup(&[(ENV_API_URL, "https://env.example"), (ENV_COMPANY_ID, "C9")]),
            "x-h",
        );
        let c = resolve_credentials(Some(stored()), env).unwrap();
        assert_eq!(c.source, CredentialSource::Tenant);
        assert_eq!(c.api_url, "https://tenant.example");
        assert_eq!(c.company_id, None);
        assert!(c.require_company().is_err());
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let mut s = stored();
        s.auth_method = AuthMethod::ApiKey;
        let c = Credentials::from_settings(s);
        assert!(matches!(c.auth_headers(), Err(AppError::Configuration(_))));
    }
}
