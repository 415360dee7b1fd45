use crate::core::sync::clamp_window_days;
use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::db::{settings, sync_state};
use crate::errors::{AppError, AppResult};
use crate::models::settings::{AuthMethod, DEFAULT_API_KEY_HEADER, TenantSettings};

/// Values handed over by the secrets collaborator (already decrypted).
#[derive(Debug, Clone, Default)]
pub struct SettingsInput {
    pub api_url: Option<String>,
    pub auth_method: Option<String>,
    pub api_key_header: Option<String>,
    pub company_id: Option<String>,
    pub api_key: Option<String>,
    pub oauth_token: Option<String>,
    pub window_days: Option<i64>,
}

fn trimmed(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub struct SettingsLogic;

impl SettingsLogic {
    /// Store the tenant settings. Fields left out keep their stored value;
    /// a first save needs at least the API URL.
    pub fn save(pool: &mut DbPool, tenant_id: &str, input: &SettingsInput) -> AppResult<TenantSettings> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(AppError::InvalidTenant("tenant id must not be empty".into()));
        }

        let current = settings::load(&pool.conn, tenant_id)?;

        let api_url = trimmed(&input.api_url)
            .or_else(|| current.as_ref().map(|c| c.api_url.clone()))
            .ok_or_else(|| AppError::Configuration("API URL is required".into()))?;

        let auth_method = match trimmed(&input.auth_method) {
            Some(code) => AuthMethod::from_code(&code).ok_or(AppError::InvalidAuthMethod(code))?,
            None => current.as_ref().map_or(AuthMethod::ApiKey, |c| c.auth_method),
        };

        let api_key_header = trimmed(&input.api_key_header)
            .or_else(|| current.as_ref().map(|c| c.api_key_header.clone()))
            .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string());

        let company_id =
            trimmed(&input.company_id).or_else(|| current.as_ref().and_then(|c| c.company_id.clone()));

        let new = TenantSettings {
            tenant_id: tenant_id.to_string(),
            api_url,
            auth_method,
            api_key_header,
            company_id,
            api_key: trimmed(&input.api_key),
            oauth_token: trimmed(&input.oauth_token),
            updated_at: String::new(),
        };

        settings::save(&pool.conn, &new)?;

        if let Some(days) = input.window_days {
            let days = clamp_window_days(Some(days), crate::core::sync::DEFAULT_WINDOW_DAYS);
            sync_state::save_window_days(&pool.conn, tenant_id, days)?;
        }

        ttlog(
            &pool.conn,
            "settings",
            tenant_id,
            &format!("Provider settings saved ({})", new.auth_method.to_db_str()),
        )?;

        settings::load(&pool.conn, tenant_id)?
            .ok_or_else(|| AppError::Other("settings vanished after save".into()))
    }
}
