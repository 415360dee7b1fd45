use crate::errors::AppResult;
use crate::models::settings::{AuthMethod, TenantSettings};
use crate::utils::date::to_db_ts;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

pub fn load(conn: &Connection, tenant_id: &str) -> AppResult<Option<TenantSettings>> {
    let settings = conn
        .query_row(
            "SELECT tenant_id, api_url, auth_method, api_key_header, company_id,
                    api_key, oauth_token, updated_at
             FROM integration_settings WHERE tenant_id = ?1",
            [tenant_id],
            |row| {
                let method: String = row.get(2)?;
                Ok(TenantSettings {
                    tenant_id: row.get(0)?,
                    api_url: row.get(1)?,
                    auth_method: AuthMethod::from_db_str(&method),
                    api_key_header: row.get(3)?,
                    company_id: row.get(4)?,
                    api_key: row.get(5)?,
                    oauth_token: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(settings)
}

/// Insert or replace the tenant's settings. Secrets given as `None` keep
/// whatever was stored before.
pub fn save(conn: &Connection, s: &TenantSettings) -> AppResult<()> {
    conn.execute(
        "INSERT INTO integration_settings (
            tenant_id, api_url, auth_method, api_key_header, company_id,
            api_key, oauth_token, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(tenant_id) DO UPDATE SET
            api_url        = excluded.api_url,
            auth_method    = excluded.auth_method,
            api_key_header = excluded.api_key_header,
            company_id     = excluded.company_id,
            api_key        = COALESCE(excluded.api_key, integration_settings.api_key),
            oauth_token    = COALESCE(excluded.oauth_token, integration_settings.oauth_token),
            updated_at     = excluded.updated_at",
        params![
            s.tenant_id,
            s.api_url,
            s.auth_method.to_db_str(),
            s.api_key_header,
            s.company_id,
            s.api_key,
            s.oauth_token,
            to_db_ts(Utc::now()),
        ],
    )?;
    Ok(())
}
