use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::settings::{SettingsInput, SettingsLogic};
use crate::db::pool::DbPool;
use crate::db::{settings, sync_state};
use crate::errors::AppResult;
use crate::models::settings::TenantSettings;
use crate::ui::messages::{field, header, success, warning};
use crate::utils::colors::colorize_optional;
use crate::utils::formatting::{or_dash, yes_no};

fn print_settings(s: &TenantSettings, window_days: Option<i64>) {
    header(format!("Provider settings for {}", s.tenant_id));
    field("API URL", &s.api_url);
    field("Auth method", s.auth_method.to_db_str());
    field("API key header", &s.api_key_header);
    field("Company id", colorize_optional(&or_dash(s.company_id.as_deref())));
    field("Has API key", yes_no(s.api_key.is_some()));
    field("Has OAuth token", yes_no(s.oauth_token.is_some()));
    if let Some(days) = window_days {
        field("Window days", days);
    }
    field("Updated at", &s.updated_at);
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Settings {
        tenant,
        api_url,
        auth_method,
        api_key_header,
        company_id,
        api_key,
        oauth_token,
        window_days,
        show,
    } = cmd
    {
        let mut pool = DbPool::open(&cfg.database)?;

        let input = SettingsInput {
            api_url: api_url.clone(),
            auth_method: auth_method.clone(),
            api_key_header: api_key_header.clone(),
            company_id: company_id.clone(),
            api_key: api_key.clone(),
            oauth_token: oauth_token.clone(),
            window_days: *window_days,
        };

        let wants_save = input.api_url.is_some()
            || input.auth_method.is_some()
            || input.api_key_header.is_some()
            || input.company_id.is_some()
            || input.api_key.is_some()
            || input.oauth_token.is_some()
            || input.window_days.is_some();

        if wants_save {
            SettingsLogic::save(&mut pool, tenant, &input)?;
            success(format!("Settings saved for tenant '{}'.", tenant));
        }

        if *show || !wants_save {
            match settings::load(&pool.conn, tenant)? {
                Some(s) => {
                    let window = sync_state::load(&pool.conn, tenant)?.map(|st| st.window_days);
                    print_settings(&s, window);
                }
                None => warning(format!(
                    "No settings stored for tenant '{}'; environment variables will be used.",
                    tenant
                )),
            }
        }
    }

    Ok(())
}
