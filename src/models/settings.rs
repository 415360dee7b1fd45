use serde::Serialize;

pub const DEFAULT_API_KEY_HEADER: &str = "x-fluida-app-uuid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    ApiKey,
    OAuth,
}

impl AuthMethod {
    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AuthMethod::ApiKey => "apikey",
            AuthMethod::OAuth => "oauth",
        }
    }

    /// Lenient parse: anything other than `oauth` means API key.
    pub fn from_db_str(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("oauth") {
            AuthMethod::OAuth
        } else {
            AuthMethod::ApiKey
        }
    }

    /// Strict parse for user input.
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "apikey" | "api-key" | "api_key" => Some(AuthMethod::ApiKey),
            "oauth" | "bearer" => Some(AuthMethod::OAuth),
            _ => None,
        }
    }
}

/// Tenant-level provider settings, already decrypted by the secrets layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantSettings {
    pub tenant_id: String,
    pub api_url: String,
    pub auth_method: AuthMethod,
    pub api_key_header: String,
    pub company_id: Option<String>,
    pub api_key: Option<String>,
    pub oauth_token: Option<String>,
    pub updated_at: String,
}
