use std::env;

/// Published client id used when the configured one is missing. Lets a user
/// still reach the vendor consent screen in degraded mode; see
/// `oauth::authorization_url`.
pub const FALLBACK_ATS_CLIENT_ID: &str = "1000.RECRUIT_DEFAULT_CLIENT";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub admin_api_key: String,
    /// Base64-encoded 32-byte master key for the credential vault.
    pub vault_master_key: String,
    pub ats_client_id: Option<String>,
    pub ats_client_secret: String,
    pub ats_redirect_uri: String,
    pub ats_accounts_base: String,
    pub ats_api_base: String,
    pub ats_scopes: String,
    pub token_refresh_window_secs: i64,
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_issuer: env::var("JWT_ISSUER")
                .unwrap_or_else(|_| "integration-service".to_string()),
            admin_api_key: env::var("ADMIN_API_KEY")?,
            vault_master_key: env::var("VAULT_MASTER_KEY")?,
            ats_client_id: env::var("ATS_CLIENT_ID").ok().filter(|s| !s.is_empty()),
            ats_client_secret: env::var("ATS_CLIENT_SECRET").unwrap_or_default(),
            ats_redirect_uri: env::var("ATS_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:3000/oauth/callback".to_string()),
            ats_accounts_base: env::var("ATS_ACCOUNTS_BASE")
                .unwrap_or_else(|_| "https://accounts.zoho.com".to_string()),
            ats_api_base: env::var("ATS_API_BASE")
                .unwrap_or_else(|_| "https://recruit.zoho.com/recruit/v2".to_string()),
            ats_scopes: env::var("ATS_SCOPES").unwrap_or_else(|_| {
                "ZohoRecruit.modules.ALL,ZohoRecruit.settings.READ".to_string()
            }),
            token_refresh_window_secs: env::var("TOKEN_REFRESH_WINDOW_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap_or(600),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string()),
        })
    }
}
