/// Centralized environment configuration.
/// All env vars and defaults are defined here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL. Required. Must point at the dedicated
    /// non-superuser application role — RLS does not apply to superusers.
    pub database_url: String,

    /// Address to bind the HTTP listener on.
    /// Default: 0.0.0.0:3000
    pub bind_addr: String,

    /// Gemini API key for report generation. Report endpoints return an
    /// internal error when unset.
    pub gemini_api_key: Option<String>,

    /// Gemini model used for report generation.
    /// Default: gemini-1.5-flash
    pub gemini_model: String,

    /// Default organization id used by the seed binary.
    pub default_organization_id: Option<String>,

    /// Default admin email used by the seed binary.
    pub default_admin_email: Option<String>,
}

impl Config {
    /// Build config from environment variables.
    /// Returns an error if required vars are missing.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set in .env")?;

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        let gemini_model = std::env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| "gemini-1.5-flash".to_string());

        let default_organization_id = std::env::var("DEFAULT_ORGANIZATION_ID").ok();
        let default_admin_email = std::env::var("DEFAULT_ADMIN_EMAIL").ok();

        Ok(Self {
            database_url,
            bind_addr,
            gemini_api_key,
            gemini_model,
            default_organization_id,
            default_admin_email,
        })
    }

    /// Config for tests. No report key, throwaway defaults.
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            bind_addr: "127.0.0.1:0".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            default_organization_id: None,
            default_admin_email: None,
        }
    }
}
