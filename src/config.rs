use std::path::PathBuf;

use anyhow::{Context, Result};

const QB_SANDBOX_API_BASE: &str = "https://sandbox-quickbooks.api.intuit.com";
const QB_PRODUCTION_API_BASE: &str = "https://quickbooks.api.intuit.com";

/// Application configuration, loaded from environment variables.
///
/// Provider credentials are optional: a provider is only registered when its
/// client id, secret and redirect URI are all present. Endpoint base URLs
/// default to the real vendor endpoints and can be overridden for sandbox or
/// test deployments.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    /// Directory holding the per-provider token files.
    pub token_dir: PathBuf,

    // ── Google / Gmail ──────────────────────────────────────────────────
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_uri: Option<String>,
    pub google_auth_url: String,
    pub google_token_url: String,
    pub gmail_api_base: String,

    // ── QuickBooks ──────────────────────────────────────────────────────
    pub qb_client_id: Option<String>,
    pub qb_client_secret: Option<String>,
    pub qb_redirect_uri: Option<String>,
    /// "sandbox" or "production"; selects the company API base.
    pub qb_environment: String,
    pub qb_auth_url: String,
    pub qb_token_url: String,
    pub qb_api_base: String,

    // ── Google Sheets expense log ───────────────────────────────────────
    pub spreadsheet_id: Option<String>,
    pub google_service_account_file: PathBuf,
    pub sheets_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".into(),
            port: 8000,
            token_dir: PathBuf::from("."),

            google_client_id: None,
            google_client_secret: None,
            google_redirect_uri: None,
            google_auth_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            google_token_url: "https://oauth2.googleapis.com/token".into(),
            gmail_api_base: "https://www.googleapis.com".into(),

            qb_client_id: None,
            qb_client_secret: None,
            qb_redirect_uri: None,
            qb_environment: "sandbox".into(),
            qb_auth_url: "https://appcenter.intuit.com/connect/oauth2".into(),
            qb_token_url: "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer".into(),
            qb_api_base: QB_SANDBOX_API_BASE.into(),

            spreadsheet_id: None,
            google_service_account_file: PathBuf::from("google-credentials.json"),
            sheets_api_base: "https://sheets.googleapis.com".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let qb_environment =
            std::env::var("QB_ENVIRONMENT").unwrap_or_else(|_| defaults.qb_environment.clone());

        Ok(Config {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .context("Invalid PORT")?,
            token_dir: std::env::var("TOKEN_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_dir),

            google_client_id: std::env::var("GOOGLE_CLIENT_ID").ok(),
            google_client_secret: std::env::var("GOOGLE_CLIENT_SECRET").ok(),
            google_redirect_uri: std::env::var("GOOGLE_REDIRECT_URI").ok(),
            google_auth_url: std::env::var("GOOGLE_AUTH_URL").unwrap_or(defaults.google_auth_url),
            google_token_url: std::env::var("GOOGLE_TOKEN_URL")
                .unwrap_or(defaults.google_token_url),
            gmail_api_base: std::env::var("GMAIL_API_BASE").unwrap_or(defaults.gmail_api_base),

            qb_client_id: std::env::var("QB_CLIENT_ID").ok(),
            qb_client_secret: std::env::var("QB_CLIENT_SECRET").ok(),
            qb_redirect_uri: std::env::var("QB_REDIRECT_URI").ok(),
            qb_auth_url: std::env::var("QB_AUTH_URL").unwrap_or(defaults.qb_auth_url),
            qb_token_url: std::env::var("QB_TOKEN_URL").unwrap_or(defaults.qb_token_url),
            qb_api_base: std::env::var("QB_API_BASE")
                .unwrap_or_else(|_| Self::qb_api_base_for(&qb_environment).into()),
            qb_environment,

            spreadsheet_id: std::env::var("SPREADSHEET_ID").ok(),
            google_service_account_file: std::env::var("GOOGLE_SERVICE_ACCOUNT_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.google_service_account_file),
            sheets_api_base: std::env::var("SHEETS_API_BASE").unwrap_or(defaults.sheets_api_base),
        })
    }

    fn qb_api_base_for(environment: &str) -> &'static str {
        if environment.eq_ignore_ascii_case("production") {
            QB_PRODUCTION_API_BASE
        } else {
            QB_SANDBOX_API_BASE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_is_the_default_company_api_base() {
        assert_eq!(Config::qb_api_base_for("sandbox"), QB_SANDBOX_API_BASE);
        assert_eq!(Config::qb_api_base_for("anything-else"), QB_SANDBOX_API_BASE);
    }

    #[test]
    fn production_environment_selects_the_production_base() {
        assert_eq!(Config::qb_api_base_for("production"), QB_PRODUCTION_API_BASE);
        assert_eq!(Config::qb_api_base_for("PRODUCTION"), QB_PRODUCTION_API_BASE);
    }
}
