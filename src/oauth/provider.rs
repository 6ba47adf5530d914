//! Provider configuration table.
//!
//! One `ProviderConfig` entry per external service describes everything the
//! token lifecycle needs: endpoints, app credentials, scopes and the token
//! endpoint's authentication quirk.

use crate::config::Config;

/// How a provider expects the app's client credentials on token-endpoint
/// calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEndpointAuth {
    /// `client_id:client_secret` as an HTTP basic-auth header (QuickBooks).
    BasicHeader,
    /// `client_id`/`client_secret` as form body fields (Google).
    BodyParams,
}

/// Static description of one OAuth provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Registry key and token-file prefix, e.g. "gmail".
    pub name: String,
    /// Human-readable name used in messages, e.g. "QuickBooks".
    pub display_name: String,
    pub auth_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub token_auth: TokenEndpointAuth,
    /// Extra query parameters appended to the consent URL.
    pub auth_params: Vec<(String, String)>,
}

impl ProviderConfig {
    /// Gmail via Google OAuth. `access_type=offline` + `prompt=consent` so
    /// Google issues a refresh token on every grant.
    pub fn gmail(config: &Config) -> Option<Self> {
        let (client_id, client_secret, redirect_uri) = match (
            &config.google_client_id,
            &config.google_client_secret,
            &config.google_redirect_uri,
        ) {
            (Some(id), Some(secret), Some(redirect)) => (id, secret, redirect),
            _ => return None,
        };

        Some(ProviderConfig {
            name: "gmail".into(),
            display_name: "Gmail".into(),
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            redirect_uri: redirect_uri.clone(),
            scopes: vec!["https://www.googleapis.com/auth/gmail.readonly".into()],
            token_auth: TokenEndpointAuth::BodyParams,
            auth_params: vec![
                ("access_type".into(), "offline".into()),
                ("prompt".into(), "consent".into()),
            ],
        })
    }

    /// QuickBooks Online. Intuit's token endpoint requires basic auth.
    pub fn quickbooks(config: &Config) -> Option<Self> {
        let (client_id, client_secret, redirect_uri) = match (
            &config.qb_client_id,
            &config.qb_client_secret,
            &config.qb_redirect_uri,
        ) {
            (Some(id), Some(secret), Some(redirect)) => (id, secret, redirect),
            _ => return None,
        };

        Some(ProviderConfig {
            name: "quickbooks".into(),
            display_name: "QuickBooks".into(),
            auth_url: config.qb_auth_url.clone(),
            token_url: config.qb_token_url.clone(),
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            redirect_uri: redirect_uri.clone(),
            scopes: vec!["com.intuit.quickbooks.accounting".into()],
            token_auth: TokenEndpointAuth::BasicHeader,
            auth_params: vec![],
        })
    }
}

/// Simple percent-encoding for URL parameters.
pub(crate) fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
