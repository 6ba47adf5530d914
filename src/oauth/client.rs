//! Token lifecycle for one provider: authorization-code exchange, storage,
//! reactive refresh and bearer-token API calls.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::provider::{urlencode, ProviderConfig, TokenEndpointAuth};
use super::store::{CredentialRecord, CredentialStore};
use crate::error::AuthError;

/// Request body for an authorized vendor API call.
#[derive(Debug, Clone)]
pub enum ApiBody {
    Json(Value),
    /// Raw text sent as `application/text` — QuickBooks' query endpoint
    /// takes its SQL this way.
    Text(String),
}

// Raw token response from a provider's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    token_type: Option<String>,
    scope: Option<String>,
}

/// One provider's OAuth client: owns the provider configuration, an HTTP
/// client and the injected credential store.
pub struct ProviderClient {
    config: ProviderConfig,
    http: reqwest::Client,
    store: Arc<dyn CredentialStore>,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn display_name(&self) -> &str {
        &self.config.display_name
    }

    /// Build the consent-screen URL the user's browser should be sent to.
    /// No side effects; the caller performs the redirect.
    pub fn begin_authorization(&self) -> String {
        let scope = self.config.scopes.join(" ");
        let mut url = format!(
            "{auth_url}?client_id={client_id}&redirect_uri={redirect_uri}&response_type=code&scope={scope}",
            auth_url = self.config.auth_url,
            client_id = urlencode(&self.config.client_id),
            redirect_uri = urlencode(&self.config.redirect_uri),
            scope = urlencode(&scope),
        );
        for (key, value) in &self.config.auth_params {
            url.push_str(&format!("&{key}={}", urlencode(value)));
        }
        url
    }

    /// Exchange an authorization code for tokens and persist the result.
    ///
    /// `extra` carries out-of-band callback parameters; QuickBooks' `realmId`
    /// is merged into the stored record.
    pub async fn complete_authorization(
        &self,
        code: &str,
        extra: &HashMap<String, String>,
    ) -> Result<CredentialRecord, AuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let tokens = self
            .token_request(&form)
            .await
            .map_err(|detail| AuthError::Authorization {
                provider: self.config.display_name.clone(),
                detail,
            })?;

        let record = CredentialRecord {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            scope: tokens.scope,
            realm_id: extra.get("realmId").cloned(),
        };

        self.store.save(&self.config.name, &record)?;
        info!("{} connected, tokens saved", self.config.display_name);
        Ok(record)
    }

    /// Read the persisted record, failing when the user never connected.
    pub fn load_credentials(&self) -> Result<CredentialRecord, AuthError> {
        self.store
            .load(&self.config.name)?
            .ok_or_else(|| AuthError::NotConnected(self.config.display_name.clone()))
    }

    /// Trade the stored refresh token for a new access token and overwrite
    /// the record. A rejected refresh token is terminal: the error is
    /// returned and the previously persisted record is left untouched.
    pub async fn refresh(&self) -> Result<CredentialRecord, AuthError> {
        let current = self.load_credentials()?;
        let refresh_token =
            current
                .refresh_token
                .as_deref()
                .ok_or_else(|| AuthError::Refresh {
                    provider: self.config.display_name.clone(),
                    detail: "no refresh token stored".into(),
                })?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let tokens = self
            .token_request(&form)
            .await
            .map_err(|detail| AuthError::Refresh {
                provider: self.config.display_name.clone(),
                detail,
            })?;

        // Providers may omit fields on refresh (Google often skips the
        // refresh token); carry the previous values forward. The realm id
        // never comes back from the token endpoint at all.
        let record = CredentialRecord {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.or(current.refresh_token),
            token_type: tokens.token_type.or(current.token_type),
            scope: tokens.scope.or(current.scope),
            realm_id: current.realm_id,
        };

        self.store.save(&self.config.name, &record)?;
        info!("{} token refreshed", self.config.display_name);
        Ok(record)
    }

    /// Issue a bearer-authenticated API call.
    ///
    /// On a 401, performs exactly one refresh and retries exactly once with
    /// the new token; any remaining non-2xx surfaces as `Upstream`. One
    /// retry, no more: enough to ride out an expired access token without
    /// risking a loop against a revoked grant.
    pub async fn authorized_request(
        &self,
        method: Method,
        url: &str,
        body: Option<ApiBody>,
    ) -> Result<Value, AuthError> {
        let creds = self.load_credentials()?;
        let resp = self
            .send_authorized(method.clone(), url, &body, &creds.access_token)
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            debug!("{} returned 401, refreshing token", url);
            let creds = self.refresh().await?;
            let resp = self
                .send_authorized(method, url, &body, &creds.access_token)
                .await?;
            return Self::read_json(resp).await;
        }

        Self::read_json(resp).await
    }

    async fn send_authorized(
        &self,
        method: Method,
        url: &str,
        body: &Option<ApiBody>,
        access_token: &str,
    ) -> Result<reqwest::Response, AuthError> {
        let mut req = self
            .http
            .request(method, url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json");

        match body {
            Some(ApiBody::Json(value)) => req = req.json(value),
            Some(ApiBody::Text(text)) => {
                req = req
                    .header(CONTENT_TYPE, "application/text")
                    .body(text.clone());
            }
            None => {}
        }

        req.send()
            .await
            .map_err(|e| AuthError::Internal(format!("request to {url} failed: {e}")))
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value, AuthError> {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AuthError::Internal(format!("failed to read response body: {e}")))?;
        let details = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if status.is_success() {
            Ok(details)
        } else {
            Err(AuthError::Upstream {
                status: status.as_u16(),
                details,
            })
        }
    }

    /// Form-encoded POST to the token endpoint, with the provider's client
    /// credentials attached per its `TokenEndpointAuth` style. Returns the
    /// parsed token response or a human-readable failure detail.
    async fn token_request(&self, grant: &[(&str, &str)]) -> Result<TokenResponse, String> {
        let mut form: Vec<(&str, &str)> = grant.to_vec();
        let mut req = self.http.post(&self.config.token_url);
        match self.config.token_auth {
            TokenEndpointAuth::BasicHeader => {
                req = req.basic_auth(&self.config.client_id, Some(&self.config.client_secret));
            }
            TokenEndpointAuth::BodyParams => {
                form.push(("client_id", self.config.client_id.as_str()));
                form.push(("client_secret", self.config.client_secret.as_str()));
            }
        }

        let resp = req
            .form(&form)
            .send()
            .await
            .map_err(|e| format!("token endpoint request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("token endpoint returned {status}: {body}"));
        }

        resp.json()
            .await
            .map_err(|e| format!("failed to parse token response: {e}"))
    }
}
