//! Expense-log spreadsheet writer.
//!
//! Authenticates with a Google service account: the key file is read per
//! append, an RS256 JWT assertion is exchanged for a bearer token, and one
//! row is appended to the spreadsheet's first sheet. Callers treat the whole
//! operation as best-effort.

use std::path::PathBuf;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::AuthError;
use crate::oauth::urlencode;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
}

#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Google Sheets client scoped to one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    api_base: String,
    token_url: String,
    spreadsheet_id: String,
    key_file: PathBuf,
}

impl SheetsClient {
    /// Present only when a spreadsheet id is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let spreadsheet_id = config.spreadsheet_id.clone()?;
        Some(Self {
            http: reqwest::Client::new(),
            api_base: config.sheets_api_base.clone(),
            token_url: config.google_token_url.clone(),
            spreadsheet_id,
            key_file: config.google_service_account_file.clone(),
        })
    }

    /// Mint a short-lived access token from the service-account key.
    async fn access_token(&self) -> Result<String, AuthError> {
        let raw = std::fs::read_to_string(&self.key_file).map_err(|e| {
            AuthError::Internal(format!(
                "failed to read service account key {}: {e}",
                self.key_file.display()
            ))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
            AuthError::Internal(format!("invalid service account key file: {e}"))
        })?;

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: key.client_email,
            scope: SHEETS_SCOPE.into(),
            aud: self.token_url.clone(),
            iat: now,
            exp: now + 3600,
        };

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AuthError::Internal(format!("invalid service account key: {e}")))?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| {
                AuthError::Internal(format!("failed to sign service account assertion: {e}"))
            })?;

        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("token endpoint request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Internal(format!(
                "service account token exchange returned {status}: {body}"
            )));
        }

        let token: AccessTokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Internal(format!("failed to parse token response: {e}")))?;
        Ok(token.access_token)
    }

    /// Rows land on the first sheet, whatever it is named.
    async fn first_sheet_title(&self, access_token: &str) -> Result<String, AuthError> {
        let url = format!(
            "{}/v4/spreadsheets/{}?fields=sheets.properties.title",
            self.api_base, self.spreadsheet_id
        );
        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("spreadsheet lookup failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Internal(format!(
                "spreadsheet lookup returned {status}: {body}"
            )));
        }

        let sheet: Value = resp
            .json()
            .await
            .map_err(|e| AuthError::Internal(format!("failed to parse spreadsheet: {e}")))?;

        sheet
            .pointer("/sheets/0/properties/title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AuthError::Internal("spreadsheet has no sheets".into()))
    }

    /// Append one expense row. Any failure is returned for the caller to
    /// log and swallow.
    pub async fn append_expense_log(
        &self,
        vendor: &str,
        amount: f64,
        category: &str,
        txn_id: &str,
    ) -> Result<(), AuthError> {
        let access_token = self.access_token().await?;
        let title = self.first_sheet_title(&access_token).await?;

        let range = format!("{title}!A1");
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=USER_ENTERED",
            self.api_base,
            self.spreadsheet_id,
            urlencode(&range),
        );

        let body = json!({ "values": [expense_log_row(vendor, amount, category, txn_id)] });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("sheet append request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Internal(format!(
                "sheet append returned {status}: {body}"
            )));
        }

        Ok(())
    }
}

/// The expense-log row layout the TaxMate spreadsheet expects.
fn expense_log_row(vendor: &str, amount: f64, category: &str, txn_id: &str) -> Vec<Value> {
    let now = chrono::Local::now();
    vec![
        json!(now.format("%Y-%m-%d %H:%M:%S").to_string()),
        json!("Expense Log"),
        json!(vendor),
        json!(now.date_naive().to_string()),
        json!(category),
        json!(amount),
        json!(""),
        json!(format!("QB TxnID: {txn_id}")),
        json!("Expense synced successfully (Success)"),
    ]
}
