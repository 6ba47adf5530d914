//! QuickBooks route group: OAuth connect/callback, company info, entity
//! listings via the query API, and expense (purchase) creation with an
//! optional spreadsheet log.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::oauth::{ApiBody, ProviderClient};
use crate::{AppState, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/connect", get(connect))
        .route("/callback", get(callback))
        .route("/status", get(status))
        .route("/profile", get(company_info))
        .route("/companyinfo", get(company_info))
        .route("/customers", get(customers))
        .route("/invoices", get(invoices))
        .route("/accounts", get(accounts))
        .route("/expenses", post(create_expense))
}

async fn connect(State(state): State<SharedState>) -> Result<Redirect, AuthError> {
    super::begin_connect(&state, "quickbooks")
}

async fn callback(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AuthError> {
    super::finish_connect(&state, "quickbooks", params).await
}

/// The realm (company) id every QuickBooks API path is scoped by.
fn realm_id(client: &ProviderClient) -> Result<String, AuthError> {
    client.load_credentials()?.realm_id.ok_or_else(|| {
        AuthError::Internal("stored QuickBooks credentials are missing a realm id".into())
    })
}

async fn fetch_company_info(state: &AppState) -> Result<Value, AuthError> {
    let client = super::provider(state, "quickbooks")?;
    let realm = realm_id(client)?;
    let url = format!(
        "{}/v3/company/{realm}/companyinfo/{realm}",
        state.config.qb_api_base
    );
    client.authorized_request(Method::GET, &url, None).await
}

/// GET /quickbooks/status — connection probe, always 200.
async fn status(State(state): State<SharedState>) -> impl IntoResponse {
    match fetch_company_info(&state).await {
        Ok(_) => Json(json!({ "connected": true, "status": "Connected" })),
        Err(AuthError::Upstream { .. }) => {
            Json(json!({ "connected": false, "status": "Disconnected" }))
        }
        Err(e) => Json(json!({ "connected": false, "error": e.to_string() })),
    }
}

/// GET /quickbooks/profile and /quickbooks/companyinfo — company info JSON
/// passed through as-is.
async fn company_info(State(state): State<SharedState>) -> Result<Json<Value>, AuthError> {
    Ok(Json(fetch_company_info(&state).await?))
}

/// Run a QuickBooks SQL query. Intuit's query endpoint takes the statement
/// as a raw `application/text` body.
async fn query(state: &AppState, sql: &str) -> Result<Value, AuthError> {
    let client = super::provider(state, "quickbooks")?;
    let realm = realm_id(client)?;
    let url = format!("{}/v3/company/{realm}/query", state.config.qb_api_base);
    client
        .authorized_request(Method::POST, &url, Some(ApiBody::Text(sql.to_string())))
        .await
}

/// Pull one entity list out of a query response, defaulting to empty.
fn entity_list(data: &Value, entity: &str) -> Value {
    data.pointer(&format!("/QueryResponse/{entity}"))
        .cloned()
        .unwrap_or_else(|| json!([]))
}

async fn customers(State(state): State<SharedState>) -> Result<Json<Value>, AuthError> {
    let data = query(&state, "SELECT * FROM Customer").await?;
    Ok(Json(json!({ "customers": entity_list(&data, "Customer") })))
}

async fn invoices(State(state): State<SharedState>) -> Result<Json<Value>, AuthError> {
    let data = query(&state, "SELECT * FROM Invoice").await?;
    Ok(Json(json!({ "invoices": entity_list(&data, "Invoice") })))
}

async fn accounts(State(state): State<SharedState>) -> Result<Json<Value>, AuthError> {
    let data = query(&state, "SELECT * FROM Account").await?;
    Ok(Json(json!({ "accounts": entity_list(&data, "Account") })))
}

#[derive(Debug, Deserialize)]
struct ExpenseRequest {
    #[serde(rename = "Vendor")]
    vendor: String,
    #[serde(rename = "Amount")]
    amount: Value,
    #[serde(rename = "Category")]
    category: String,
}

/// Amounts arrive as JSON numbers or numeric strings; accept both.
fn parse_amount(value: &Value) -> Result<f64, AuthError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| AuthError::BadRequest("Amount must be a number".into()))
}

/// POST /quickbooks/expenses — create a purchase transaction and append a
/// row to the expense log spreadsheet. The sheet append must never fail the
/// expense itself, so its errors are logged and swallowed.
async fn create_expense(
    State(state): State<SharedState>,
    Json(body): Json<ExpenseRequest>,
) -> Result<Json<Value>, AuthError> {
    let client = super::provider(&state, "quickbooks")?;
    let amount = parse_amount(&body.amount)?;
    let realm = realm_id(client)?;

    let url = format!("{}/v3/company/{realm}/purchase", state.config.qb_api_base);
    let payload = json!({
        "TxnDate": chrono::Local::now().date_naive().to_string(),
        "PrivateNote": body.category,
        "TotalAmt": amount,
        "EntityRef": { "type": "Vendor", "name": body.vendor },
    });

    let created = client
        .authorized_request(Method::POST, &url, Some(ApiBody::Json(payload)))
        .await?;

    let txn_id = created
        .pointer("/Purchase/Id")
        .and_then(Value::as_str)
        .unwrap_or("N/A")
        .to_string();

    match &state.sheets {
        Some(sheets) => {
            if let Err(e) = sheets
                .append_expense_log(&body.vendor, amount, &body.category, &txn_id)
                .await
            {
                warn!("Google Sheet append failed: {e}");
            }
        }
        None => debug!("expense log spreadsheet not configured, skipping append"),
    }

    Ok(Json(json!({
        "status": "Expense added successfully",
        "txn_id": txn_id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_amount(&json!(12.5)).unwrap(), 12.5);
        assert_eq!(parse_amount(&json!("42.10")).unwrap(), 42.10);
        assert_eq!(parse_amount(&json!(" 7 ")).unwrap(), 7.0);
        assert!(parse_amount(&json!("twelve")).is_err());
        assert!(parse_amount(&json!(null)).is_err());
    }

    #[test]
    fn entity_list_defaults_to_empty() {
        let data = json!({ "QueryResponse": {} });
        assert_eq!(entity_list(&data, "Customer"), json!([]));

        let data = json!({ "QueryResponse": { "Customer": [{ "Id": "1" }] } });
        assert_eq!(entity_list(&data, "Customer"), json!([{ "Id": "1" }]));
    }
}
