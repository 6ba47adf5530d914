//! HTTP router for taxmate-connect.
//!
//! Route groups:
//! - /gmail      — Gmail OAuth flow + profile/message reads
//! - /quickbooks — QuickBooks OAuth flow + company/list/expense endpoints
//! - /, /health  — liveness

pub mod gmail;
pub mod quickbooks;

use std::collections::HashMap;

use axum::extract::State;
use axum::response::{IntoResponse, Redirect};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AuthError;
use crate::oauth::ProviderClient;
use crate::{AppState, SharedState};

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/gmail", gmail::router())
        .nest("/quickbooks", quickbooks::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "TaxMate integration backend is running." }))
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "services": {
            "gmail": state.registry.get("gmail").is_some(),
            "quickbooks": state.registry.get("quickbooks").is_some(),
        },
    }))
}

// ── Shared OAuth flow handlers ───────────────────────────────────────────────

pub(crate) fn provider<'a>(
    state: &'a AppState,
    name: &str,
) -> Result<&'a ProviderClient, AuthError> {
    state
        .registry
        .get(name)
        .ok_or_else(|| AuthError::ProviderNotConfigured(name.to_string()))
}

/// GET /{provider}/connect — redirect the browser to the consent screen.
pub(crate) fn begin_connect(state: &AppState, name: &str) -> Result<Redirect, AuthError> {
    let client = provider(state, name)?;
    Ok(Redirect::temporary(&client.begin_authorization()))
}

/// GET /{provider}/callback — exchange the authorization code and persist
/// the tokens. Query parameters other than `code` (QuickBooks' `realmId`)
/// are forwarded to the exchange for merging into the stored record.
pub(crate) async fn finish_connect(
    state: &AppState,
    name: &str,
    mut params: HashMap<String, String>,
) -> Result<Json<Value>, AuthError> {
    let client = provider(state, name)?;

    let code = params
        .remove("code")
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AuthError::BadRequest("No authorization code received".into()))?;

    client.complete_authorization(&code, &params).await?;

    Ok(Json(json!({
        "message": format!("{} connected successfully!", client.display_name()),
        "tokens_saved": true,
    })))
}
