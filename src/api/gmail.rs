//! Gmail route group: OAuth connect/callback plus simple mailbox reads.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Method;
use serde_json::{json, Value};

use crate::error::AuthError;
use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/connect", get(connect))
        .route("/callback", get(callback))
        .route("/profile", get(profile))
        .route("/messages/latest", get(latest_message))
}

async fn connect(State(state): State<SharedState>) -> Result<Redirect, AuthError> {
    super::begin_connect(&state, "gmail")
}

async fn callback(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AuthError> {
    super::finish_connect(&state, "gmail", params).await
}

/// GET /gmail/profile — the connected account's Gmail profile, passed
/// through as-is.
async fn profile(State(state): State<SharedState>) -> Result<Json<Value>, AuthError> {
    let client = super::provider(&state, "gmail")?;
    let url = format!(
        "{}/gmail/v1/users/me/profile",
        state.config.gmail_api_base
    );
    let profile = client.authorized_request(Method::GET, &url, None).await?;
    Ok(Json(profile))
}

/// GET /gmail/messages/latest — snippet of the newest message in the
/// mailbox, null when the mailbox is empty.
async fn latest_message(State(state): State<SharedState>) -> Result<Json<Value>, AuthError> {
    let client = super::provider(&state, "gmail")?;
    let base = &state.config.gmail_api_base;

    let list = client
        .authorized_request(
            Method::GET,
            &format!("{base}/gmail/v1/users/me/messages?maxResults=1"),
            None,
        )
        .await?;

    let Some(id) = list.pointer("/messages/0/id").and_then(Value::as_str) else {
        return Ok(Json(json!({ "latest_email_snippet": Value::Null })));
    };

    let message = client
        .authorized_request(
            Method::GET,
            &format!("{base}/gmail/v1/users/me/messages/{id}?format=full"),
            None,
        )
        .await?;

    let snippet = message.get("snippet").cloned().unwrap_or(Value::Null);
    Ok(Json(json!({ "latest_email_snippet": snippet })))
}
