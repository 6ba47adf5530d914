use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for the taxmate-connect service.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // ── Token lifecycle ─────────────────────────────────────────────────
    /// No credential record on disk — the user must run the connect flow.
    #[error("No {0} token found.")]
    NotConnected(String),

    /// The authorization-code exchange was rejected by the provider.
    #[error("{provider} authorization failed: {detail}")]
    Authorization { provider: String, detail: String },

    /// The refresh token was rejected. Terminal: the user must re-authorize.
    #[error("{provider} token refresh failed: {detail}")]
    Refresh { provider: String, detail: String },

    /// Non-2xx from the vendor API after the one allowed retry.
    #[error("upstream API returned HTTP {status}")]
    Upstream {
        status: u16,
        details: serde_json::Value,
    },

    // ── Request / infrastructure ────────────────────────────────────────
    #[error("provider {0} is not configured")]
    ProviderNotConfigured(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("credential store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::NotConnected(_) | AuthError::ProviderNotConfigured(_) => {
                StatusCode::NOT_FOUND
            }
            AuthError::BadRequest(_) | AuthError::Upstream { .. } => StatusCode::BAD_REQUEST,
            AuthError::Refresh { .. } => StatusCode::BAD_GATEWAY,
            AuthError::Authorization { .. } | AuthError::Store(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!("{self}");
        }

        let body = match &self {
            AuthError::Upstream { details, .. } => json!({
                "error": self.to_string(),
                "details": details,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, axum::Json(body)).into_response()
    }
}
