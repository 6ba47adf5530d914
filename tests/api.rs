//! Endpoint tests over the full router, with vendor APIs mocked.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taxmate_connect::oauth::{self, CredentialRecord, CredentialStore, MemoryStore, ProviderRegistry};
use taxmate_connect::sheets::SheetsClient;
use taxmate_connect::{api, AppState, Config};

/// Full application wired against a mock vendor server and an in-memory
/// credential store. The sheets logger points at a key file that does not
/// exist, so every append attempt fails (and must be swallowed).
fn test_app(server: &MockServer) -> (Router, Arc<MemoryStore>) {
    let config = Config {
        google_client_id: Some("gmail-client".into()),
        google_client_secret: Some("gmail-secret".into()),
        google_redirect_uri: Some("http://localhost:8000/gmail/callback".into()),
        google_auth_url: format!("{}/o/oauth2/v2/auth", server.uri()),
        google_token_url: format!("{}/google-token", server.uri()),
        gmail_api_base: server.uri(),

        qb_client_id: Some("qb-client".into()),
        qb_client_secret: Some("qb-secret".into()),
        qb_redirect_uri: Some("http://localhost:8000/quickbooks/callback".into()),
        qb_auth_url: format!("{}/connect/oauth2", server.uri()),
        qb_token_url: format!("{}/qb-token", server.uri()),
        qb_api_base: server.uri(),

        spreadsheet_id: Some("sheet-1".into()),
        google_service_account_file: PathBuf::from("/nonexistent/google-credentials.json"),
        sheets_api_base: server.uri(),

        ..Config::default()
    };

    let store = Arc::new(MemoryStore::default());
    let dyn_store: Arc<dyn CredentialStore> = store.clone();

    let mut registry = ProviderRegistry::new();
    oauth::register_defaults(&mut registry, &config, &dyn_store);

    let sheets = SheetsClient::from_config(&config);
    let state = Arc::new(AppState {
        config,
        registry,
        sheets,
    });

    (api::router(state), store)
}

fn quickbooks_record() -> CredentialRecord {
    CredentialRecord {
        access_token: "qb-access".into(),
        refresh_token: Some("qb-refresh".into()),
        token_type: Some("bearer".into()),
        scope: None,
        realm_id: Some("999".into()),
    }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ── Liveness ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn root_and_health_respond() {
    let server = MockServer::start().await;
    let (app, _) = test_app(&server);

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "TaxMate integration backend is running.");

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["services"]["gmail"], true);
    assert_eq!(body["services"]["quickbooks"], true);
}

// ── Connect / callback ───────────────────────────────────────────────────────

#[tokio::test]
async fn connect_redirects_to_the_consent_screen() {
    let server = MockServer::start().await;
    let (app, _) = test_app(&server);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/gmail/connect")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(resp.status().is_redirection());
    let location = resp.headers()["location"].to_str().unwrap();
    assert!(location.contains("/o/oauth2/v2/auth?"));
    assert!(location.contains("client_id=gmail-client"));
    assert!(location.contains("access_type=offline"));
}

#[tokio::test]
async fn quickbooks_callback_persists_tokens_and_realm_id() {
    let server = MockServer::start().await;
    let (app, store) = test_app(&server);

    Mock::given(method("POST"))
        .and(path("/qb-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "qb-access",
            "refresh_token": "qb-refresh",
            "token_type": "bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app, "/quickbooks/callback?code=abc123&realmId=999").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "QuickBooks connected successfully!");
    assert_eq!(body["tokens_saved"], true);

    let record = store.load("quickbooks").unwrap().unwrap();
    assert_eq!(record.access_token, "qb-access");
    assert_eq!(record.refresh_token.as_deref(), Some("qb-refresh"));
    assert_eq!(record.realm_id.as_deref(), Some("999"));
}

#[tokio::test]
async fn callback_without_a_code_is_rejected() {
    let server = MockServer::start().await;
    let (app, _) = test_app(&server);

    let (status, body) = get(&app, "/quickbooks/callback?realmId=999").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No authorization code received");
}

// ── Unconnected providers ────────────────────────────────────────────────────

#[tokio::test]
async fn quickbooks_reads_without_a_connection_are_404() {
    let server = MockServer::start().await;
    let (app, _) = test_app(&server);

    let (status, body) = get(&app, "/quickbooks/customers").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "No QuickBooks token found." }));
}

#[tokio::test]
async fn gmail_profile_without_a_connection_is_404() {
    let server = MockServer::start().await;
    let (app, _) = test_app(&server);

    let (status, body) = get(&app, "/gmail/profile").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "No Gmail token found." }));
}

#[tokio::test]
async fn quickbooks_status_is_200_even_when_unconnected() {
    let server = MockServer::start().await;
    let (app, _) = test_app(&server);

    let (status, body) = get(&app, "/quickbooks/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], false);
    assert_eq!(body["error"], "No QuickBooks token found.");
}

#[tokio::test]
async fn quickbooks_status_reports_disconnected_on_upstream_failure() {
    let server = MockServer::start().await;
    let (app, store) = test_app(&server);
    store.save("quickbooks", &quickbooks_record()).unwrap();

    Mock::given(method("GET"))
        .and(path("/v3/company/999/companyinfo/999"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app, "/quickbooks/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "connected": false, "status": "Disconnected" }));
}

// ── Entity listings ──────────────────────────────────────────────────────────

#[tokio::test]
async fn customers_come_back_wrapped_in_a_list() {
    let server = MockServer::start().await;
    let (app, store) = test_app(&server);
    store.save("quickbooks", &quickbooks_record()).unwrap();

    Mock::given(method("POST"))
        .and(path("/v3/company/999/query"))
        .and(header("content-type", "application/text"))
        .and(body_string("SELECT * FROM Customer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "QueryResponse": {
                "Customer": [{ "Id": "1", "DisplayName": "Jane Doe" }],
                "maxResults": 1,
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app, "/quickbooks/customers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "customers": [{ "Id": "1", "DisplayName": "Jane Doe" }] })
    );
}

#[tokio::test]
async fn empty_query_responses_become_empty_lists() {
    let server = MockServer::start().await;
    let (app, store) = test_app(&server);
    store.save("quickbooks", &quickbooks_record()).unwrap();

    Mock::given(method("POST"))
        .and(path("/v3/company/999/query"))
        .and(body_string("SELECT * FROM Invoice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "QueryResponse": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app, "/quickbooks/invoices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "invoices": [] }));
}

// ── Expense creation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn expense_creation_succeeds_even_when_the_sheet_append_fails() {
    let server = MockServer::start().await;
    let (app, store) = test_app(&server);
    store.save("quickbooks", &quickbooks_record()).unwrap();

    Mock::given(method("POST"))
        .and(path("/v3/company/999/purchase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Purchase": { "Id": "77", "TotalAmt": 12.5 },
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The sheets client is configured with a missing key file, so the append
    // fails; the expense response must be unaffected.
    let (status, body) = post_json(
        &app,
        "/quickbooks/expenses",
        json!({ "Vendor": "Staples", "Amount": 12.5, "Category": "Office" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Expense added successfully");
    assert_eq!(body["txn_id"], "77");
}

#[tokio::test]
async fn expense_amounts_may_be_numeric_strings() {
    let server = MockServer::start().await;
    let (app, store) = test_app(&server);
    store.save("quickbooks", &quickbooks_record()).unwrap();

    Mock::given(method("POST"))
        .and(path("/v3/company/999/purchase"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Purchase": { "Id": "78" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = post_json(
        &app,
        "/quickbooks/expenses",
        json!({ "Vendor": "Uber", "Amount": "42.10", "Category": "Travel" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["txn_id"], "78");
}

#[tokio::test]
async fn expense_with_a_bad_amount_is_rejected() {
    let server = MockServer::start().await;
    let (app, store) = test_app(&server);
    store.save("quickbooks", &quickbooks_record()).unwrap();

    let (status, body) = post_json(
        &app,
        "/quickbooks/expenses",
        json!({ "Vendor": "Uber", "Amount": "a lot", "Category": "Travel" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Amount must be a number");
}

// ── Gmail reads ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn gmail_profile_passes_the_upstream_payload_through() {
    let server = MockServer::start().await;
    let (app, store) = test_app(&server);
    store
        .save(
            "gmail",
            &CredentialRecord {
                access_token: "g-access".into(),
                refresh_token: Some("g-refresh".into()),
                token_type: None,
                scope: None,
                realm_id: None,
            },
        )
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/profile"))
        .and(header("authorization", "Bearer g-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "emailAddress": "jane@example.com",
            "messagesTotal": 5,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app, "/gmail/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emailAddress"], "jane@example.com");
}

#[tokio::test]
async fn latest_message_returns_the_newest_snippet() {
    let server = MockServer::start().await;
    let (app, store) = test_app(&server);
    store
        .save(
            "gmail",
            &CredentialRecord {
                access_token: "g-access".into(),
                refresh_token: None,
                token_type: None,
                scope: None,
                realm_id: None,
            },
        )
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .and(query_param("maxResults", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{ "id": "m1" }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages/m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "m1",
            "snippet": "Your receipt from Staples",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app, "/gmail/messages/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latest_email_snippet"], "Your receipt from Staples");
}

#[tokio::test]
async fn latest_message_is_null_for_an_empty_mailbox() {
    let server = MockServer::start().await;
    let (app, store) = test_app(&server);
    store
        .save(
            "gmail",
            &CredentialRecord {
                access_token: "g-access".into(),
                refresh_token: None,
                token_type: None,
                scope: None,
                realm_id: None,
            },
        )
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultSizeEstimate": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(&app, "/gmail/messages/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "latest_email_snippet": null }));
}
