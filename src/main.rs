use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use taxmate_connect::oauth::{self, CredentialStore, FileStore, ProviderRegistry};
use taxmate_connect::sheets::SheetsClient;
use taxmate_connect::{api, AppState, Config, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taxmate_connect=info".into()),
        )
        .init();

    // Load config
    let config = Config::from_env()?;
    info!("taxmate-connect v{}", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}:{}", config.host, config.port);

    // Initialize components
    let store: Arc<dyn CredentialStore> = Arc::new(FileStore::new(config.token_dir.clone()));

    let mut registry = ProviderRegistry::new();
    oauth::register_defaults(&mut registry, &config, &store);
    info!("Registered {} OAuth providers", registry.count());

    let sheets = SheetsClient::from_config(&config);
    match &sheets {
        Some(_) => info!("Expense log spreadsheet configured ✓"),
        None => info!("No SPREADSHEET_ID set; expense log disabled"),
    }

    // Build shared state
    let state: SharedState = Arc::new(AppState {
        config: config.clone(),
        registry,
        sheets,
    });

    // Build router
    let app = api::router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server ready ✓");
    axum::serve(listener, app).await?;

    Ok(())
}
