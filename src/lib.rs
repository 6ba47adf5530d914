pub mod api;
pub mod config;
pub mod error;
pub mod oauth;
pub mod sheets;

pub use config::Config;
pub use error::AuthError;

use std::sync::Arc;

use oauth::ProviderRegistry;
use sheets::SheetsClient;

/// Shared application state passed to all API handlers.
pub struct AppState {
    pub config: Config,
    pub registry: ProviderRegistry,
    pub sheets: Option<SheetsClient>,
}

pub type SharedState = Arc<AppState>;
