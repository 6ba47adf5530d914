//! OAuth2 token lifecycle: authorization-code grant, file-backed credential
//! storage, reactive refresh and bearer-token API calls.

mod client;
mod provider;
mod registry;
mod store;

pub use client::{ApiBody, ProviderClient};
pub use provider::{ProviderConfig, TokenEndpointAuth};
pub use registry::ProviderRegistry;
pub use store::{CredentialRecord, CredentialStore, FileStore, MemoryStore};

pub(crate) use provider::urlencode;

use std::sync::Arc;

use crate::config::Config;

/// Register every provider whose credentials are configured.
pub fn register_defaults(
    registry: &mut ProviderRegistry,
    config: &Config,
    store: &Arc<dyn CredentialStore>,
) {
    if let Some(gmail) = ProviderConfig::gmail(config) {
        registry.register(ProviderClient::new(gmail, store.clone()));
    }

    if let Some(quickbooks) = ProviderConfig::quickbooks(config) {
        registry.register(ProviderClient::new(quickbooks, store.clone()));
    }
}
