use std::collections::HashMap;

use super::client::ProviderClient;

/// Registry of configured OAuth providers, keyed by provider name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderClient>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider client under its configured name.
    pub fn register(&mut self, client: ProviderClient) {
        self.providers.insert(client.name().to_string(), client);
    }

    /// Get a provider client by name.
    pub fn get(&self, name: &str) -> Option<&ProviderClient> {
        self.providers.get(name)
    }

    /// Number of registered providers.
    pub fn count(&self) -> usize {
        self.providers.len()
    }
}
