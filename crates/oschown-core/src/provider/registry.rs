//! Provider registry keyed by provider name.
//!
//! The registry is built once at startup and handed to every resource
//! collection and workflow; nothing reads providers from global state.

use super::ResourceProvider;

/// Registry of available resource providers.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn ResourceProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register a provider, replacing any provider already registered under
    /// the same name.
    pub fn register(&mut self, provider: Box<dyn ResourceProvider>) {
        let name = provider.name();
        self.providers.retain(|p| p.name() != name);
        self.providers.push(provider);
    }

    /// Builder-style variant of [`ProviderRegistry::register`].
    pub fn with(mut self, provider: Box<dyn ResourceProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Get all registered providers.
    pub fn all(&self) -> &[Box<dyn ResourceProvider>] {
        &self.providers
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> Option<&dyn ResourceProvider> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// List all provider names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}
