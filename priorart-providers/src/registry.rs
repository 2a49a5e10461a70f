//! Priority-ordered provider registry
//!
//! Providers register with an explicit priority; routing iterates
//! healthy providers in (priority, provider_id) order, so failover is
//! deterministic for identical health states. Built by the composition
//! root and injected - there is no global registry.

use crate::Capability;
use priorart_core::ProviderError;
use std::sync::Arc;

/// Registry over one provider capability (search, LLM, ...).
pub struct ProviderRegistry<P: Capability + ?Sized> {
    capability: &'static str,
    entries: Vec<(u32, Arc<P>)>,
}

impl<P: Capability + ?Sized> ProviderRegistry<P> {
    /// `capability` names the slot for error messages, e.g. "search".
    pub fn new(capability: &'static str) -> Self {
        Self { capability, entries: Vec::new() }
    }

    /// Register a provider. Lower priority values are preferred.
    pub fn register(&mut self, priority: u32, provider: Arc<P>) {
        self.entries.push((priority, provider));
        self.entries.sort_by(|(pa, a), (pb, b)| {
            pa.cmp(pb).then_with(|| a.provider_id().cmp(b.provider_id()))
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Route to the highest-priority healthy provider.
    pub fn route(&self) -> Result<Arc<P>, ProviderError> {
        self.entries
            .iter()
            .find(|(_, p)| p.is_healthy())
            .map(|(_, p)| Arc::clone(p))
            .ok_or_else(|| ProviderError::NoHealthyProvider {
                capability: self.capability.to_string(),
            })
    }

    /// All providers in routing order, healthy or not.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<P>> {
        self.entries.iter().map(|(_, p)| p)
    }
}

impl<P: Capability + ?Sized> std::fmt::Debug for ProviderRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.entries.iter().map(|(_, p)| p.provider_id()).collect();
        f.debug_struct("ProviderRegistry")
            .field("capability", &self.capability)
            .field("providers", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeProvider {
        id: String,
        healthy: AtomicBool,
    }

    impl FakeProvider {
        fn new(id: &str, healthy: bool) -> Arc<Self> {
            Arc::new(Self { id: id.to_string(), healthy: AtomicBool::new(healthy) })
        }
    }

    impl Capability for FakeProvider {
        fn provider_id(&self) -> &str {
            &self.id
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn routes_to_highest_priority_healthy() {
        let mut registry: ProviderRegistry<FakeProvider> = ProviderRegistry::new("search");
        let primary = FakeProvider::new("primary", false);
        let fallback = FakeProvider::new("fallback", true);
        registry.register(0, primary);
        registry.register(1, fallback);

        let routed = registry.route().expect("no provider");
        assert_eq!(routed.provider_id(), "fallback");
    }

    #[test]
    fn ties_break_on_provider_id() {
        let mut registry: ProviderRegistry<FakeProvider> = ProviderRegistry::new("search");
        registry.register(0, FakeProvider::new("beta", true));
        registry.register(0, FakeProvider::new("alpha", true));

        assert_eq!(registry.route().expect("no provider").provider_id(), "alpha");
    }

    #[test]
    fn empty_or_unhealthy_registry_is_an_error() {
        let mut registry: ProviderRegistry<FakeProvider> = ProviderRegistry::new("search");
        assert!(registry.route().is_err());

        registry.register(0, FakeProvider::new("down", false));
        assert!(matches!(
            registry.route(),
            Err(ProviderError::NoHealthyProvider { capability }) if capability == "search"
        ));
    }
}
