//! Registry - composition root of a scan session
//!
//! Built once at startup, filled by each provider's `init`, then only read
//! by the scan engine.

use super::details::DetailsFetcher;
use super::enumerator::Enumerator;
use super::error::RegistryError;
use crate::resource::ResourceType;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered provider
pub trait ProviderHandle: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;
}

/// Providers, enumerators and details fetchers of one session
#[derive(Default)]
pub struct Registry {
    providers: Vec<(String, Arc<dyn ProviderHandle>)>,
    enumerators: Vec<Arc<dyn Enumerator>>,
    enumerator_index: HashMap<ResourceType, usize>,
    details_fetchers: HashMap<ResourceType, Arc<dyn DetailsFetcher>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(
        &mut self,
        name: &str,
        handle: Arc<dyn ProviderHandle>,
    ) -> Result<(), RegistryError> {
        if self.provider(name).is_some() {
            return Err(RegistryError::DuplicateProvider(name.to_string()));
        }
        tracing::debug!("Registered provider {} ({})", name, handle.version());
        self.providers.push((name.to_string(), handle));
        Ok(())
    }

    /// Register an enumerator under the type it declares
    pub fn add_enumerator<E: Enumerator + 'static>(
        &mut self,
        enumerator: E,
    ) -> Result<(), RegistryError> {
        self.add_shared_enumerator(Arc::new(enumerator))
    }

    pub fn add_shared_enumerator(
        &mut self,
        enumerator: Arc<dyn Enumerator>,
    ) -> Result<(), RegistryError> {
        let resource_type = enumerator.supported_type();
        if self.enumerator_index.contains_key(&resource_type) {
            return Err(RegistryError::DuplicateEnumerator(resource_type));
        }
        self.enumerator_index
            .insert(resource_type, self.enumerators.len());
        self.enumerators.push(enumerator);
        Ok(())
    }

    pub fn add_details_fetcher<F: DetailsFetcher + 'static>(
        &mut self,
        resource_type: ResourceType,
        fetcher: F,
    ) -> Result<(), RegistryError> {
        if self.details_fetchers.contains_key(&resource_type) {
            return Err(RegistryError::DuplicateDetailsFetcher(resource_type));
        }
        self.details_fetchers
            .insert(resource_type, Arc::new(fetcher));
        Ok(())
    }

    pub fn enumerator_for(&self, resource_type: &ResourceType) -> Option<Arc<dyn Enumerator>> {
        self.enumerator_index
            .get(resource_type)
            .map(|&i| self.enumerators[i].clone())
    }

    pub fn details_fetcher_for(
        &self,
        resource_type: &ResourceType,
    ) -> Option<Arc<dyn DetailsFetcher>> {
        self.details_fetchers.get(resource_type).cloned()
    }

    pub fn provider(&self, name: &str) -> Option<Arc<dyn ProviderHandle>> {
        self.providers
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, handle)| handle.clone())
    }

    /// Like [`Registry::provider`], for callers that cannot go on without it
    pub fn require_provider(&self, name: &str) -> Result<Arc<dyn ProviderHandle>, RegistryError> {
        self.provider(name)
            .ok_or_else(|| RegistryError::MissingProvider(name.to_string()))
    }

    /// Providers in registration order
    pub fn providers(&self) -> impl Iterator<Item = (&str, &Arc<dyn ProviderHandle>)> {
        self.providers
            .iter()
            .map(|(name, handle)| (name.as_str(), handle))
    }

    /// Enumerators in registration order
    pub fn enumerators(&self) -> &[Arc<dyn Enumerator>] {
        &self.enumerators
    }

    pub fn resource_types(&self) -> Vec<ResourceType> {
        self.enumerators
            .iter()
            .map(|e| e.supported_type())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::error::EnumerationError;
    use crate::resource::{Resource, ResourceType};
    use async_trait::async_trait;

    struct StaticEnumerator(&'static str);

    #[async_trait]
    impl Enumerator for StaticEnumerator {
        fn supported_type(&self) -> ResourceType {
            self.0.into()
        }

        async fn enumerate(&self) -> Result<Vec<Resource>, EnumerationError> {
            Ok(Vec::new())
        }
    }

    struct NoDetails;

    #[async_trait]
    impl DetailsFetcher for NoDetails {
        async fn read_details(&self, resource: &Resource) -> Result<Resource, EnumerationError> {
            Ok(resource.clone())
        }
    }

    struct Provider;

    impl ProviderHandle for Provider {
        fn name(&self) -> &str {
            "google"
        }

        fn version(&self) -> &str {
            "test"
        }
    }

    #[test]
    fn test_enumerators_keep_registration_order() {
        let mut registry = Registry::new();
        registry
            .add_enumerator(StaticEnumerator("google_storage_bucket"))
            .unwrap();
        registry
            .add_enumerator(StaticEnumerator("google_compute_firewall"))
            .unwrap();

        let types: Vec<String> = registry
            .resource_types()
            .into_iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(types, vec!["google_storage_bucket", "google_compute_firewall"]);
        assert!(registry
            .enumerator_for(&"google_compute_firewall".into())
            .is_some());
        assert!(registry
            .enumerator_for(&"google_compute_router".into())
            .is_none());
    }

    #[test]
    fn test_duplicate_enumerator_is_rejected() {
        let mut registry = Registry::new();
        registry
            .add_enumerator(StaticEnumerator("google_storage_bucket"))
            .unwrap();

        let err = registry
            .add_enumerator(StaticEnumerator("google_storage_bucket"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateEnumerator(t) if t.as_str() == "google_storage_bucket"));
        assert_eq!(registry.enumerators().len(), 1);
    }

    #[test]
    fn test_duplicate_details_fetcher_is_rejected() {
        let mut registry = Registry::new();
        registry
            .add_details_fetcher("google_compute_network".into(), NoDetails)
            .unwrap();

        let err = registry
            .add_details_fetcher("google_compute_network".into(), NoDetails)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDetailsFetcher(_)));
    }

    #[test]
    fn test_providers_are_unique_and_required() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.require_provider("google"),
            Err(RegistryError::MissingProvider(_))
        ));

        registry.add_provider("google", Arc::new(Provider)).unwrap();
        assert!(matches!(
            registry.add_provider("google", Arc::new(Provider)),
            Err(RegistryError::DuplicateProvider(_))
        ));

        let names: Vec<&str> = registry.providers().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["google"]);
        assert_eq!(registry.require_provider("google").unwrap().version(), "test");
    }
}
