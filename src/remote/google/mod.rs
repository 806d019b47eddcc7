//! Google Cloud provider
//!
//! [`init`] registers the provider handle, one enumerator per supported
//! type and the details fetchers, all sharing the session cache through
//! their repositories.
//!
//! ```ignore
//! let cache = Arc::new(Cache::new(config.cache_capacity));
//! let mut registry = Registry::new();
//! remote::google::init(client, cache, &mut registry, Arc::new(DefaultResourceFactory))?;
//! ```

pub mod definitions;
pub mod enumerators;
pub mod iam;
pub mod provider;
pub mod repository;

pub use enumerators::{
    AssetEnumerator, ProjectIamMemberEnumerator, StorageBucketIamMemberEnumerator,
    GOOGLE_PROJECT_IAM_MEMBER, GOOGLE_STORAGE_BUCKET_IAM_MEMBER,
};
pub use iam::IamMemberReader;
pub use provider::{GoogleProvider, GOOGLE};

use crate::cache::Cache;
use crate::gcp::client::GcpClient;
use crate::remote::{GenericDetailsFetcher, Registry, RegistryError, ResourceReader};
use crate::resource::{Deserializer, JsonDeserializer, ResourceFactory, ResourceType};
use definitions::{asset_types, definitions, AssetSource};
use repository::{
    AssetRepository, GcpAssetRepository, GcpResourceManagerRepository, GcpStorageRepository,
    ResourceManagerRepository, StorageRepository,
};
use std::sync::Arc;

/// Repositories backing the Google enumerators
#[derive(Clone)]
pub struct Repositories {
    pub assets: Arc<dyn AssetRepository>,
    pub storage: Arc<dyn StorageRepository>,
    pub resource_manager: Arc<dyn ResourceManagerRepository>,
}

impl Repositories {
    /// API-backed repositories over one shared cache
    pub fn new(client: &GcpClient, cache: Arc<Cache>) -> Self {
        Self {
            assets: Arc::new(GcpAssetRepository::new(
                client.clone(),
                cache.clone(),
                asset_types(AssetSource::Search),
                asset_types(AssetSource::Assets),
            )),
            storage: Arc::new(GcpStorageRepository::new(client.clone(), cache.clone())),
            resource_manager: Arc::new(GcpResourceManagerRepository::new(
                client.clone(),
                cache,
                vec![client.project_id.clone()],
            )),
        }
    }
}

/// Register the Google provider and everything it supports
pub fn init(
    client: GcpClient,
    cache: Arc<Cache>,
    registry: &mut Registry,
    factory: Arc<dyn ResourceFactory>,
) -> Result<(), RegistryError> {
    let repositories = Repositories::new(&client, cache.clone());
    let provider = Arc::new(GoogleProvider::new(client, cache));
    registry.add_provider(GOOGLE, provider.clone())?;

    register(registry, repositories, provider, factory)
}

/// Register enumerators and details fetchers over the given repositories.
///
/// The provider must already be registered.
pub fn register(
    registry: &mut Registry,
    repositories: Repositories,
    reader: Arc<dyn ResourceReader>,
    factory: Arc<dyn ResourceFactory>,
) -> Result<(), RegistryError> {
    registry.require_provider(GOOGLE)?;

    let deserializer: Arc<dyn Deserializer> = Arc::new(JsonDeserializer::new(factory.clone()));

    for def in definitions() {
        registry.add_enumerator(AssetEnumerator::new(
            def,
            repositories.assets.clone(),
            factory.clone(),
        ))?;

        if def.details {
            let resource_type = ResourceType::new(def.resource_type.as_str());
            registry.add_details_fetcher(
                resource_type.clone(),
                GenericDetailsFetcher::new(resource_type, reader.clone(), deserializer.clone()),
            )?;
        }
    }

    registry.add_enumerator(StorageBucketIamMemberEnumerator::new(
        repositories.assets.clone(),
        repositories.storage.clone(),
        factory.clone(),
    ))?;
    registry.add_enumerator(ProjectIamMemberEnumerator::new(
        repositories.resource_manager.clone(),
        factory,
    ))?;

    let members: Arc<dyn ResourceReader> = Arc::new(IamMemberReader::new(
        repositories.storage,
        repositories.resource_manager,
    ));
    for name in [GOOGLE_STORAGE_BUCKET_IAM_MEMBER, GOOGLE_PROJECT_IAM_MEMBER] {
        let resource_type = ResourceType::new(name);
        registry.add_details_fetcher(
            resource_type.clone(),
            GenericDetailsFetcher::new(resource_type, members.clone(), deserializer.clone()),
        )?;
    }

    tracing::info!(
        "Registered {} Google resource types",
        registry.enumerators().len()
    );
    Ok(())
}
