//! Details fetching
//!
//! A [`DetailsFetcher`] hydrates one stub at a time. The generic
//! implementation reads the resource through the provider's
//! [`ResourceReader`] and deserializes the raw value.

use super::error::EnumerationError;
use crate::resource::{Deserializer, Resource, ResourceType};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Hydrates a stub into a fully detailed resource
#[async_trait]
pub trait DetailsFetcher: Send + Sync {
    async fn read_details(&self, resource: &Resource) -> Result<Resource, EnumerationError>;
}

/// Arguments of a single resource read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResourceArgs {
    pub resource_type: ResourceType,
    pub id: String,
    pub attributes: BTreeMap<String, String>,
}

/// Provider capability: read one resource in full
#[async_trait]
pub trait ResourceReader: Send + Sync {
    async fn read_resource(&self, args: ReadResourceArgs) -> anyhow::Result<Value>;
}

/// Details fetcher for types whose full read needs nothing type-specific
pub struct GenericDetailsFetcher {
    resource_type: ResourceType,
    reader: Arc<dyn ResourceReader>,
    deserializer: Arc<dyn Deserializer>,
}

impl GenericDetailsFetcher {
    pub fn new(
        resource_type: ResourceType,
        reader: Arc<dyn ResourceReader>,
        deserializer: Arc<dyn Deserializer>,
    ) -> Self {
        Self {
            resource_type,
            reader,
            deserializer,
        }
    }
}

#[async_trait]
impl DetailsFetcher for GenericDetailsFetcher {
    async fn read_details(&self, resource: &Resource) -> Result<Resource, EnumerationError> {
        // String attributes of the stub locate the resource for the reader
        let attributes = resource
            .attributes()
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();

        let raw = self
            .reader
            .read_resource(ReadResourceArgs {
                resource_type: self.resource_type.clone(),
                id: resource.id().to_string(),
                attributes,
            })
            .await
            .map_err(|e| EnumerationError::details(&self.resource_type, resource.id(), e))?;

        self.deserializer
            .deserialize_one(&self.resource_type, raw)
            .map_err(|e| EnumerationError::details(&self.resource_type, resource.id(), e))
    }
}
