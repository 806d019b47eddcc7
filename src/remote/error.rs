//! Remote errors

use crate::resource::ResourceType;
use thiserror::Error;

/// Registration mistakes, fatal before any enumeration starts
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("an enumerator is already registered for {0}")]
    DuplicateEnumerator(ResourceType),
    #[error("a details fetcher is already registered for {0}")]
    DuplicateDetailsFetcher(ResourceType),
    #[error("provider {0} is already registered")]
    DuplicateProvider(String),
    #[error("provider {0} is not registered")]
    MissingProvider(String),
}

/// Failure of one enumeration or one hydration
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("failed to list {resource_type}")]
    List {
        resource_type: ResourceType,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to read details of {resource_type} {id}")]
    Details {
        resource_type: ResourceType,
        id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl EnumerationError {
    pub fn list(resource_type: &ResourceType, source: impl Into<anyhow::Error>) -> Self {
        Self::List {
            resource_type: resource_type.clone(),
            source: source.into(),
        }
    }

    pub fn details(
        resource_type: &ResourceType,
        id: &str,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Details {
            resource_type: resource_type.clone(),
            id: id.to_string(),
            source: source.into(),
        }
    }

    pub fn resource_type(&self) -> &ResourceType {
        match self {
            Self::List { resource_type, .. } | Self::Details { resource_type, .. } => resource_type,
        }
    }
}
