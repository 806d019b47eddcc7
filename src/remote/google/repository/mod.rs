//! Google repositories
//!
//! One repository per API family, each holding the session [`Cache`] and an
//! immutable [`GcpClient`]. Every operation goes through
//! [`cached_pages`](crate::remote::paginate::cached_pages) or
//! [`cached_value`](crate::remote::paginate::cached_value); API errors are
//! returned unchanged.
//!
//! [`Cache`]: crate::cache::Cache
//! [`GcpClient`]: crate::gcp::client::GcpClient

mod asset;
mod resource_manager;
mod storage;

pub use asset::{Asset, AssetRepository, AssetResource, GcpAssetRepository, ResourceSearchResult};
pub use resource_manager::{GcpResourceManagerRepository, ResourceManagerRepository};
pub use storage::{GcpStorageRepository, StorageRepository};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// IAM bindings: role to members
pub type Bindings = BTreeMap<String, Vec<String>>;

/// Parse an API response, treating an empty body as an empty response
fn parse_response<T: DeserializeOwned + Default>(value: Value, what: &str) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).with_context(|| format!("Unexpected {} response", what))
}

#[derive(Debug, Default, Deserialize)]
struct IamPolicy {
    #[serde(default)]
    bindings: Vec<IamBinding>,
}

#[derive(Debug, Deserialize)]
struct IamBinding {
    role: String,
    #[serde(default)]
    members: Vec<String>,
}

impl IamPolicy {
    fn into_bindings(self) -> Bindings {
        let mut bindings = Bindings::new();
        for binding in self.bindings {
            bindings
                .entry(binding.role)
                .or_default()
                .extend(binding.members);
        }
        bindings
    }
}
