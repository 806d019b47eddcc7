//! Google provider handle and resource reader

use super::enumerators::resource_path;
use crate::cache::{Cache, CacheKey};
use crate::gcp::client::GcpClient;
use crate::remote::paginate::cached_value;
use crate::remote::{ProviderHandle, ReadResourceArgs, ResourceReader};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub const GOOGLE: &str = "google";

pub struct GoogleProvider {
    client: GcpClient,
    cache: Arc<Cache>,
    version: String,
}

impl GoogleProvider {
    pub fn new(client: GcpClient, cache: Arc<Cache>) -> Self {
        Self {
            client,
            cache,
            version: crate::VERSION.to_string(),
        }
    }

    /// REST self link of a resource from its full asset name
    fn resource_url(&self, args: &ReadResourceArgs) -> Result<String> {
        let asset_name = args.attributes.get("asset_name").ok_or_else(|| {
            anyhow!(
                "{} {}: no asset_name attribute to read from",
                args.resource_type,
                args.id
            )
        })?;

        if asset_name.starts_with("//compute.googleapis.com/") {
            return Ok(self.client.compute_url(resource_path(asset_name)));
        }
        if asset_name.starts_with("//storage.googleapis.com/") {
            return Ok(self.client.storage_bucket_url(resource_path(asset_name)));
        }
        Err(anyhow!(
            "{}: no read endpoint for {}",
            args.resource_type,
            asset_name
        ))
    }
}

impl ProviderHandle for GoogleProvider {
    fn name(&self) -> &str {
        GOOGLE
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Give the read the stub's identity, keeping the API's own id aside
fn with_identity(mut raw: Value, id: &str) -> Value {
    if let Value::Object(object) = &mut raw {
        match object.remove("id") {
            Some(Value::String(api_id)) if api_id == id => {}
            Some(api_id) => {
                object.insert("generated_id".to_string(), api_id);
            }
            None => {}
        }
        object.insert("id".to_string(), json!(id));
    }
    raw
}

#[async_trait]
impl ResourceReader for GoogleProvider {
    async fn read_resource(&self, args: ReadResourceArgs) -> Result<Value> {
        let key = CacheKey::with_params(
            "ReadResource",
            &[("type", args.resource_type.as_str()), ("id", args.id.as_str())],
        );

        let raw = cached_value(&self.cache, &key, || async {
            let url = self.resource_url(&args)?;
            tracing::debug!("Reading {} {} from {}", args.resource_type, args.id, url);
            self.client.get(&url).await
        })
        .await?;

        Ok(with_identity(raw, &args.id))
    }
}
