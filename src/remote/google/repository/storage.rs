//! Cloud Storage repository

use super::{parse_response, Bindings, IamPolicy};
use crate::cache::{Cache, CacheKey};
use crate::gcp::client::GcpClient;
use crate::remote::paginate::cached_value;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait StorageRepository: Send + Sync {
    /// IAM bindings of one bucket
    async fn list_all_bindings(&self, bucket: &str) -> Result<Bindings>;
}

pub struct GcpStorageRepository {
    client: GcpClient,
    cache: Arc<Cache>,
}

impl GcpStorageRepository {
    pub fn new(client: GcpClient, cache: Arc<Cache>) -> Self {
        Self { client, cache }
    }
}

#[async_trait]
impl StorageRepository for GcpStorageRepository {
    async fn list_all_bindings(&self, bucket: &str) -> Result<Bindings> {
        let key = CacheKey::with_params("ListAllBindings", &[("bucket", bucket)]);

        cached_value(&self.cache, &key, || async {
            let url = format!("{}/iam", self.client.storage_bucket_url(bucket));
            let response = self.client.get(&url).await?;
            let policy: IamPolicy = parse_response(response, "bucket getIamPolicy")?;
            Ok::<_, anyhow::Error>(policy.into_bindings())
        })
        .await
    }
}
