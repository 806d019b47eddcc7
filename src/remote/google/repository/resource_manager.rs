//! Resource Manager repository

use super::{parse_response, Bindings, IamPolicy};
use crate::cache::{Cache, CacheKey};
use crate::gcp::client::GcpClient;
use crate::remote::paginate::cached_value;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait ResourceManagerRepository: Send + Sync {
    /// IAM bindings of every configured project, keyed by project id
    async fn list_project_bindings(&self) -> Result<BTreeMap<String, Bindings>>;
}

pub struct GcpResourceManagerRepository {
    client: GcpClient,
    cache: Arc<Cache>,
    projects: Vec<String>,
}

impl GcpResourceManagerRepository {
    pub fn new(client: GcpClient, cache: Arc<Cache>, projects: Vec<String>) -> Self {
        Self {
            client,
            cache,
            projects,
        }
    }

    async fn project_bindings(&self, project: &str) -> Result<Bindings> {
        let key = CacheKey::with_params("ListProjectsBindings", &[("project", project)]);

        cached_value(&self.cache, &key, || async {
            let url = self
                .client
                .resourcemanager_url(&format!("projects/{}:getIamPolicy", project));
            let body = json!({});
            let response = self.client.post(&url, Some(&body)).await?;
            let policy: IamPolicy = parse_response(response, "project getIamPolicy")?;
            Ok::<_, anyhow::Error>(policy.into_bindings())
        })
        .await
    }
}

#[async_trait]
impl ResourceManagerRepository for GcpResourceManagerRepository {
    async fn list_project_bindings(&self) -> Result<BTreeMap<String, Bindings>> {
        let mut all = BTreeMap::new();
        for project in &self.projects {
            let bindings = self.project_bindings(project).await?;
            all.insert(project.clone(), bindings);
        }
        Ok(all)
    }
}
