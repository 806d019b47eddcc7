//! Reads of IAM member resources
//!
//! Members have no REST self link; a read re-checks the binding against the
//! cached policy of their bucket or project.

use super::enumerators::{GOOGLE_PROJECT_IAM_MEMBER, GOOGLE_STORAGE_BUCKET_IAM_MEMBER};
use super::repository::{Bindings, ResourceManagerRepository, StorageRepository};
use crate::remote::{ReadResourceArgs, ResourceReader};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub struct IamMemberReader {
    storage: Arc<dyn StorageRepository>,
    resource_manager: Arc<dyn ResourceManagerRepository>,
}

impl IamMemberReader {
    pub fn new(
        storage: Arc<dyn StorageRepository>,
        resource_manager: Arc<dyn ResourceManagerRepository>,
    ) -> Self {
        Self {
            storage,
            resource_manager,
        }
    }

    async fn project_bindings(&self, project: &str) -> Result<Bindings> {
        self.resource_manager
            .list_project_bindings()
            .await?
            .remove(project)
            .ok_or_else(|| anyhow!("project {} is not scanned", project))
    }
}

fn attribute<'a>(args: &'a ReadResourceArgs, name: &str) -> Result<&'a str> {
    args.attributes
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{} {}: no {} attribute", args.resource_type, args.id, name))
}

#[async_trait]
impl ResourceReader for IamMemberReader {
    async fn read_resource(&self, args: ReadResourceArgs) -> Result<Value> {
        let role = attribute(&args, "role")?;
        let member = attribute(&args, "member")?;

        let (scope, name, bindings) = match args.resource_type.as_str() {
            GOOGLE_STORAGE_BUCKET_IAM_MEMBER => {
                let bucket = attribute(&args, "bucket")?;
                ("bucket", bucket, self.storage.list_all_bindings(bucket).await?)
            }
            GOOGLE_PROJECT_IAM_MEMBER => {
                let project = attribute(&args, "project")?;
                ("project", project, self.project_bindings(project).await?)
            }
            other => bail!("{} is not an IAM member type", other),
        };

        let bound = bindings
            .get(role)
            .is_some_and(|members| members.iter().any(|m| m == member));
        if !bound {
            bail!("{} is no longer bound to {} on {} {}", member, role, scope, name);
        }

        let mut object = Map::new();
        object.insert("id".to_string(), json!(args.id));
        object.insert(scope.to_string(), json!(name));
        object.insert("role".to_string(), json!(role));
        object.insert("member".to_string(), json!(member));
        Ok(Value::Object(object))
    }
}
