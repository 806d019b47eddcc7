//! Google enumerators
//!
//! Every enumerator reads through a repository and builds stubs with the
//! shared [`ResourceFactory`]; none of them talks to the API directly.

use super::definitions::{AssetSource, IdFormat, ResourceDef};
use super::repository::{
    Asset, AssetRepository, Bindings, ResourceManagerRepository, ResourceSearchResult,
    StorageRepository,
};
use crate::remote::{EnumerationError, Enumerator};
use crate::resource::{Attributes, Resource, ResourceFactory, ResourceType};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{json, Value};
use std::sync::Arc;

pub const GOOGLE_STORAGE_BUCKET_IAM_MEMBER: &str = "google_storage_bucket_iam_member";
pub const GOOGLE_PROJECT_IAM_MEMBER: &str = "google_project_iam_member";

const BUCKET_ASSET_TYPE: &str = "storage.googleapis.com/Bucket";

/// Strip the `//service.googleapis.com/` prefix of a full asset name
pub fn resource_path(asset_name: &str) -> &str {
    asset_name
        .strip_prefix("//")
        .and_then(|rest| rest.split_once('/'))
        .map(|(_, path)| path)
        .unwrap_or(asset_name)
}

fn last_segment(asset_name: &str) -> &str {
    asset_name.rsplit('/').next().unwrap_or(asset_name)
}

/// Enumerates one asset-backed type from its definition
pub struct AssetEnumerator {
    def: &'static ResourceDef,
    resource_type: ResourceType,
    repository: Arc<dyn AssetRepository>,
    factory: Arc<dyn ResourceFactory>,
}

impl AssetEnumerator {
    pub fn new(
        def: &'static ResourceDef,
        repository: Arc<dyn AssetRepository>,
        factory: Arc<dyn ResourceFactory>,
    ) -> Self {
        Self {
            def,
            resource_type: ResourceType::new(def.resource_type.as_str()),
            repository,
            factory,
        }
    }

    fn copy_attributes(&self, from: &serde_json::Map<String, Value>, into: &mut Attributes) {
        for name in &self.def.attributes {
            if let Some(value) = from.get(name) {
                into.insert(name.clone(), value.clone());
            }
        }
    }

    fn from_search_result(&self, result: ResourceSearchResult) -> Resource {
        let id = match self.def.id {
            IdFormat::DisplayName if !result.display_name.is_empty() => {
                result.display_name.clone()
            }
            IdFormat::DisplayName => last_segment(&result.name).to_string(),
            IdFormat::ResourcePath => resource_path(&result.name).to_string(),
        };

        let mut attributes = Attributes::new();
        attributes.insert("asset_name".to_string(), json!(result.name));
        attributes.insert("name".to_string(), json!(result.display_name));
        attributes.insert("project".to_string(), json!(result.project));
        attributes.insert("location".to_string(), json!(result.location));
        if !result.labels.is_empty() {
            attributes.insert("labels".to_string(), json!(result.labels));
        }
        self.copy_attributes(&result.additional_attributes, &mut attributes);

        self.factory.create(&self.resource_type, &id, attributes)
    }

    fn from_asset(&self, asset: Asset) -> Resource {
        let data = asset.resource.as_ref().map(|r| &r.data);
        let id = match self.def.id {
            IdFormat::DisplayName => data
                .and_then(|d| d.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_else(|| last_segment(&asset.name))
                .to_string(),
            IdFormat::ResourcePath => resource_path(&asset.name).to_string(),
        };

        let mut attributes = Attributes::new();
        attributes.insert("asset_name".to_string(), json!(asset.name));
        attributes.insert("name".to_string(), json!(last_segment(&asset.name)));
        if let Some(resource) = &asset.resource {
            attributes.insert("location".to_string(), json!(resource.location));
            self.copy_attributes(&resource.data, &mut attributes);
        }

        self.factory.create(&self.resource_type, &id, attributes)
    }
}

#[async_trait]
impl Enumerator for AssetEnumerator {
    fn supported_type(&self) -> ResourceType {
        self.resource_type.clone()
    }

    async fn enumerate(&self) -> Result<Vec<Resource>, EnumerationError> {
        let resources = match self.def.source {
            AssetSource::Search => self
                .repository
                .search_all_resources(&self.def.asset_type)
                .await
                .map_err(|e| EnumerationError::list(&self.resource_type, e))?
                .into_iter()
                .map(|r| self.from_search_result(r))
                .collect(),
            AssetSource::Assets => self
                .repository
                .list_all_assets(&self.def.asset_type)
                .await
                .map_err(|e| EnumerationError::list(&self.resource_type, e))?
                .into_iter()
                .map(|a| self.from_asset(a))
                .collect(),
        };
        Ok(resources)
    }
}

fn member_attributes(scope: (&str, &str), role: &str, member: &str) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(scope.0.to_string(), json!(scope.1));
    attributes.insert("role".to_string(), json!(role));
    attributes.insert("member".to_string(), json!(member));
    attributes
}

/// One stub per (bucket, role, member)
pub struct StorageBucketIamMemberEnumerator {
    resource_type: ResourceType,
    assets: Arc<dyn AssetRepository>,
    storage: Arc<dyn StorageRepository>,
    factory: Arc<dyn ResourceFactory>,
}

impl StorageBucketIamMemberEnumerator {
    pub fn new(
        assets: Arc<dyn AssetRepository>,
        storage: Arc<dyn StorageRepository>,
        factory: Arc<dyn ResourceFactory>,
    ) -> Self {
        Self {
            resource_type: ResourceType::new(GOOGLE_STORAGE_BUCKET_IAM_MEMBER),
            assets,
            storage,
            factory,
        }
    }

    async fn bucket_bindings(&self, bucket: String) -> anyhow::Result<(String, Bindings)> {
        let bindings = self.storage.list_all_bindings(&bucket).await?;
        Ok((bucket, bindings))
    }
}

#[async_trait]
impl Enumerator for StorageBucketIamMemberEnumerator {
    fn supported_type(&self) -> ResourceType {
        self.resource_type.clone()
    }

    async fn enumerate(&self) -> Result<Vec<Resource>, EnumerationError> {
        let buckets = self
            .assets
            .search_all_resources(BUCKET_ASSET_TYPE)
            .await
            .map_err(|e| EnumerationError::list(&self.resource_type, e))?;

        let policies = try_join_all(buckets.into_iter().map(|b| {
            let bucket = if b.display_name.is_empty() {
                last_segment(&b.name).to_string()
            } else {
                b.display_name
            };
            self.bucket_bindings(bucket)
        }))
        .await
        .map_err(|e| EnumerationError::list(&self.resource_type, e))?;

        let mut resources = Vec::new();
        for (bucket, bindings) in policies {
            for (role, members) in &bindings {
                for member in members {
                    let id = format!("b/{}/{}/{}", bucket, role, member);
                    resources.push(self.factory.create(
                        &self.resource_type,
                        &id,
                        member_attributes(("bucket", &bucket), role, member),
                    ));
                }
            }
        }
        Ok(resources)
    }
}

/// One stub per (project, role, member)
pub struct ProjectIamMemberEnumerator {
    resource_type: ResourceType,
    repository: Arc<dyn ResourceManagerRepository>,
    factory: Arc<dyn ResourceFactory>,
}

impl ProjectIamMemberEnumerator {
    pub fn new(
        repository: Arc<dyn ResourceManagerRepository>,
        factory: Arc<dyn ResourceFactory>,
    ) -> Self {
        Self {
            resource_type: ResourceType::new(GOOGLE_PROJECT_IAM_MEMBER),
            repository,
            factory,
        }
    }
}

#[async_trait]
impl Enumerator for ProjectIamMemberEnumerator {
    fn supported_type(&self) -> ResourceType {
        self.resource_type.clone()
    }

    async fn enumerate(&self) -> Result<Vec<Resource>, EnumerationError> {
        let projects = self
            .repository
            .list_project_bindings()
            .await
            .map_err(|e| EnumerationError::list(&self.resource_type, e))?;

        let mut resources = Vec::new();
        for (project, bindings) in &projects {
            for (role, members) in bindings {
                for member in members {
                    let id = format!("{}/{}/{}", project, role, member);
                    resources.push(self.factory.create(
                        &self.resource_type,
                        &id,
                        member_attributes(("project", project), role, member),
                    ));
                }
            }
        }
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::google::definitions::get_definition;
    use crate::remote::google::repository::AssetResource;
    use crate::resource::DefaultResourceFactory;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAssets {
        results: Vec<ResourceSearchResult>,
        assets: Vec<Asset>,
    }

    #[async_trait]
    impl AssetRepository for FakeAssets {
        async fn search_all_resources(
            &self,
            asset_type: &str,
        ) -> anyhow::Result<Vec<ResourceSearchResult>> {
            Ok(self
                .results
                .iter()
                .filter(|r| r.asset_type == asset_type)
                .cloned()
                .collect())
        }

        async fn list_all_assets(&self, asset_type: &str) -> anyhow::Result<Vec<Asset>> {
            Ok(self
                .assets
                .iter()
                .filter(|a| a.asset_type == asset_type)
                .cloned()
                .collect())
        }
    }

    struct FakeStorage {
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StorageRepository for FakeStorage {
        async fn list_all_bindings(&self, bucket: &str) -> anyhow::Result<Bindings> {
            self.requested.lock().unwrap().push(bucket.to_string());
            if bucket == "locked" {
                anyhow::bail!("API request failed: 403 Forbidden");
            }
            let mut bindings = Bindings::new();
            bindings.insert(
                "roles/storage.admin".to_string(),
                vec!["user:a@example.com".to_string(), "group:ops@example.com".to_string()],
            );
            Ok(bindings)
        }
    }

    fn search_result(name: &str, asset_type: &str, display_name: &str) -> ResourceSearchResult {
        ResourceSearchResult {
            name: name.to_string(),
            asset_type: asset_type.to_string(),
            project: "projects/123".to_string(),
            display_name: display_name.to_string(),
            location: "europe-west1".to_string(),
            labels: BTreeMap::new(),
            additional_attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_resource_path_strips_service() {
        assert_eq!(
            resource_path("//compute.googleapis.com/projects/p/global/networks/default"),
            "projects/p/global/networks/default"
        );
        assert_eq!(resource_path("plain"), "plain");
    }

    #[tokio::test]
    async fn test_asset_enumerator_builds_stubs_in_listing_order() {
        let mut first = search_result(
            "//compute.googleapis.com/projects/p/zones/a/instances/vm-1",
            "compute.googleapis.com/Instance",
            "vm-1",
        );
        first
            .additional_attributes
            .insert("machineType".to_string(), json!("e2-small"));
        let repo = Arc::new(FakeAssets {
            results: vec![
                first,
                search_result(
                    "//compute.googleapis.com/projects/p/global/networks/default",
                    "compute.googleapis.com/Network",
                    "default",
                ),
                search_result(
                    "//compute.googleapis.com/projects/p/zones/a/instances/vm-2",
                    "compute.googleapis.com/Instance",
                    "vm-2",
                ),
            ],
            ..Default::default()
        });

        let enumerator = AssetEnumerator::new(
            get_definition("google_compute_instance").unwrap(),
            repo,
            Arc::new(DefaultResourceFactory),
        );
        let resources = enumerator.enumerate().await.unwrap();

        let ids: Vec<_> = resources.iter().map(|r| r.id()).collect();
        assert_eq!(
            ids,
            vec!["projects/p/zones/a/instances/vm-1", "projects/p/zones/a/instances/vm-2"]
        );
        assert_eq!(resources[0].attribute_str("machineType"), Some("e2-small"));
        assert_eq!(resources[0].attribute_str("name"), Some("vm-1"));
        assert_eq!(resources[1].attribute_str("machineType"), None);
    }

    #[tokio::test]
    async fn test_bucket_id_is_display_name() {
        let repo = Arc::new(FakeAssets {
            results: vec![search_result(
                "//storage.googleapis.com/my-bucket",
                BUCKET_ASSET_TYPE,
                "my-bucket",
            )],
            ..Default::default()
        });
        let enumerator = AssetEnumerator::new(
            get_definition("google_storage_bucket").unwrap(),
            repo,
            Arc::new(DefaultResourceFactory),
        );

        let resources = enumerator.enumerate().await.unwrap();
        assert_eq!(resources[0].id(), "my-bucket");
        assert_eq!(
            resources[0].attribute_str("asset_name"),
            Some("//storage.googleapis.com/my-bucket")
        );
    }

    #[tokio::test]
    async fn test_function_stub_from_asset_data() {
        let mut data = serde_json::Map::new();
        data.insert("runtime".to_string(), json!("python311"));
        data.insert("entryPoint".to_string(), json!("handler"));
        let repo = Arc::new(FakeAssets {
            assets: vec![Asset {
                name: "//cloudfunctions.googleapis.com/projects/p/locations/eu/functions/f"
                    .to_string(),
                asset_type: "cloudfunctions.googleapis.com/CloudFunction".to_string(),
                resource: Some(AssetResource {
                    data,
                    location: "eu".to_string(),
                }),
            }],
            ..Default::default()
        });
        let enumerator = AssetEnumerator::new(
            get_definition("google_cloudfunctions_function").unwrap(),
            repo,
            Arc::new(DefaultResourceFactory),
        );

        let resources = enumerator.enumerate().await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].id(), "projects/p/locations/eu/functions/f");
        assert_eq!(resources[0].attribute_str("runtime"), Some("python311"));
        assert_eq!(resources[0].attribute_str("location"), Some("eu"));
    }

    #[tokio::test]
    async fn test_bucket_iam_members_one_per_binding_member() {
        let assets = Arc::new(FakeAssets {
            results: vec![
                search_result("//storage.googleapis.com/a", BUCKET_ASSET_TYPE, "a"),
                search_result("//storage.googleapis.com/b", BUCKET_ASSET_TYPE, "b"),
            ],
            ..Default::default()
        });
        let storage = Arc::new(FakeStorage {
            requested: Mutex::new(Vec::new()),
        });
        let enumerator = StorageBucketIamMemberEnumerator::new(
            assets,
            storage.clone(),
            Arc::new(DefaultResourceFactory),
        );

        let resources = enumerator.enumerate().await.unwrap();

        let ids: Vec<_> = resources.iter().map(|r| r.id()).collect();
        assert_eq!(
            ids,
            vec![
                "b/a/roles/storage.admin/user:a@example.com",
                "b/a/roles/storage.admin/group:ops@example.com",
                "b/b/roles/storage.admin/user:a@example.com",
                "b/b/roles/storage.admin/group:ops@example.com",
            ]
        );
        assert_eq!(resources[2].attribute_str("bucket"), Some("b"));
        assert_eq!(storage.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bucket_iam_policy_error_fails_the_type() {
        let assets = Arc::new(FakeAssets {
            results: vec![search_result(
                "//storage.googleapis.com/locked",
                BUCKET_ASSET_TYPE,
                "locked",
            )],
            ..Default::default()
        });
        let enumerator = StorageBucketIamMemberEnumerator::new(
            assets,
            Arc::new(FakeStorage {
                requested: Mutex::new(Vec::new()),
            }),
            Arc::new(DefaultResourceFactory),
        );

        let err = enumerator.enumerate().await.unwrap_err();
        assert_eq!(err.resource_type().as_str(), GOOGLE_STORAGE_BUCKET_IAM_MEMBER);
        assert!(format!("{:#}", anyhow::Error::from(err)).contains("403"));
    }

    struct FakeResourceManager;

    #[async_trait]
    impl ResourceManagerRepository for FakeResourceManager {
        async fn list_project_bindings(&self) -> anyhow::Result<BTreeMap<String, Bindings>> {
            let mut bindings = Bindings::new();
            bindings.insert("roles/owner".to_string(), vec!["user:me@example.com".to_string()]);
            let mut all = BTreeMap::new();
            all.insert("my-project".to_string(), bindings);
            Ok(all)
        }
    }

    #[tokio::test]
    async fn test_project_iam_member_ids() {
        let enumerator = ProjectIamMemberEnumerator::new(
            Arc::new(FakeResourceManager),
            Arc::new(DefaultResourceFactory),
        );

        let resources = enumerator.enumerate().await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].id(), "my-project/roles/owner/user:me@example.com");
        assert_eq!(resources[0].attribute_str("project"), Some("my-project"));
        assert_eq!(resources[0].attribute_str("role"), Some("roles/owner"));
    }
}
