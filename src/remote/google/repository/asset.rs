//! Cloud Asset Inventory repository
//!
//! All search-backed types share one `searchAllResources` listing over every
//! supported asset type: the first enumerator to ask fetches it, every other
//! one waits and filters the cached aggregate.

use super::parse_response;
use crate::cache::{Cache, CacheKey};
use crate::gcp::client::GcpClient;
use crate::remote::paginate::{cached_pages, Page};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

const PAGE_SIZE: &str = "500";

/// Metadata of one resource, as returned by `searchAllResources`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSearchResult {
    pub name: String,
    pub asset_type: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub additional_attributes: Map<String, Value>,
}

/// One asset with its resource data, as returned by `assets`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub name: String,
    pub asset_type: String,
    #[serde(default)]
    pub resource: Option<AssetResource>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResource {
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchAllResourcesResponse {
    #[serde(default)]
    results: Vec<ResourceSearchResult>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAssetsResponse {
    #[serde(default)]
    assets: Vec<Asset>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Search results of one asset type, in listing order
    async fn search_all_resources(&self, asset_type: &str) -> Result<Vec<ResourceSearchResult>>;

    /// Assets of one type with their resource data, in listing order
    async fn list_all_assets(&self, asset_type: &str) -> Result<Vec<Asset>>;
}

pub struct GcpAssetRepository {
    client: GcpClient,
    cache: Arc<Cache>,
    search_types: Vec<String>,
    asset_types: Vec<String>,
}

impl GcpAssetRepository {
    /// `search_types` and `asset_types` are the asset types requested by the
    /// shared `searchAllResources` and `assets` listings respectively
    pub fn new(
        client: GcpClient,
        cache: Arc<Cache>,
        search_types: Vec<String>,
        asset_types: Vec<String>,
    ) -> Self {
        Self {
            client,
            cache,
            search_types,
            asset_types,
        }
    }

    async fn search_page(&self, page_token: Option<String>) -> Result<Page<ResourceSearchResult>> {
        let url = self
            .client
            .asset_url(&format!("{}:searchAllResources", self.client.asset_scope()));
        let query = page_query(&self.search_types, &[], page_token.as_deref());

        let response = self.client.get_with_query(&url, &query).await?;
        let response: SearchAllResourcesResponse =
            parse_response(response, "searchAllResources")?;
        Ok(Page::new(response.results, response.next_page_token))
    }

    async fn assets_page(&self, page_token: Option<String>) -> Result<Page<Asset>> {
        let url = self
            .client
            .asset_url(&format!("{}/assets", self.client.asset_scope()));
        let query = page_query(
            &self.asset_types,
            &[("contentType", "RESOURCE")],
            page_token.as_deref(),
        );

        let response = self.client.get_with_query(&url, &query).await?;
        let response: ListAssetsResponse = parse_response(response, "assets")?;
        Ok(Page::new(response.assets, response.next_page_token))
    }
}

fn page_query<'a>(
    asset_types: &'a [String],
    extra: &[(&'a str, &'a str)],
    page_token: Option<&'a str>,
) -> Vec<(&'a str, &'a str)> {
    let mut query: Vec<(&str, &str)> = asset_types
        .iter()
        .map(|t| ("assetTypes", t.as_str()))
        .collect();
    query.extend_from_slice(extra);
    query.push(("pageSize", PAGE_SIZE));
    if let Some(token) = page_token {
        query.push(("pageToken", token));
    }
    query
}

#[async_trait]
impl AssetRepository for GcpAssetRepository {
    async fn search_all_resources(&self, asset_type: &str) -> Result<Vec<ResourceSearchResult>> {
        let key = CacheKey::new("SearchAllResources");
        let results = cached_pages(&self.cache, &key, move |token| self.search_page(token)).await?;

        Ok(results
            .into_iter()
            .filter(|r| r.asset_type == asset_type)
            .collect())
    }

    async fn list_all_assets(&self, asset_type: &str) -> Result<Vec<Asset>> {
        let key = CacheKey::new("ListAllAssets");
        let assets = cached_pages(&self.cache, &key, move |token| self.assets_page(token)).await?;

        Ok(assets
            .into_iter()
            .filter(|a| a.asset_type == asset_type)
            .collect())
    }
}
