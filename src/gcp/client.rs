//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// Base URLs of the APIs used by the repositories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub asset: String,
    pub storage: String,
    pub resourcemanager: String,
    pub compute: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            asset: "https://cloudasset.googleapis.com".to_string(),
            storage: "https://storage.googleapis.com".to_string(),
            resourcemanager: "https://cloudresourcemanager.googleapis.com".to_string(),
            compute: "https://compute.googleapis.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Route every API to the same base URL (local emulators, mock servers)
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            asset: base.clone(),
            storage: base.clone(),
            resourcemanager: base.clone(),
            compute: base,
        }
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    pub endpoints: Endpoints,
}

impl GcpClient {
    /// Create a new GCP client with default credentials and endpoints
    pub async fn new(project_id: &str) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(credentials, project_id, Endpoints::default())
    }

    pub fn with_credentials(
        credentials: GcpCredentials,
        project_id: &str,
        endpoints: Endpoints,
    ) -> Result<Self> {
        Ok(Self {
            credentials,
            http: GcpHttpClient::new()?,
            project_id: project_id.to_string(),
            endpoints,
        })
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a GET request with query parameters (repeated keys allowed)
    pub async fn get_with_query(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = Url::parse_with_params(url, query)
            .with_context(|| format!("Invalid URL: {}", url))?;
        self.get(url.as_str()).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        self.http.post(url, &token, body).await
    }

    // =========================================================================
    // Cloud Asset API helpers
    // =========================================================================

    /// Asset search scope of the configured project
    pub fn asset_scope(&self) -> String {
        format!("projects/{}", self.project_id)
    }

    /// Build Cloud Asset API URL
    pub fn asset_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoints.asset, path)
    }

    // =========================================================================
    // Cloud Storage API helpers
    // =========================================================================

    /// Build Cloud Storage API URL
    pub fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.endpoints.storage, path)
    }

    /// Build Cloud Storage bucket URL
    pub fn storage_bucket_url(&self, bucket: &str) -> String {
        self.storage_url(&format!("b/{}", urlencoding::encode(bucket)))
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL from a resource path (`projects/...`)
    pub fn compute_url(&self, path: &str) -> String {
        format!("{}/compute/v1/{}", self.endpoints.compute, path)
    }

    // =========================================================================
    // Resource Manager API helpers
    // =========================================================================

    /// Build Resource Manager API URL
    pub fn resourcemanager_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoints.resourcemanager, path)
    }
}

/// Format a GCP API error for display
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    super::http::format_gcp_error(error)
}
