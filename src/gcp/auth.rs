//! GCP Authentication
//!
//! Bearer tokens come from a pre-issued access token when one is set in the
//! environment, from Application Default Credentials otherwise. The default
//! project follows the gcloud lookup order.

use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Scope of every API the scanner reads
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Environment variable holding a pre-issued access token
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Environment variables naming the project, by priority
const PROJECT_ENV: [&str; 3] = ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];

#[derive(Clone)]
enum TokenSource {
    /// ADC provider; it caches and refreshes tokens itself
    Adc(Arc<dyn TokenProvider>),
    Static(String),
}

/// Source of bearer tokens for API calls
#[derive(Clone)]
pub struct GcpCredentials {
    source: TokenSource,
}

impl GcpCredentials {
    /// Use `GOOGLE_OAUTH_ACCESS_TOKEN` when set, Application Default Credentials otherwise
    pub async fn new() -> Result<Self> {
        let env_token = std::env::var(ACCESS_TOKEN_ENV).unwrap_or_default();
        if !env_token.trim().is_empty() {
            tracing::info!("Using access token from {}", ACCESS_TOKEN_ENV);
            return Ok(Self::from_token(env_token.trim()));
        }

        let provider = gcp_auth::provider().await.context(
            "Failed to initialize GCP authentication. Run 'gcloud auth application-default login'",
        )?;
        tracing::info!("Using Application Default Credentials");

        Ok(Self {
            source: TokenSource::Adc(provider),
        })
    }

    /// Credentials that always present the same access token
    pub fn from_token(token: &str) -> Self {
        Self {
            source: TokenSource::Static(token.to_string()),
        }
    }

    pub async fn get_token(&self) -> Result<String> {
        match &self.source {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Adc(provider) => {
                let token = provider
                    .token(DEFAULT_SCOPES)
                    .await
                    .context("Failed to get access token")?;
                Ok(token.as_str().to_string())
            }
        }
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format.
///
/// 6 to 30 lowercase letters, digits and hyphens, starting with a letter
/// and not ending with a hyphen.
pub fn validate_project_id(project: &str) -> bool {
    let well_formed = project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    (6..=30).contains(&project.len())
        && well_formed
        && project.starts_with(|c: char| c.is_ascii_lowercase())
        && !project.ends_with('-')
}

/// `project` property of a gcloud properties file, within `section` if given
fn read_project_property(content: &str, section: Option<&str>) -> Option<String> {
    let mut current: Option<&str> = None;
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            current = Some(line);
            continue;
        }
        if section.is_some() && current != section {
            continue;
        }
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        if name.trim() == "project" && validate_project_id(value.trim()) {
            return Some(value.trim().to_string());
        }
    }
    None
}

/// Project of the active gcloud configuration
fn active_configuration_project(config_dir: &Path) -> Option<String> {
    let active = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let name = active.trim();

    // The name becomes part of a path
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        tracing::warn!("Ignoring invalid active_config name");
        return None;
    }

    let path = config_dir
        .join("configurations")
        .join(format!("config_{}", name));
    let content = std::fs::read_to_string(path).ok()?;
    read_project_property(&content, Some("[core]"))
}

/// Default project from the environment or the gcloud configuration
pub fn get_default_project() -> Option<String> {
    for var in PROJECT_ENV {
        let Ok(project) = std::env::var(var) else {
            continue;
        };
        if validate_project_id(&project) {
            return Some(project);
        }
        tracing::warn!("Invalid project ID format in {}", var);
    }

    let config_dir = get_gcloud_config_dir()?;
    std::fs::read_to_string(config_dir.join("properties"))
        .ok()
        .and_then(|content| read_project_property(&content, Some("[core]")))
        .or_else(|| active_configuration_project(&config_dir))
}
