//! Google resource definitions
//!
//! Asset-backed resource types are described in `resources/google.json`,
//! embedded at compile time, so a new type backed by the asset inventory
//! needs no code.

use serde::Deserialize;
use std::sync::OnceLock;

/// Embedded resource definitions (compiled into the binary)
const DEFINITIONS_JSON: &str = include_str!("../../resources/google.json");

/// Which Cloud Asset listing carries the type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetSource {
    /// `searchAllResources`: metadata only
    #[default]
    Search,
    /// `assets` with `contentType=RESOURCE`: full resource data
    Assets,
}

/// How a stub's id is derived from the asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdFormat {
    /// Asset name without the `//service.googleapis.com/` prefix
    #[default]
    ResourcePath,
    /// The asset's display name
    DisplayName,
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub resource_type: String,
    pub asset_type: String,
    #[serde(default)]
    pub source: AssetSource,
    #[serde(default)]
    pub id: IdFormat,
    /// Whether a details fetcher is registered for the type
    #[serde(default)]
    pub details: bool,
    /// Listing attributes copied onto the stub
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DefinitionsFile {
    resources: Vec<ResourceDef>,
}

static DEFINITIONS: OnceLock<Vec<ResourceDef>> = OnceLock::new();

/// All definitions, in registration order
pub fn definitions() -> &'static [ResourceDef] {
    DEFINITIONS.get_or_init(|| {
        let file: DefinitionsFile = serde_json::from_str(DEFINITIONS_JSON)
            .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
        file.resources
    })
}

/// Get a definition by resource type
pub fn get_definition(resource_type: &str) -> Option<&'static ResourceDef> {
    definitions()
        .iter()
        .find(|def| def.resource_type == resource_type)
}

/// Asset types fetched through the given listing
pub fn asset_types(source: AssetSource) -> Vec<String> {
    definitions()
        .iter()
        .filter(|def| def.source == source)
        .map(|def| def.asset_type.clone())
        .collect()
}
