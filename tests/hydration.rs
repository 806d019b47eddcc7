//! Integration tests for details hydration and scan isolation
//!
//! Hand-written enumerators and readers stand in for the provider.

use async_trait::async_trait;
use cloudenum::cache::Cache;
use cloudenum::remote::{
    EnumerationError, Enumerator, GenericDetailsFetcher, ReadResourceArgs, Registry,
    ResourceReader,
};
use cloudenum::resource::{
    Attributes, DefaultResourceFactory, JsonDeserializer, Resource, ResourceFactory, ResourceType,
};
use cloudenum::scan::{hydrate, ScanOptions, Scanner};
use serde_json::{json, Value};
use std::sync::Arc;

const DISK: &str = "google_compute_disk";

/// Reads every disk except `disk-3`
struct FlakyReader;

#[async_trait]
impl ResourceReader for FlakyReader {
    async fn read_resource(&self, args: ReadResourceArgs) -> anyhow::Result<Value> {
        if args.id == "disk-3" {
            anyhow::bail!("API request failed: 500 Internal Server Error");
        }
        Ok(json!({"id": args.id, "sizeGb": "10", "zone": args.attributes["zone"]}))
    }
}

struct DiskEnumerator;

#[async_trait]
impl Enumerator for DiskEnumerator {
    fn supported_type(&self) -> ResourceType {
        DISK.into()
    }

    async fn enumerate(&self) -> Result<Vec<Resource>, EnumerationError> {
        Ok(stubs())
    }
}

fn stubs() -> Vec<Resource> {
    (1..=5)
        .map(|i| {
            let mut attributes = Attributes::new();
            attributes.insert("zone".to_string(), json!("europe-west1-b"));
            DefaultResourceFactory.create(&DISK.into(), &format!("disk-{}", i), attributes)
        })
        .collect()
}

fn fetcher() -> GenericDetailsFetcher {
    GenericDetailsFetcher::new(
        DISK.into(),
        Arc::new(FlakyReader),
        Arc::new(JsonDeserializer::new(Arc::new(DefaultResourceFactory))),
    )
}

/// Test module for per-resource failure isolation
mod hydration_tests {
    use super::*;

    /// With 5 stubs and #3 failing, the other 4 are hydrated
    #[tokio::test]
    async fn test_partial_hydration_failure() {
        let fetcher = fetcher();

        let (hydrated, errors) = hydrate(&fetcher, stubs(), 3).await;

        let ids: Vec<_> = hydrated.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["disk-1", "disk-2", "disk-4", "disk-5"]);
        assert!(hydrated.iter().all(|r| r.attribute_str("sizeGb") == Some("10")));

        assert_eq!(errors.len(), 1);
        match &errors[0] {
            EnumerationError::Details { resource_type, id, .. } => {
                assert_eq!(resource_type.as_str(), DISK);
                assert_eq!(id, "disk-3");
            }
            other => panic!("Expected a details error, got {:?}", other),
        }
    }

    /// The scan reports the failed resource and keeps the others
    #[tokio::test]
    async fn test_scan_with_details_reports_failed_resource() {
        let mut registry = Registry::new();
        registry.add_enumerator(DiskEnumerator).unwrap();
        registry.add_details_fetcher(DISK.into(), fetcher()).unwrap();

        let options = ScanOptions {
            details: true,
            ..Default::default()
        };
        let report = Scanner::new(&registry, Arc::new(Cache::new(10)), options)
            .run()
            .await
            .unwrap();

        assert_eq!(report.resources.len(), 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id.as_deref(), Some("disk-3"));
        assert!(report.failures[0].error.contains("500"));
    }

    /// Without details the stubs are reported as listed
    #[tokio::test]
    async fn test_scan_without_details_keeps_stubs() {
        let mut registry = Registry::new();
        registry.add_enumerator(DiskEnumerator).unwrap();
        registry.add_details_fetcher(DISK.into(), fetcher()).unwrap();

        let report = Scanner::new(&registry, Arc::new(Cache::new(10)), ScanOptions::default())
            .run()
            .await
            .unwrap();

        assert_eq!(report.resources, stubs());
        assert!(report.failures.is_empty());
    }
}
