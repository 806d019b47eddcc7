//! Scan engine
//!
//! Runs the registered enumerators of a session concurrently, optionally
//! hydrates every stub through its type's details fetcher, and collects
//! resources and failures into a [`ScanReport`]. A failing type or a failing
//! resource is recorded and the scan goes on.

use crate::cache::{Cache, CacheStats};
use crate::remote::{DetailsFetcher, EnumerationError, Enumerator, Registry};
use crate::resource::{Resource, ResourceType};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no enumerator registered for {0}")]
    UnknownType(ResourceType),
}

/// What to scan and how
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Types to enumerate; empty means every registered type
    pub resource_types: Vec<ResourceType>,
    /// Hydrate stubs of types that have a details fetcher
    pub details: bool,
    /// Upper bound on concurrent enumerations, and on concurrent reads per type
    pub max_concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            resource_types: Vec::new(),
            details: false,
            max_concurrency: 10,
        }
    }
}

/// A type that could not be listed, or a resource that could not be hydrated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub error: String,
}

impl From<&EnumerationError> for ScanFailure {
    fn from(error: &EnumerationError) -> Self {
        let id = match error {
            EnumerationError::Details { id, .. } => Some(id.clone()),
            EnumerationError::List { .. } => None,
        };
        Self {
            resource_type: error.resource_type().clone(),
            id,
            error: error_chain(error),
        }
    }
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub resources: Vec<Resource>,
    pub failures: Vec<ScanFailure>,
    pub cache: CacheStats,
}

pub struct Scanner<'a> {
    registry: &'a Registry,
    cache: Arc<Cache>,
    options: ScanOptions,
}

impl<'a> Scanner<'a> {
    pub fn new(registry: &'a Registry, cache: Arc<Cache>, options: ScanOptions) -> Self {
        Self {
            registry,
            cache,
            options,
        }
    }

    /// Enumerators to run, in registration or requested order
    pub fn selected(&self) -> Result<Vec<Arc<dyn Enumerator>>, ScanError> {
        if self.options.resource_types.is_empty() {
            return Ok(self.registry.enumerators().to_vec());
        }
        self.options
            .resource_types
            .iter()
            .map(|t| {
                self.registry
                    .enumerator_for(t)
                    .ok_or_else(|| ScanError::UnknownType(t.clone()))
            })
            .collect()
    }

    pub async fn run(&self) -> Result<ScanReport, ScanError> {
        let enumerators = self.selected()?;
        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let concurrency = self.options.max_concurrency.max(1);

        tracing::info!(
            "Scan {} started: {} resource types",
            session_id,
            enumerators.len()
        );

        // A type is listed and hydrated as one unit of the stream
        let outcomes: Vec<_> = stream::iter(enumerators)
            .map(|enumerator| self.scan_type(enumerator, concurrency))
            .buffered(concurrency)
            .collect()
            .await;

        let mut resources = Vec::new();
        let mut failures = Vec::new();
        for (found, failed) in outcomes {
            resources.extend(found);
            failures.extend(failed);
        }

        let finished_at = Utc::now();
        tracing::info!(
            "Scan {} finished: {} resources, {} failures in {}ms",
            session_id,
            resources.len(),
            failures.len(),
            (finished_at - started_at).num_milliseconds()
        );

        Ok(ScanReport {
            session_id,
            started_at,
            finished_at,
            resources,
            failures,
            cache: self.cache.stats(),
        })
    }

    /// List one type and hydrate its stubs when details are requested
    async fn scan_type(
        &self,
        enumerator: Arc<dyn Enumerator>,
        concurrency: usize,
    ) -> (Vec<Resource>, Vec<ScanFailure>) {
        let resource_type = enumerator.supported_type();
        let stubs = match enumerator.enumerate().await {
            Ok(stubs) => stubs,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", resource_type, error_chain(&e));
                return (Vec::new(), vec![ScanFailure::from(&e)]);
            }
        };
        tracing::debug!("{}: {} resources", resource_type, stubs.len());

        let fetcher = self
            .options
            .details
            .then(|| self.registry.details_fetcher_for(&resource_type))
            .flatten();

        match fetcher {
            Some(fetcher) => {
                let (hydrated, errors) = hydrate(fetcher.as_ref(), stubs, concurrency).await;
                (hydrated, errors.iter().map(ScanFailure::from).collect())
            }
            None => (stubs, Vec::new()),
        }
    }
}

/// Hydrate stubs concurrently, keeping their order.
///
/// A failed read is returned alongside the others and its stub is left out.
pub async fn hydrate(
    fetcher: &dyn DetailsFetcher,
    stubs: Vec<Resource>,
    concurrency: usize,
) -> (Vec<Resource>, Vec<EnumerationError>) {
    let results: Vec<_> = stream::iter(stubs)
        .map(|stub| async move { fetcher.read_details(&stub).await })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut hydrated = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(resource) => hydrated.push(resource),
            Err(e) => {
                tracing::warn!("{}", error_chain(&e));
                errors.push(e);
            }
        }
    }
    (hydrated, errors)
}
