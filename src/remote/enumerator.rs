//! Enumerator contract

use super::error::EnumerationError;
use crate::resource::{Resource, ResourceType};
use async_trait::async_trait;

/// Lists every resource of one type.
///
/// Implementations read through cache-backed repositories and build stubs
/// with a [`ResourceFactory`](crate::resource::ResourceFactory). Results follow
/// the provider's listing order. Any repository error aborts the call for
/// this type only.
#[async_trait]
pub trait Enumerator: Send + Sync {
    fn supported_type(&self) -> ResourceType;

    async fn enumerate(&self) -> Result<Vec<Resource>, EnumerationError>;
}
