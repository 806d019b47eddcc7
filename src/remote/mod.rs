//! Remote providers
//!
//! Provider-agnostic enumeration contracts plus the Google implementation.
//!
//! # Module Structure
//!
//! - [`enumerator`] - listing every resource of one type
//! - [`details`] - hydrating one stub
//! - [`registry`] - the explicit composition root
//! - [`paginate`] - cached, coalesced listings for repositories
//! - [`google`] - Google Cloud repositories, enumerators and provider

pub mod details;
pub mod enumerator;
pub mod error;
pub mod google;
pub mod paginate;
pub mod registry;

pub use details::{DetailsFetcher, GenericDetailsFetcher, ReadResourceArgs, ResourceReader};
pub use enumerator::Enumerator;
pub use error::{EnumerationError, RegistryError};
pub use paginate::{cached_pages, cached_value, Page};
pub use registry::{ProviderHandle, Registry};
