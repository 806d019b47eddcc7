//! Cloud resource enumeration
//!
//! Lists the resources of a cloud project through cache-backed repositories.
//! Concurrent requests for the same listing are coalesced so that the
//! provider API is reached at most once per listing and session.
//!
//! # Module Structure
//!
//! - [`cache`] - bounded, coalescing memoization
//! - [`resource`] - canonical resources, factory and deserializer
//! - [`remote`] - enumerators, details fetchers, registry, Google provider
//! - [`gcp`] - authentication and HTTP transport
//! - [`scan`] - concurrent enumeration of a whole registry
//! - [`config`] - persistent user configuration

pub mod cache;
pub mod config;
pub mod gcp;
pub mod remote;
pub mod resource;
pub mod scan;

/// Version injected at compile time via CLOUDENUM_VERSION env var,
/// or the package version for local builds.
pub const VERSION: &str = match option_env!("CLOUDENUM_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
