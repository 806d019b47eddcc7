//! GCP API interaction module
//!
//! Transport only: authentication, HTTP, and URL building. Caching and
//! pagination live in the repositories under [`crate::remote::google`].
//!
//! # Module Structure
//!
//! - [`auth`] - Application Default Credentials, static tokens, default project
//! - [`client`] - Main GCP client for making API requests
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use cloudenum::gcp::client::GcpClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new("my-project").await?;
//!     let bucket = client.get(&client.storage_bucket_url("my-bucket")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
