//! Konnect control-plane client for kongctl
//!
//! A typed, paginated facade over the HTTP API. Reads filter down to managed
//! resources in the requested namespaces; writes pass bodies through
//! unchanged - label injection is the executor's job. The client never
//! retries: rate-limit and server errors surface to the caller as-is.

pub mod client;
pub mod dto;
pub mod store;

pub use client::{ConfigError, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE, KonnectClient, KonnectConfig};
