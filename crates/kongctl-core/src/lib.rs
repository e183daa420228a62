//! Core types for kongctl
//!
//! The resource model, label semantics, namespace rules, the loaded resource
//! graph, and the remote-store interface the planner and executor consume.

pub mod error;
pub mod graph;
pub mod labels;
pub mod namespace;
pub mod reference;
pub mod resource;
pub mod store;

pub use error::{CoreError, Result};
pub use graph::ResourceGraph;
pub use labels::ProtectionChange;
pub use namespace::{DEFAULT_NAMESPACE, NamespaceFilter};
pub use reference::{REF_PREFIX, RefOrId};
pub use resource::{Resource, ResourceEntry, ResourceKind};
pub use store::{RemoteResource, RemoteStore, StoreError, StoreResult};
