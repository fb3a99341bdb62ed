//! Catalog data model, in-memory registry, and declarative loader.

pub mod error;
pub mod fingerprint;
pub mod loader;
pub mod model;
pub mod registry;

pub use error::{LoadError, RegistryError};
pub use model::{
    AccessPolicy, CatalogNode, DataQuality, DataSchema, Documentation, Freshness, NodeStatus,
    Ownership, PolicyVerdict, ResolvedOwnership, SchemaField, Sla, SourceBinding, SourceType,
    OWNERSHIP_FIELDS,
};
pub use registry::{parent_of, AuditEntry, Registry, Snapshot, Stats};
