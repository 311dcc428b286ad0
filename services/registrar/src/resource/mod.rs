//! Read-only view of the resources identifiers are bound to.
//!
//! The engine never owns resources. It needs a handful of facts about one:
//! its type (kept as a hint on the record), its handle (for the landing
//! page) and a flat list of qualified metadata fields.

mod rest;

use std::collections::HashMap;

use async_trait::async_trait;
use pidreg_id::ResourceId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub use rest::{RestDirectoryConfig, RestResourceDirectory};

/// Kind of repository object an identifier was bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Item,
    Collection,
    Community,
}

impl ResourceType {
    /// Stable integer code persisted on the record.
    pub const fn code(&self) -> i64 {
        match self {
            Self::Item => 2,
            Self::Collection => 3,
            Self::Community => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(Self::Item),
            3 => Some(Self::Collection),
            4 => Some(Self::Community),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Item => f.write_str("item"),
            Self::Collection => f.write_str("collection"),
            Self::Community => f.write_str("community"),
        }
    }
}

/// One qualified metadata value, e.g. `dc.title = "On Rivers"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub field: String,
    pub value: String,
}

/// Snapshot of a resource as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub id: ResourceId,
    pub resource_type: ResourceType,
    pub handle: Option<String>,
    pub metadata: Vec<MetadataEntry>,
}

impl ResourceMetadata {
    pub fn new(id: ResourceId, resource_type: ResourceType) -> Self {
        Self {
            id,
            resource_type,
            handle: None,
            metadata: Vec::new(),
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push(MetadataEntry {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// First value recorded for a qualified field name.
    pub fn first_value(&self, field: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.field == field)
            .map(|entry| entry.value.as_str())
    }
}

/// Lookup of resources by reference.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    /// Returns the current snapshot, or `None` if the resource is gone.
    async fn lookup(&self, id: ResourceId) -> anyhow::Result<Option<ResourceMetadata>>;
}

/// In-process directory for tests and local runs.
#[derive(Default)]
pub struct InMemoryResources {
    resources: RwLock<HashMap<ResourceId, ResourceMetadata>>,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, resource: ResourceMetadata) {
        self.resources.write().await.insert(resource.id, resource);
    }

    pub async fn remove(&self, id: ResourceId) -> Option<ResourceMetadata> {
        self.resources.write().await.remove(&id)
    }
}

#[async_trait]
impl ResourceDirectory for InMemoryResources {
    async fn lookup(&self, id: ResourceId) -> anyhow::Result<Option<ResourceMetadata>> {
        Ok(self.resources.read().await.get(&id).cloned())
    }
}
