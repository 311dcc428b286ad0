//! The durable identifier record.
//!
//! One record per minted identifier. The value never changes once assigned,
//! the resource binding can be cleared but never re-pointed, and the status
//! only moves through [`IdentifierRecord::transition`].

use chrono::{DateTime, Utc};
use pidreg_id::{IdentifierValue, RecordId, ResourceId, Scheme};

use crate::resource::{ResourceMetadata, ResourceType};
use crate::status::{IllegalTransition, Status};

/// An identifier bound (or once bound) to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRecord {
    id: RecordId,
    value: IdentifierValue,
    resource: Option<ResourceId>,
    resource_type: ResourceType,
    status: Status,
    attention: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Column values of a persisted record, as read back from storage.
#[derive(Debug, Clone)]
pub(crate) struct StoredRecord {
    pub id: RecordId,
    pub value: IdentifierValue,
    pub resource: Option<ResourceId>,
    pub resource_type: ResourceType,
    pub status: Status,
    pub attention: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentifierRecord {
    /// A freshly minted record bound to `resource`.
    pub fn mint(id: RecordId, value: IdentifierValue, resource: &ResourceMetadata) -> Self {
        let now = Utc::now();
        Self {
            id,
            value,
            resource: Some(resource.id),
            resource_type: resource.resource_type,
            status: Status::Minted,
            attention: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn from_stored(stored: StoredRecord) -> Self {
        Self {
            id: stored.id,
            value: stored.value,
            resource: stored.resource,
            resource_type: stored.resource_type,
            status: stored.status,
            attention: stored.attention,
            version: stored.version,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn value(&self) -> &IdentifierValue {
        &self.value
    }

    pub fn scheme(&self) -> Scheme {
        self.value.scheme()
    }

    /// The bound resource, or `None` once orphaned.
    pub fn resource(&self) -> Option<ResourceId> {
        self.resource
    }

    /// Type of the resource at bind time; kept after the binding is cleared.
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Why the record is parked for an operator, if it is. The retry
    /// sweep leaves parked records alone.
    pub fn attention(&self) -> Option<&str> {
        self.attention.as_deref()
    }

    /// Optimistic concurrency version of the persisted row.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_orphaned(&self) -> bool {
        self.resource.is_none()
    }

    pub fn is_minted(&self) -> bool {
        self.status.is_minted()
    }

    pub fn is_reserved(&self) -> bool {
        self.status.is_reserved()
    }

    pub fn is_registered(&self) -> bool {
        self.status.is_registered()
    }

    pub fn is_to_be_deleted(&self) -> bool {
        self.status.is_to_be_deleted()
    }

    pub fn is_deleted(&self) -> bool {
        self.status.is_deleted()
    }

    /// Moves to `target` if the table allows it. On error the record is
    /// left untouched.
    pub fn transition(&mut self, target: Status) -> Result<(), IllegalTransition> {
        self.status = self.status.transition(target)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Drops the resource binding. The type hint stays.
    pub fn clear_resource(&mut self) {
        if self.resource.take().is_some() {
            self.updated_at = Utc::now();
        }
    }

    pub fn flag_attention(&mut self, message: impl Into<String>) {
        self.attention = Some(message.into());
        self.updated_at = Utc::now();
    }

    /// Returns true if a marker was cleared.
    pub fn clear_attention(&mut self) -> bool {
        let cleared = self.attention.take().is_some();
        if cleared {
            self.updated_at = Utc::now();
        }
        cleared
    }

    pub(crate) fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}
