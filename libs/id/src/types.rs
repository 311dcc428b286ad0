//! Local ID definitions.
//!
//! Record and request IDs are ULID-based and prefixed. Resources are owned by
//! an external repository and referenced by UUID.

use crate::define_id;

// =============================================================================
// Local IDs
// =============================================================================

define_id!(RecordId, "pid");
define_id!(RequestId, "req");

// =============================================================================
// Resource references
// =============================================================================

/// Reference to a resource owned by the external repository.
///
/// The engine only associates and looks resources up by this reference; it
/// never owns their lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(uuid::Uuid);

impl ResourceId {
    /// Creates a fresh random reference (tests and local tooling).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn uuid(&self) -> uuid::Uuid {
        self.0
    }

    /// Parses a hyphenated UUID string.
    pub fn parse(s: &str) -> Result<Self, crate::IdError> {
        if s.is_empty() {
            return Err(crate::IdError::Empty);
        }
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::IdError::InvalidUuid(e.to_string()))
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl std::str::FromStr for ResourceId {
    type Err = crate::IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_roundtrip() {
        let id = RecordId::new();
        let parsed: RecordId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!(id.to_string().starts_with("pid_"));
    }

    #[test]
    fn test_record_id_invalid_prefix() {
        let result: Result<RecordId, _> = "req_01HV4Z2WQXKJNM8GPQY6VBKC3D".parse();
        assert!(matches!(
            result.unwrap_err(),
            crate::IdError::InvalidPrefix { .. }
        ));
    }

    #[test]
    fn test_record_id_missing_separator() {
        let result: Result<RecordId, _> = "pid01HV4Z2WQXKJNM8GPQY6VBKC3D".parse();
        assert!(matches!(result.unwrap_err(), crate::IdError::MissingSeparator));
    }

    #[test]
    fn test_record_id_empty_and_bad_ulid() {
        assert!(matches!(
            "".parse::<RecordId>().unwrap_err(),
            crate::IdError::Empty
        ));
        assert!(matches!(
            "pid_nope".parse::<RecordId>().unwrap_err(),
            crate::IdError::InvalidUlid(_)
        ));
    }

    #[test]
    fn test_record_id_suffix_is_lowercase_ulid() {
        let id = RecordId::new();
        let suffix = id.suffix();
        assert_eq!(suffix.len(), 26);
        assert_eq!(suffix, suffix.to_ascii_lowercase());
        assert_eq!(suffix.to_ascii_uppercase(), id.ulid().to_string());
    }

    #[test]
    fn test_request_id_json_roundtrip() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_resource_id_roundtrip() {
        let id = ResourceId::new();
        let parsed: ResourceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn test_resource_id_rejects_garbage() {
        assert!(matches!(
            ResourceId::parse("not-a-uuid").unwrap_err(),
            crate::IdError::InvalidUuid(_)
        ));
    }

    #[test]
    fn test_id_prefixes_unique() {
        assert_ne!(RecordId::PREFIX, RequestId::PREFIX);
    }
}
