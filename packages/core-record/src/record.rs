//! The FlatRecord type - an identity-bearing flat key-value record.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::traits::{ordered_child_segments, ordered_contains_prefix, FieldStore};
use crate::value::{PrimitiveValue, Timestamp};
use crate::{Error, Result};

/// Zone used when the caller does not name one.
pub const DEFAULT_ZONE: &str = "_defaultZone";
/// Owner used when the caller does not name one.
pub const DEFAULT_OWNER: &str = "__defaultOwner__";

/// Version tag of the exported metadata document.
const METADATA_VERSION: u32 = 1;

/// The namespace a record lives in (zone + owner).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    pub zone_name: String,
    pub owner_name: String,
}

impl Namespace {
    pub fn new(zone_name: impl Into<String>, owner_name: impl Into<String>) -> Self {
        Namespace {
            zone_name: zone_name.into(),
            owner_name: owner_name.into(),
        }
    }

    /// A zone owned by the default owner.
    pub fn zone(zone_name: impl Into<String>) -> Self {
        Namespace::new(zone_name, DEFAULT_OWNER)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::new(DEFAULT_ZONE, DEFAULT_OWNER)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.zone_name, self.owner_name)
    }
}

/// Unique identity of a record within the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub record_name: String,
    pub namespace: Namespace,
}

impl RecordId {
    pub fn new(record_name: impl Into<String>, namespace: Namespace) -> Self {
        RecordId {
            record_name: record_name.into(),
            namespace,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.record_name)
    }
}

/// Bookkeeping owned by the external store.
///
/// The transcoder never interprets these; it only carries them through
/// metadata export and import so an update can be written into the same
/// record the store handed out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFields {
    pub change_tag: Option<String>,
    pub created_at: Option<Timestamp>,
    pub modified_at: Option<Timestamp>,
    pub creator: Option<String>,
    pub last_modified_by: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct MetadataDocument {
    version: u32,
    record_type: String,
    id: RecordId,
    #[serde(default)]
    system: SystemFields,
}

/// A flat record: identity plus a mapping from string keys to
/// `PrimitiveValue`s.
///
/// Keys are held in a `BTreeMap`, so child-segment discovery is a range
/// scan over the `base_` prefix instead of a pass over every key.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatRecord {
    record_type: String,
    id: RecordId,
    system: SystemFields,
    fields: BTreeMap<String, PrimitiveValue>,
}

impl FlatRecord {
    /// Create an empty record with the given identity.
    pub fn new(record_type: impl Into<String>, id: RecordId) -> Self {
        FlatRecord {
            record_type: record_type.into(),
            id,
            system: SystemFields::default(),
            fields: BTreeMap::new(),
        }
    }

    // === Identity ===

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn namespace(&self) -> &Namespace {
        &self.id.namespace
    }

    pub fn system_fields(&self) -> &SystemFields {
        &self.system
    }

    /// Replace the store-owned bookkeeping. Intended for store adapters.
    pub fn set_system_fields(&mut self, system: SystemFields) {
        self.system = system;
    }

    pub fn change_tag(&self) -> Option<&str> {
        self.system.change_tag.as_deref()
    }

    // === Fields ===

    pub fn get(&self, key: &str) -> Option<&PrimitiveValue> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PrimitiveValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<PrimitiveValue> {
        self.fields.remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PrimitiveValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    // === Metadata ===

    /// Export identity and system fields (never user fields) as an opaque
    /// blob that `from_system_fields` can rebuild a shell from.
    pub fn export_system_fields(&self) -> Result<Bytes> {
        let document = MetadataDocument {
            version: METADATA_VERSION,
            record_type: self.record_type.clone(),
            id: self.id.clone(),
            system: self.system.clone(),
        };
        let bytes = serde_json::to_vec(&document).map_err(Error::invalid_metadata)?;
        Ok(Bytes::from(bytes))
    }

    /// Rebuild a record shell (identity + system fields, no user fields)
    /// from a blob produced by `export_system_fields`.
    pub fn from_system_fields(metadata: &[u8]) -> Result<FlatRecord> {
        let document: MetadataDocument =
            serde_json::from_slice(metadata).map_err(Error::invalid_metadata)?;

        if document.version != METADATA_VERSION {
            return Err(Error::invalid_metadata(format!(
                "unsupported metadata version {}",
                document.version
            )));
        }
        if document.record_type.is_empty() {
            return Err(Error::invalid_metadata("empty record type"));
        }
        if document.id.record_name.is_empty() {
            return Err(Error::invalid_metadata("empty record name"));
        }

        Ok(FlatRecord {
            record_type: document.record_type,
            id: document.id,
            system: document.system,
            fields: BTreeMap::new(),
        })
    }
}

impl FieldStore for FlatRecord {
    fn get(&self, key: &str) -> Option<&PrimitiveValue> {
        self.fields.get(key)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut PrimitiveValue> {
        self.fields.get_mut(key)
    }

    fn set(&mut self, key: String, value: PrimitiveValue) {
        self.fields.insert(key, value);
    }

    fn keys(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.fields.keys().map(String::as_str))
    }

    fn child_segments(&self, base: &str) -> BTreeSet<String> {
        ordered_child_segments(&self.fields, base)
    }

    fn contains_prefix(&self, base: &str) -> bool {
        ordered_contains_prefix(&self.fields, base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatRecord {
        let mut record = FlatRecord::new(
            "TestValue",
            RecordId::new("A3907DA1", Namespace::zone("Notes")),
        );
        record.set_system_fields(SystemFields {
            change_tag: Some("tag-7".to_string()),
            created_at: Some(Timestamp::from_millis(1_600_000_000_000)),
            modified_at: None,
            creator: Some("owner".to_string()),
            last_modified_by: None,
        });
        record.set("number", 5i64);
        record
    }

    #[test]
    fn default_namespace() {
        let ns = Namespace::default();
        assert_eq!(ns.zone_name, DEFAULT_ZONE);
        assert_eq!(ns.owner_name, DEFAULT_OWNER);
        assert_eq!(Namespace::zone("z").owner_name, DEFAULT_OWNER);
    }

    #[test]
    fn metadata_roundtrip_keeps_identity_not_fields() {
        let record = sample();
        let blob = record.export_system_fields().unwrap();

        let shell = FlatRecord::from_system_fields(&blob).unwrap();
        assert_eq!(shell.record_type(), "TestValue");
        assert_eq!(shell.id(), record.id());
        assert_eq!(shell.change_tag(), Some("tag-7"));
        assert_eq!(shell.system_fields(), record.system_fields());
        assert!(shell.is_empty());
    }

    #[test]
    fn garbage_metadata_is_rejected() {
        let result = FlatRecord::from_system_fields(b"not a record");
        assert!(matches!(result, Err(Error::InvalidMetadata { .. })));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let blob = serde_json::json!({
            "version": 99,
            "record_type": "T",
            "id": {"record_name": "x", "namespace": {"zone_name": "z", "owner_name": "o"}},
        });
        let result = FlatRecord::from_system_fields(&serde_json::to_vec(&blob).unwrap());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }

    #[test]
    fn empty_identity_is_rejected() {
        let blob = serde_json::json!({
            "version": 1,
            "record_type": "T",
            "id": {"record_name": "", "namespace": {"zone_name": "z", "owner_name": "o"}},
        });
        let result = FlatRecord::from_system_fields(&serde_json::to_vec(&blob).unwrap());
        assert!(matches!(result, Err(Error::InvalidMetadata { .. })));
    }

    #[test]
    fn field_access() {
        let mut record = sample();
        assert_eq!(record.get("number"), Some(&PrimitiveValue::Int(5)));
        assert_eq!(record.len(), 1);
        assert_eq!(record.remove("number"), Some(PrimitiveValue::Int(5)));
        assert!(record.is_empty());
    }

    #[test]
    fn record_id_display() {
        let id = RecordId::new("abc", Namespace::default());
        assert_eq!(id.to_string(), "_defaultZone:__defaultOwner__/abc");
    }
}
