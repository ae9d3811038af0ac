//! The PrimitiveValue type - the closed set of leaf kinds a flat record holds.
//!
//! A flat record has no nested structure. Every key maps to exactly one
//! `PrimitiveValue`, and the only "collection" it understands is a
//! homogeneous array of one leaf kind (`PrimitiveArray`).

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::record::{Namespace, RecordId};

/// The literal form of the null sentinel.
///
/// Stores that can only hold strings persist `PrimitiveValue::Null` as this
/// literal. A genuine string payload equal to it is indistinguishable once
/// it has been through such a store.
pub const NULL_SENTINEL: &str = "<<<_NULL_>>>";

/// Reserved newtype-struct name carrying a `Timestamp` through serde.
pub const TIMESTAMP_TOKEN: &str = "$flatrecord::Timestamp";
/// Reserved newtype-struct name carrying a `Location` through serde.
pub const LOCATION_TOKEN: &str = "$flatrecord::Location";
/// Reserved newtype-struct name carrying an `AssetRef` through serde.
pub const ASSET_TOKEN: &str = "$flatrecord::Asset";
/// Reserved newtype-struct name carrying a `RecordRef` through serde.
pub const REFERENCE_TOKEN: &str = "$flatrecord::Reference";

/// The kind of a `PrimitiveValue`, without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    UInt,
    Double,
    String,
    Bytes,
    Timestamp,
    Location,
    Asset,
    Reference,
    Array,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Location => "location",
            ValueKind::Asset => "asset",
            ValueKind::Reference => "reference",
            ValueKind::Array => "array",
        }
    }

    /// Whether values of this kind can be elements of a `PrimitiveArray`.
    pub fn is_array_element(&self) -> bool {
        !matches!(self, ValueKind::Null | ValueKind::Array)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point in time, in milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    millis: i64,
}

impl Timestamp {
    pub fn from_millis(millis: i64) -> Self {
        Timestamp { millis }
    }

    pub fn as_millis(&self) -> i64 {
        self.millis
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(TIMESTAMP_TOKEN, &self.millis)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimestampVisitor;

        impl<'de> Visitor<'de> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a timestamp in epoch milliseconds")
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> Result<Timestamp, D::Error> {
                i64::deserialize(deserializer).map(Timestamp::from_millis)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timestamp, E> {
                Ok(Timestamp::from_millis(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timestamp, E> {
                i64::try_from(v)
                    .map(Timestamp::from_millis)
                    .map_err(|_| E::custom("timestamp out of range"))
            }
        }

        deserializer.deserialize_newtype_struct(TIMESTAMP_TOKEN, TimestampVisitor)
    }
}

/// A geographic coordinate in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Location {
            latitude,
            longitude,
        }
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(LOCATION_TOKEN, &(self.latitude, self.longitude))
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LocationVisitor;

        impl<'de> Visitor<'de> for LocationVisitor {
            type Value = Location;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a (latitude, longitude) pair")
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> Result<Location, D::Error> {
                let (latitude, longitude) = <(f64, f64)>::deserialize(deserializer)?;
                Ok(Location::new(latitude, longitude))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Location, A::Error> {
                let latitude = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let longitude = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(Location::new(latitude, longitude))
            }
        }

        deserializer.deserialize_newtype_struct(LOCATION_TOKEN, LocationVisitor)
    }
}

/// A reference to a binary asset held outside the record (a file URL or
/// store-specific locator).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetRef {
    pub locator: String,
}

impl AssetRef {
    pub fn new(locator: impl Into<String>) -> Self {
        AssetRef {
            locator: locator.into(),
        }
    }
}

impl Serialize for AssetRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(ASSET_TOKEN, &self.locator)
    }
}

impl<'de> Deserialize<'de> for AssetRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AssetVisitor;

        impl<'de> Visitor<'de> for AssetVisitor {
            type Value = AssetRef;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an asset locator")
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> Result<AssetRef, D::Error> {
                String::deserialize(deserializer).map(AssetRef::new)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<AssetRef, E> {
                Ok(AssetRef::new(v))
            }
        }

        deserializer.deserialize_newtype_struct(ASSET_TOKEN, AssetVisitor)
    }
}

/// A reference to another record, by identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub id: RecordId,
}

impl RecordRef {
    pub fn new(id: RecordId) -> Self {
        RecordRef { id }
    }
}

impl Serialize for RecordRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ns = &self.id.namespace;
        serializer.serialize_newtype_struct(
            REFERENCE_TOKEN,
            &(&self.id.record_name, &ns.zone_name, &ns.owner_name),
        )
    }
}

impl<'de> Deserialize<'de> for RecordRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReferenceVisitor;

        impl<'de> Visitor<'de> for ReferenceVisitor {
            type Value = RecordRef;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a (record name, zone, owner) triple")
            }

            fn visit_newtype_struct<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> Result<RecordRef, D::Error> {
                let (record_name, zone_name, owner_name) =
                    <(String, String, String)>::deserialize(deserializer)?;
                Ok(RecordRef::new(RecordId::new(
                    record_name,
                    Namespace::new(zone_name, owner_name),
                )))
            }
        }

        deserializer.deserialize_newtype_struct(REFERENCE_TOKEN, ReferenceVisitor)
    }
}

/// A single leaf value stored under one flat key.
///
/// # Design Notes
///
/// - Integer widths collapse to the widest representation of their
///   signedness (`Int(i64)` / `UInt(u64)`); floats collapse to `Double`.
///   A homogeneous sequence therefore locks to one deterministic kind no
///   matter which Rust width produced its first element.
/// - `Null` is an out-of-band variant, not a string. `NULL_SENTINEL` is only
///   its rendering for string-only stores.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PrimitiveValue {
    /// Explicit null (distinct from an absent key).
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(Timestamp),
    Location(Location),
    Asset(AssetRef),
    Reference(RecordRef),
    /// Element-type-uniform native array.
    Array(PrimitiveArray),
}

impl PrimitiveValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PrimitiveValue::Null => ValueKind::Null,
            PrimitiveValue::Bool(_) => ValueKind::Bool,
            PrimitiveValue::Int(_) => ValueKind::Int,
            PrimitiveValue::UInt(_) => ValueKind::UInt,
            PrimitiveValue::Double(_) => ValueKind::Double,
            PrimitiveValue::String(_) => ValueKind::String,
            PrimitiveValue::Bytes(_) => ValueKind::Bytes,
            PrimitiveValue::Timestamp(_) => ValueKind::Timestamp,
            PrimitiveValue::Location(_) => ValueKind::Location,
            PrimitiveValue::Asset(_) => ValueKind::Asset,
            PrimitiveValue::Reference(_) => ValueKind::Reference,
            PrimitiveValue::Array(_) => ValueKind::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PrimitiveValue::Null)
    }

    /// True for `Null` and for a string equal to the sentinel literal.
    pub fn is_null_like(&self) -> bool {
        match self {
            PrimitiveValue::Null => true,
            PrimitiveValue::String(s) => s == NULL_SENTINEL,
            _ => false,
        }
    }

    pub fn as_array(&self) -> Option<&PrimitiveArray> {
        match self {
            PrimitiveValue::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Null => f.write_str(NULL_SENTINEL),
            PrimitiveValue::Bool(b) => write!(f, "{}", b),
            PrimitiveValue::Int(i) => write!(f, "{}", i),
            PrimitiveValue::UInt(u) => write!(f, "{}", u),
            PrimitiveValue::Double(d) => write!(f, "{}", d),
            PrimitiveValue::String(s) => write!(f, "{:?}", s),
            PrimitiveValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            PrimitiveValue::Timestamp(t) => write!(f, "@{}ms", t.as_millis()),
            PrimitiveValue::Location(l) => write!(f, "({}, {})", l.latitude, l.longitude),
            PrimitiveValue::Asset(a) => write!(f, "asset:{}", a.locator),
            PrimitiveValue::Reference(r) => write!(f, "ref:{}", r.id),
            PrimitiveValue::Array(a) => write!(f, "[{}; {}]", a.element_kind(), a.len()),
        }
    }
}

/// A native array whose elements all share one `ValueKind`.
///
/// Uniformity is enforced by the representation: each variant holds a
/// `Vec` of exactly one leaf type.
#[derive(Clone, Debug, PartialEq)]
pub enum PrimitiveArray {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Double(Vec<f64>),
    String(Vec<String>),
    Bytes(Vec<Vec<u8>>),
    Timestamp(Vec<Timestamp>),
    Location(Vec<Location>),
    Asset(Vec<AssetRef>),
    Reference(Vec<RecordRef>),
}

impl PrimitiveArray {
    /// An empty array locked to `kind`, or `None` if the kind cannot be an
    /// array element.
    pub fn with_kind(kind: ValueKind) -> Option<Self> {
        let array = match kind {
            ValueKind::Bool => PrimitiveArray::Bool(Vec::new()),
            ValueKind::Int => PrimitiveArray::Int(Vec::new()),
            ValueKind::UInt => PrimitiveArray::UInt(Vec::new()),
            ValueKind::Double => PrimitiveArray::Double(Vec::new()),
            ValueKind::String => PrimitiveArray::String(Vec::new()),
            ValueKind::Bytes => PrimitiveArray::Bytes(Vec::new()),
            ValueKind::Timestamp => PrimitiveArray::Timestamp(Vec::new()),
            ValueKind::Location => PrimitiveArray::Location(Vec::new()),
            ValueKind::Asset => PrimitiveArray::Asset(Vec::new()),
            ValueKind::Reference => PrimitiveArray::Reference(Vec::new()),
            ValueKind::Null | ValueKind::Array => return None,
        };
        Some(array)
    }

    pub fn element_kind(&self) -> ValueKind {
        match self {
            PrimitiveArray::Bool(_) => ValueKind::Bool,
            PrimitiveArray::Int(_) => ValueKind::Int,
            PrimitiveArray::UInt(_) => ValueKind::UInt,
            PrimitiveArray::Double(_) => ValueKind::Double,
            PrimitiveArray::String(_) => ValueKind::String,
            PrimitiveArray::Bytes(_) => ValueKind::Bytes,
            PrimitiveArray::Timestamp(_) => ValueKind::Timestamp,
            PrimitiveArray::Location(_) => ValueKind::Location,
            PrimitiveArray::Asset(_) => ValueKind::Asset,
            PrimitiveArray::Reference(_) => ValueKind::Reference,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PrimitiveArray::Bool(v) => v.len(),
            PrimitiveArray::Int(v) => v.len(),
            PrimitiveArray::UInt(v) => v.len(),
            PrimitiveArray::Double(v) => v.len(),
            PrimitiveArray::String(v) => v.len(),
            PrimitiveArray::Bytes(v) => v.len(),
            PrimitiveArray::Timestamp(v) => v.len(),
            PrimitiveArray::Location(v) => v.len(),
            PrimitiveArray::Asset(v) => v.len(),
            PrimitiveArray::Reference(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value of the locked kind.
    ///
    /// On a kind mismatch the array is left untouched and the rejected value
    /// is handed back.
    pub fn push(&mut self, value: PrimitiveValue) -> Result<(), PrimitiveValue> {
        match (self, value) {
            (PrimitiveArray::Bool(v), PrimitiveValue::Bool(x)) => v.push(x),
            (PrimitiveArray::Int(v), PrimitiveValue::Int(x)) => v.push(x),
            (PrimitiveArray::UInt(v), PrimitiveValue::UInt(x)) => v.push(x),
            (PrimitiveArray::Double(v), PrimitiveValue::Double(x)) => v.push(x),
            (PrimitiveArray::String(v), PrimitiveValue::String(x)) => v.push(x),
            (PrimitiveArray::Bytes(v), PrimitiveValue::Bytes(x)) => v.push(x),
            (PrimitiveArray::Timestamp(v), PrimitiveValue::Timestamp(x)) => v.push(x),
            (PrimitiveArray::Location(v), PrimitiveValue::Location(x)) => v.push(x),
            (PrimitiveArray::Asset(v), PrimitiveValue::Asset(x)) => v.push(x),
            (PrimitiveArray::Reference(v), PrimitiveValue::Reference(x)) => v.push(x),
            (_, rejected) => return Err(rejected),
        }
        Ok(())
    }

    /// Clone out the element at `index`.
    pub fn get(&self, index: usize) -> Option<PrimitiveValue> {
        let value = match self {
            PrimitiveArray::Bool(v) => PrimitiveValue::Bool(*v.get(index)?),
            PrimitiveArray::Int(v) => PrimitiveValue::Int(*v.get(index)?),
            PrimitiveArray::UInt(v) => PrimitiveValue::UInt(*v.get(index)?),
            PrimitiveArray::Double(v) => PrimitiveValue::Double(*v.get(index)?),
            PrimitiveArray::String(v) => PrimitiveValue::String(v.get(index)?.clone()),
            PrimitiveArray::Bytes(v) => PrimitiveValue::Bytes(v.get(index)?.clone()),
            PrimitiveArray::Timestamp(v) => PrimitiveValue::Timestamp(*v.get(index)?),
            PrimitiveArray::Location(v) => PrimitiveValue::Location(*v.get(index)?),
            PrimitiveArray::Asset(v) => PrimitiveValue::Asset(v.get(index)?.clone()),
            PrimitiveArray::Reference(v) => PrimitiveValue::Reference(v.get(index)?.clone()),
        };
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = PrimitiveValue> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

// Conversion from common types

impl From<bool> for PrimitiveValue {
    fn from(v: bool) -> Self {
        PrimitiveValue::Bool(v)
    }
}

impl From<i64> for PrimitiveValue {
    fn from(v: i64) -> Self {
        PrimitiveValue::Int(v)
    }
}

impl From<i32> for PrimitiveValue {
    fn from(v: i32) -> Self {
        PrimitiveValue::Int(v as i64)
    }
}

impl From<u64> for PrimitiveValue {
    fn from(v: u64) -> Self {
        PrimitiveValue::UInt(v)
    }
}

impl From<f64> for PrimitiveValue {
    fn from(v: f64) -> Self {
        PrimitiveValue::Double(v)
    }
}

impl From<String> for PrimitiveValue {
    fn from(v: String) -> Self {
        PrimitiveValue::String(v)
    }
}

impl From<&str> for PrimitiveValue {
    fn from(v: &str) -> Self {
        PrimitiveValue::String(v.to_string())
    }
}

impl From<Timestamp> for PrimitiveValue {
    fn from(v: Timestamp) -> Self {
        PrimitiveValue::Timestamp(v)
    }
}

impl From<PrimitiveArray> for PrimitiveValue {
    fn from(v: PrimitiveArray) -> Self {
        PrimitiveValue::Array(v)
    }
}

impl From<Vec<i64>> for PrimitiveArray {
    fn from(v: Vec<i64>) -> Self {
        PrimitiveArray::Int(v)
    }
}

impl From<Vec<String>> for PrimitiveArray {
    fn from(v: Vec<String>) -> Self {
        PrimitiveArray::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_push_enforces_kind() {
        let mut array = PrimitiveArray::with_kind(ValueKind::Int).unwrap();
        array.push(PrimitiveValue::Int(1)).unwrap();
        array.push(PrimitiveValue::Int(2)).unwrap();

        let rejected = array.push(PrimitiveValue::from("three")).unwrap_err();
        assert_eq!(rejected, PrimitiveValue::from("three"));
        assert_eq!(array, PrimitiveArray::Int(vec![1, 2]));
    }

    #[test]
    fn null_and_nested_arrays_cannot_be_elements() {
        assert!(PrimitiveArray::with_kind(ValueKind::Null).is_none());
        assert!(PrimitiveArray::with_kind(ValueKind::Array).is_none());
        assert!(!ValueKind::Array.is_array_element());
        assert!(ValueKind::Timestamp.is_array_element());
    }

    #[test]
    fn array_get_and_iter() {
        let array = PrimitiveArray::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(array.element_kind(), ValueKind::String);
        assert_eq!(array.get(1), Some(PrimitiveValue::from("b")));
        assert_eq!(array.get(2), None);

        let all: Vec<_> = array.iter().collect();
        assert_eq!(all, vec![PrimitiveValue::from("a"), PrimitiveValue::from("b")]);
    }

    #[test]
    fn null_like_covers_sentinel_literal() {
        assert!(PrimitiveValue::Null.is_null_like());
        assert!(PrimitiveValue::from(NULL_SENTINEL).is_null_like());
        assert!(!PrimitiveValue::from("null").is_null_like());
        assert!(!PrimitiveValue::from(NULL_SENTINEL).is_null());
    }

    #[test]
    fn display_renders_null_as_sentinel() {
        assert_eq!(PrimitiveValue::Null.to_string(), NULL_SENTINEL);
        assert_eq!(
            PrimitiveValue::Array(PrimitiveArray::Int(vec![1, 2, 3])).to_string(),
            "[int; 3]"
        );
    }

    #[test]
    fn special_kinds_are_transparent_in_json() {
        let json = serde_json::to_value(Timestamp::from_millis(1_000)).unwrap();
        assert_eq!(json, serde_json::json!(1000));
        let back: Timestamp = serde_json::from_value(json).unwrap();
        assert_eq!(back.as_millis(), 1_000);

        let json = serde_json::to_value(Location::new(1.5, -2.5)).unwrap();
        assert_eq!(json, serde_json::json!([1.5, -2.5]));
        let back: Location = serde_json::from_value(json).unwrap();
        assert_eq!(back, Location::new(1.5, -2.5));
    }
}
