//! Leaf-only serializers.
//!
//! `LeafSerializer` reduces a value to exactly one `PrimitiveValue` and
//! refuses anything with structure. It is used to probe sequence elements
//! for the homogeneous fast path. `KeySerializer` renders map keys as key
//! segments.

use serde::de::DeserializeOwned;
use serde::ser::{self, Impossible, Serialize};

use flatrecord_core::{
    AssetRef, Error, Location, Namespace, PrimitiveValue, RecordId, RecordRef, Result, Timestamp,
    ASSET_TOKEN, LOCATION_TOKEN, REFERENCE_TOKEN, TIMESTAMP_TOKEN,
};

/// Convert one of the reserved newtype structs into its leaf kind.
///
/// Returns `Ok(None)` for any other newtype name. The payload is pulled out
/// through `serde_json::Value`, which the special kinds serialize to
/// transparently.
pub(crate) fn special_leaf<T>(name: &'static str, value: &T) -> Result<Option<PrimitiveValue>>
where
    T: ?Sized + Serialize,
{
    let leaf = match name {
        TIMESTAMP_TOKEN => PrimitiveValue::Timestamp(Timestamp::from_millis(payload(value)?)),
        LOCATION_TOKEN => {
            let (latitude, longitude) = payload(value)?;
            PrimitiveValue::Location(Location::new(latitude, longitude))
        }
        ASSET_TOKEN => PrimitiveValue::Asset(AssetRef::new(payload::<String, _>(value)?)),
        REFERENCE_TOKEN => {
            let (record_name, zone_name, owner_name): (String, String, String) = payload(value)?;
            PrimitiveValue::Reference(RecordRef::new(RecordId::new(
                record_name,
                Namespace::new(zone_name, owner_name),
            )))
        }
        _ => return Ok(None),
    };
    Ok(Some(leaf))
}

fn payload<P, T>(value: &T) -> Result<P>
where
    P: DeserializeOwned,
    T: ?Sized + Serialize,
{
    let json = serde_json::to_value(value).map_err(<Error as ser::Error>::custom)?;
    serde_json::from_value(json).map_err(<Error as ser::Error>::custom)
}

fn not_a_leaf(what: &str) -> Error {
    Error::unsupported_shape("", format!("{} cannot be stored as a single leaf", what))
}

/// Serializes a value into a single `PrimitiveValue`.
pub(crate) struct LeafSerializer;

impl ser::Serializer for LeafSerializer {
    type Ok = PrimitiveValue;
    type Error = Error;

    type SerializeSeq = Impossible<PrimitiveValue, Error>;
    type SerializeTuple = Impossible<PrimitiveValue, Error>;
    type SerializeTupleStruct = Impossible<PrimitiveValue, Error>;
    type SerializeTupleVariant = Impossible<PrimitiveValue, Error>;
    type SerializeMap = Impossible<PrimitiveValue, Error>;
    type SerializeStruct = Impossible<PrimitiveValue, Error>;
    type SerializeStructVariant = Impossible<PrimitiveValue, Error>;

    fn serialize_bool(self, v: bool) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::UInt(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::UInt(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::UInt(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::UInt(v))
    }

    fn serialize_f32(self, v: f32) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Double(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Double(v))
    }

    fn serialize_char(self, v: char) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<PrimitiveValue> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<PrimitiveValue> {
        Ok(PrimitiveValue::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<PrimitiveValue> {
        match special_leaf(name, value)? {
            Some(leaf) => Ok(leaf),
            None => value.serialize(self),
        }
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<PrimitiveValue> {
        Err(not_a_leaf("an enum variant with data"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(not_a_leaf("a sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(not_a_leaf("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(not_a_leaf("a tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(not_a_leaf("a tuple variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(not_a_leaf("a map"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(not_a_leaf("a struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(not_a_leaf("a struct variant"))
    }
}

fn not_a_key(what: &str) -> Error {
    Error::unsupported_shape("", format!("{} cannot be used as a map key", what))
}

/// Renders a map key as a key segment.
pub(crate) struct KeySerializer;

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = Impossible<String, Error>;
    type SerializeStruct = Impossible<String, Error>;
    type SerializeStructVariant = Impossible<String, Error>;

    fn serialize_bool(self, v: bool) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(not_a_key("a float"))
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(not_a_key("a float"))
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(not_a_key("a byte string"))
    }

    fn serialize_none(self) -> Result<String> {
        Err(not_a_key("null"))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String> {
        Err(not_a_key("unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Err(not_a_key("a unit struct"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String> {
        Err(not_a_key("an enum variant with data"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(not_a_key("a sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(not_a_key("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(not_a_key("a tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(not_a_key("a tuple variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(not_a_key("a map"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(not_a_key("a struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(not_a_key("a struct variant"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn leaf_widens_integers_and_floats() {
        assert_eq!(7u8.serialize(LeafSerializer).unwrap(), PrimitiveValue::UInt(7));
        assert_eq!((-7i16).serialize(LeafSerializer).unwrap(), PrimitiveValue::Int(-7));
        assert_eq!(1.5f32.serialize(LeafSerializer).unwrap(), PrimitiveValue::Double(1.5));
    }

    #[test]
    fn leaf_rejects_structure() {
        let err = vec![1, 2].serialize(LeafSerializer).unwrap_err();
        assert!(matches!(err, Error::UnsupportedShape { .. }));

        let err = BTreeMap::<String, i32>::new()
            .serialize(LeafSerializer)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedShape { .. }));
    }

    #[test]
    fn leaf_option_unwraps() {
        assert_eq!(Some(3i32).serialize(LeafSerializer).unwrap(), PrimitiveValue::Int(3));
        assert_eq!(None::<i32>.serialize(LeafSerializer).unwrap(), PrimitiveValue::Null);
    }

    #[test]
    fn leaf_recognizes_special_kinds() {
        let stamp = Timestamp::from_millis(42);
        assert_eq!(
            stamp.serialize(LeafSerializer).unwrap(),
            PrimitiveValue::Timestamp(stamp)
        );

        let location = Location::new(48.85, 2.35);
        assert_eq!(
            location.serialize(LeafSerializer).unwrap(),
            PrimitiveValue::Location(location)
        );

        let reference = RecordRef::new(RecordId::new("other", Namespace::default()));
        assert_eq!(
            reference.serialize(LeafSerializer).unwrap(),
            PrimitiveValue::Reference(reference)
        );

        let asset = AssetRef::new("file:///tmp/a.png");
        assert_eq!(
            asset.serialize(LeafSerializer).unwrap(),
            PrimitiveValue::Asset(asset)
        );
    }

    #[test]
    fn keys_render_scalars() {
        assert_eq!(1i32.serialize(KeySerializer).unwrap(), "1");
        assert_eq!("one".serialize(KeySerializer).unwrap(), "one");
        assert_eq!(true.serialize(KeySerializer).unwrap(), "true");
        assert!(matches!(
            (1, 2).serialize(KeySerializer),
            Err(Error::UnsupportedShape { .. })
        ));
    }
}
