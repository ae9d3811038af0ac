//! Readers: reconstruct nested values from a flat store.
//!
//! Decoding has no schema. Each container learns its shape from the keys
//! actually present:
//! - a struct enumerates its declared fields and composes their keys
//! - a map enumerates the child segments discovered under its key
//! - a sequence is either one native array value at its key, or a family of
//!   `key_0`, `key_1`, ... children counted contiguously from zero

use std::str::FromStr;

use serde::de::value::{I64Deserializer, SeqDeserializer, StringDeserializer};
use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use tracing::{trace, warn};

use flatrecord_core::{
    compose, Error, FieldStore, KeyPath, PrimitiveArray, PrimitiveValue, RecordRef, Result,
    Segment, ASSET_TOKEN, LOCATION_TOKEN, NULL_SENTINEL, REFERENCE_TOKEN, TIMESTAMP_TOKEN,
};

use crate::homogeneous::HomogeneousArrayReader;

/// Decoder options.
#[derive(Clone, Copy, Debug)]
pub struct DecodeConfig {
    /// Treat a string equal to `NULL_SENTINEL` as null. Stores that can only
    /// hold strings persist null this way.
    pub accept_legacy_null_literal: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        DecodeConfig {
            accept_legacy_null_literal: true,
        }
    }
}

/// How a sequence is laid out under its key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SequenceShape<'a> {
    /// One native array value stored at the key itself.
    Native(&'a PrimitiveArray),
    /// Elements stored at `key_0 .. key_{len-1}`. An absent key is an
    /// expanded sequence of length zero.
    Expanded { len: usize },
}

fn reference_parts(reference: RecordRef) -> Vec<String> {
    let RecordRef { id } = reference;
    vec![
        id.record_name,
        id.namespace.zone_name,
        id.namespace.owner_name,
    ]
}

/// Deserializes one stored `PrimitiveValue`.
pub struct LeafDeserializer {
    value: PrimitiveValue,
    key: String,
    legacy_null: bool,
}

impl LeafDeserializer {
    pub fn new(value: PrimitiveValue, key: String) -> Self {
        LeafDeserializer {
            value,
            key,
            legacy_null: false,
        }
    }

    fn with_legacy_null(mut self, legacy_null: bool) -> Self {
        self.legacy_null = legacy_null;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn is_null(&self) -> bool {
        match &self.value {
            PrimitiveValue::Null => true,
            PrimitiveValue::String(s) if self.legacy_null && s == NULL_SENTINEL => {
                warn!(key = %self.key, "decoding legacy null literal as null");
                true
            }
            _ => false,
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::type_mismatch(&self.key, expected, self.value.kind())
    }

    fn overflow(&self, expected: &str) -> Error {
        Error::type_mismatch(&self.key, expected, format!("out-of-range {}", self.value))
    }

    fn signed<T: TryFrom<i64>>(&self, expected: &str) -> Result<T> {
        let wide = match self.value {
            PrimitiveValue::Int(i) => i,
            PrimitiveValue::UInt(u) => i64::try_from(u).map_err(|_| self.overflow(expected))?,
            _ => return Err(self.mismatch(expected)),
        };
        T::try_from(wide).map_err(|_| self.overflow(expected))
    }

    fn unsigned<T: TryFrom<u64>>(&self, expected: &str) -> Result<T> {
        let wide = match self.value {
            PrimitiveValue::UInt(u) => u,
            PrimitiveValue::Int(i) => u64::try_from(i).map_err(|_| self.overflow(expected))?,
            _ => return Err(self.mismatch(expected)),
        };
        T::try_from(wide).map_err(|_| self.overflow(expected))
    }

    fn double(&self, expected: &str) -> Result<f64> {
        match self.value {
            PrimitiveValue::Double(d) => Ok(d),
            _ => Err(self.mismatch(expected)),
        }
    }
}

impl<'de> Deserializer<'de> for LeafDeserializer {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            PrimitiveValue::Null => visitor.visit_unit(),
            PrimitiveValue::Bool(b) => visitor.visit_bool(b),
            PrimitiveValue::Int(i) => visitor.visit_i64(i),
            PrimitiveValue::UInt(u) => visitor.visit_u64(u),
            PrimitiveValue::Double(d) => visitor.visit_f64(d),
            PrimitiveValue::String(s) => visitor.visit_string(s),
            PrimitiveValue::Bytes(b) => visitor.visit_byte_buf(b),
            PrimitiveValue::Timestamp(t) => visitor.visit_i64(t.as_millis()),
            PrimitiveValue::Location(l) => {
                SeqDeserializer::<_, Error>::new(vec![l.latitude, l.longitude].into_iter())
                    .deserialize_any(visitor)
            }
            PrimitiveValue::Asset(a) => visitor.visit_string(a.locator),
            PrimitiveValue::Reference(r) => {
                SeqDeserializer::<_, Error>::new(reference_parts(r).into_iter())
                    .deserialize_any(visitor)
            }
            PrimitiveValue::Array(array) => {
                visitor.visit_seq(HomogeneousArrayReader::new(&array, &self.key))
            }
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            PrimitiveValue::Bool(b) => visitor.visit_bool(b),
            _ => Err(self.mismatch("bool")),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i8(self.signed("i8")?)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i16(self.signed("i16")?)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i32(self.signed("i32")?)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i64(self.signed("i64")?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u8(self.unsigned("u8")?)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u16(self.unsigned("u16")?)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u32(self.unsigned("u32")?)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u64(self.unsigned("u64")?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f32(self.double("f32")? as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f64(self.double("f64")?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if let PrimitiveValue::String(s) = &self.value {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return visitor.visit_char(c);
            }
        }
        Err(self.mismatch("char"))
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            PrimitiveValue::String(s) => visitor.visit_string(s),
            _ => Err(self.mismatch("string")),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            PrimitiveValue::Bytes(b) => visitor.visit_byte_buf(b),
            _ => Err(self.mismatch("bytes")),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.is_null() {
            visitor.visit_unit()
        } else {
            Err(self.mismatch("unit"))
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        match (name, self.value) {
            (TIMESTAMP_TOKEN, PrimitiveValue::Timestamp(t)) => {
                let payload: I64Deserializer<Error> = t.as_millis().into_deserializer();
                visitor.visit_newtype_struct(payload)
            }
            (LOCATION_TOKEN, PrimitiveValue::Location(l)) => visitor.visit_newtype_struct(
                SeqDeserializer::<_, Error>::new(vec![l.latitude, l.longitude].into_iter()),
            ),
            (ASSET_TOKEN, PrimitiveValue::Asset(a)) => {
                let payload: StringDeserializer<Error> = a.locator.into_deserializer();
                visitor.visit_newtype_struct(payload)
            }
            (REFERENCE_TOKEN, PrimitiveValue::Reference(r)) => visitor.visit_newtype_struct(
                SeqDeserializer::<_, Error>::new(reference_parts(r).into_iter()),
            ),
            (TIMESTAMP_TOKEN | LOCATION_TOKEN | ASSET_TOKEN | REFERENCE_TOKEN, value) => {
                Err(Error::type_mismatch(&self.key, name, value.kind()))
            }
            (_, value) => visitor.visit_newtype_struct(LeafDeserializer {
                value,
                key: self.key,
                legacy_null: self.legacy_null,
            }),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match &self.value {
            PrimitiveValue::Array(array) => {
                visitor.visit_seq(HomogeneousArrayReader::new(array, &self.key))
            }
            _ => Err(self.mismatch("sequence")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::unsupported_shape(
            &self.key,
            "a map was requested where only a leaf value is stored",
        ))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::unsupported_shape(
            &self.key,
            "a record was requested where only a leaf value is stored",
        ))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.value {
            PrimitiveValue::String(variant) => {
                let variant: StringDeserializer<Error> = variant.into_deserializer();
                visitor.visit_enum(variant)
            }
            _ => Err(self.mismatch("enum variant name")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }
}

/// Deserializes the value rooted at one `KeyPath` of a flat store.
pub struct RecordDeserializer<'a, S: ?Sized> {
    store: &'a S,
    path: KeyPath,
    config: DecodeConfig,
}

impl<'a, S: FieldStore + ?Sized> RecordDeserializer<'a, S> {
    pub fn new(store: &'a S, path: KeyPath, config: DecodeConfig) -> Self {
        RecordDeserializer {
            store,
            path,
            config,
        }
    }

    pub fn key(&self) -> &str {
        self.path.as_str()
    }

    fn child(&self, segment: Segment) -> Self {
        RecordDeserializer {
            store: self.store,
            path: self.path.child(segment),
            config: self.config,
        }
    }

    /// Unkeyed values (leaves, sequences, null) at the root live under
    /// `ROOT_KEY`.
    fn anchored(self) -> Self {
        if self.path.is_root() {
            RecordDeserializer {
                path: KeyPath::root_value(),
                ..self
            }
        } else {
            self
        }
    }

    fn anchored_key(&self) -> String {
        if self.path.is_root() {
            KeyPath::root_value().into_key()
        } else {
            self.key().to_string()
        }
    }

    fn is_null(&self, value: &PrimitiveValue) -> bool {
        match value {
            PrimitiveValue::Null => true,
            PrimitiveValue::String(s)
                if self.config.accept_legacy_null_literal && s == NULL_SENTINEL =>
            {
                warn!(key = %self.key(), "decoding legacy null literal as null");
                true
            }
            _ => false,
        }
    }

    /// Inspect the flat-key layout of the sequence stored at this path.
    pub fn sequence_shape(&self) -> Result<SequenceShape<'a>> {
        let store: &'a S = self.store;
        match store.get(self.key()) {
            Some(PrimitiveValue::Array(array)) => Ok(SequenceShape::Native(array)),
            Some(value) if self.is_null(value) => Ok(SequenceShape::Expanded { len: 0 }),
            Some(value) => Err(Error::type_mismatch(self.key(), "sequence", value.kind())),
            None => {
                let segments = store.child_segments(self.key());
                Ok(SequenceShape::Expanded {
                    len: flatrecord_core::key::contiguous_len(&segments),
                })
            }
        }
    }

    fn into_leaf(self) -> Result<LeafDeserializer> {
        let this = self.anchored();
        match this.store.get(this.key()) {
            Some(value) => Ok(LeafDeserializer::new(value.clone(), this.path.into_key())
                .with_legacy_null(this.config.accept_legacy_null_literal)),
            None if this.store.contains_prefix(this.key()) => Err(Error::type_mismatch(
                this.key(),
                "a leaf value",
                "nested keys",
            )),
            None => Err(Error::missing_key(this.key())),
        }
    }
}

macro_rules! forward_to_leaf {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                let leaf = self.into_leaf()?;
                let key = leaf.key().to_string();
                leaf.$method(visitor).map_err(|e| e.at(&key))
            }
        )*
    };
}

impl<'de, 'a, S: FieldStore + ?Sized> Deserializer<'de> for RecordDeserializer<'a, S> {
    type Error = Error;

    forward_to_leaf! {
        deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_f32 deserialize_f64
        deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf
        deserialize_identifier
    }

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let anchored = self.anchored_key();
        if self.store.get(&anchored).is_some() {
            let leaf = self.into_leaf()?;
            return leaf.deserialize_any(visitor).map_err(|e| e.at(&anchored));
        }
        if self.store.contains_prefix(self.key()) {
            return self.deserialize_map(visitor);
        }
        Err(Error::missing_key(&anchored))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let anchored = self.anchored_key();
        let store = self.store;
        let result = match store.get(&anchored) {
            Some(value) if self.is_null(value) => visitor.visit_none(),
            Some(_) => visitor.visit_some(self),
            None if store.contains_prefix(self.key()) => visitor.visit_some(self),
            None => visitor.visit_none(),
        };
        result.map_err(|e| e.at(&anchored))
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let anchored = self.anchored_key();
        match self.store.get(&anchored) {
            None => visitor.visit_unit(),
            Some(value) if self.is_null(value) => visitor.visit_unit(),
            Some(value) => Err(Error::type_mismatch(&anchored, "unit", value.kind())),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        match name {
            TIMESTAMP_TOKEN | LOCATION_TOKEN | ASSET_TOKEN | REFERENCE_TOKEN => {
                let leaf = self.into_leaf()?;
                let key = leaf.key().to_string();
                leaf.deserialize_newtype_struct(name, visitor)
                    .map_err(|e| e.at(&key))
            }
            _ => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let this = self.anchored();
        let key = this.key().to_string();
        let result = match this.sequence_shape()? {
            SequenceShape::Native(array) => {
                trace!(
                    key = %key,
                    kind = %array.element_kind(),
                    len = array.len(),
                    "native sequence"
                );
                visitor.visit_seq(HomogeneousArrayReader::new(array, &key))
            }
            SequenceShape::Expanded { len } => {
                trace!(key = %key, len, "expanded sequence");
                visitor.visit_seq(ExpandedSeqReader {
                    de: this,
                    index: 0,
                    len,
                })
            }
        };
        result.map_err(|e| e.at(&key))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let key = self.key().to_string();
        let segments: Vec<String> = match self.store.get(&key) {
            Some(value) if self.is_null(value) => Vec::new(),
            Some(value) => return Err(Error::type_mismatch(&key, "map", value.kind())),
            None => self.store.child_segments(&key).into_iter().collect(),
        };
        visitor
            .visit_map(KeyedReader::new(self, segments))
            .map_err(|e| e.at(&key))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let key = self.key().to_string();
        match self.store.get(&key) {
            Some(value) if !self.is_null(value) => {
                return Err(Error::type_mismatch(&key, "struct", value.kind()));
            }
            _ => {}
        }
        let segments = fields.iter().map(|field| field.to_string()).collect();
        visitor
            .visit_map(KeyedReader::new(self, segments))
            .map_err(|e| e.at(&key))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let anchored = self.anchored_key();
        let store = self.store;
        if let Some(value) = store.get(&anchored) {
            return match value {
                PrimitiveValue::String(variant) => {
                    let variant: StringDeserializer<Error> = variant.clone().into_deserializer();
                    visitor.visit_enum(variant).map_err(|e| e.at(&anchored))
                }
                other => Err(Error::type_mismatch(&anchored, "enum variant", other.kind())),
            };
        }

        let key = self.key().to_string();
        let mut segments = self.store.child_segments(&key).into_iter();
        match (segments.next(), segments.next()) {
            (Some(variant), None) => visitor
                .visit_enum(VariantReader { de: self, variant })
                .map_err(|e| e.at(&key)),
            (None, _) => Err(Error::missing_key(&anchored)),
            (Some(_), Some(_)) => Err(Error::type_mismatch(
                &key,
                "a single enum variant",
                "several child keys",
            )),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }
}

/// Enumerates a keyed container: declared struct fields, or discovered map
/// keys.
struct KeyedReader<'a, S: ?Sized> {
    de: RecordDeserializer<'a, S>,
    segments: std::vec::IntoIter<String>,
    current: Option<String>,
}

impl<'a, S: FieldStore + ?Sized> KeyedReader<'a, S> {
    fn new(de: RecordDeserializer<'a, S>, segments: Vec<String>) -> Self {
        KeyedReader {
            de,
            segments: segments.into_iter(),
            current: None,
        }
    }
}

impl<'de, 'a, S: FieldStore + ?Sized> MapAccess<'de> for KeyedReader<'a, S> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        let Some(segment) = self.segments.next() else {
            return Ok(None);
        };
        let key = compose(self.de.key(), &segment);
        let value = seed.deserialize(MapKeyDeserializer {
            segment: segment.clone(),
            key,
        })?;
        self.current = Some(segment);
        Ok(Some(value))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let segment = self
            .current
            .take()
            .ok_or_else(|| <Error as de::Error>::custom("map value requested before its key"))?;
        seed.deserialize(self.de.child(Segment::parse(&segment)))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.segments.len())
    }
}

/// Reads `key_0 .. key_{len-1}`.
struct ExpandedSeqReader<'a, S: ?Sized> {
    de: RecordDeserializer<'a, S>,
    index: usize,
    len: usize,
}

impl<'de, 'a, S: FieldStore + ?Sized> SeqAccess<'de> for ExpandedSeqReader<'a, S> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.index >= self.len {
            return Ok(None);
        }
        let element = self.de.child(Segment::Index(self.index));
        self.index += 1;
        seed.deserialize(element).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len - self.index)
    }
}

/// An enum variant with data, stored under `key_Variant`.
struct VariantReader<'a, S: ?Sized> {
    de: RecordDeserializer<'a, S>,
    variant: String,
}

impl<'de, 'a, S: FieldStore + ?Sized> EnumAccess<'de> for VariantReader<'a, S> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<(T::Value, Self)> {
        let name: StringDeserializer<Error> = self.variant.clone().into_deserializer();
        let value = seed.deserialize(name)?;
        Ok((value, self))
    }
}

impl<'de, 'a, S: FieldStore + ?Sized> VariantAccess<'de> for VariantReader<'a, S> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self.de.child(Segment::parse(&self.variant)))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.de
            .child(Segment::parse(&self.variant))
            .deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.de
            .child(Segment::parse(&self.variant))
            .deserialize_struct("", fields, visitor)
    }
}

/// Deserializes a map key from its key segment.
struct MapKeyDeserializer {
    segment: String,
    key: String,
}

impl MapKeyDeserializer {
    fn parse<T: FromStr>(&self, expected: &str) -> Result<T> {
        self.segment.parse().map_err(|_| {
            Error::type_mismatch(&self.key, expected, format!("key segment {:?}", self.segment))
        })
    }
}

impl<'de> Deserializer<'de> for MapKeyDeserializer {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_string(self.segment)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_bool(self.parse("bool")?)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i8(self.parse("i8")?)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i16(self.parse("i16")?)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i32(self.parse("i32")?)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i64(self.parse("i64")?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u8(self.parse("u8")?)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u16(self.parse("u16")?)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u32(self.parse("u32")?)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u64(self.parse("u64")?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_char(self.parse("char")?)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let variant: StringDeserializer<Error> = self.segment.into_deserializer();
        visitor.visit_enum(variant)
    }

    forward_to_deserialize_any! {
        f32 f64 str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}
