//! Top-level entry points: identity derivation, metadata rehydration, and
//! one full encode or decode pass.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::ser::{self, Serialize};
use tracing::debug;

use flatrecord_core::{
    Error, FieldStore, FlatRecord, KeyPath, Namespace, PrimitiveValue, RecordId, Result,
};

use crate::de::{DecodeConfig, RecordDeserializer};
use crate::ser::RecordSerializer;

/// A value with a stable unique identifier. The identifier's `Display`
/// form becomes the record name.
pub trait Identifiable {
    type Id: fmt::Display;

    fn id(&self) -> &Self::Id;
}

/// The short name of `T`: `my_crate::notes::Note<u8>` becomes `Note`.
pub fn shape_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Encodes values into `FlatRecord`s.
#[derive(Clone, Debug, Default)]
pub struct RecordEncoder {
    namespace: Namespace,
}

impl RecordEncoder {
    /// An encoder writing into the default namespace.
    pub fn new() -> Self {
        RecordEncoder::default()
    }

    pub fn with_namespace(namespace: Namespace) -> Self {
        RecordEncoder { namespace }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Encode `value` as a new record whose type tag is the short name of
    /// `T` and whose name is the string form of `value.id()`.
    pub fn encode<T>(&self, value: &T) -> Result<FlatRecord>
    where
        T: Serialize + Identifiable,
    {
        self.encode_as(value, shape_name::<T>())
    }

    /// Encode `value` as a new record with an explicit type tag.
    pub fn encode_as<T>(&self, value: &T, record_type: &str) -> Result<FlatRecord>
    where
        T: Serialize + Identifiable + ?Sized,
    {
        if record_type.is_empty() {
            return Err(<Error as ser::Error>::custom("record type tag is empty"));
        }
        let record_name = value.id().to_string();
        if record_name.is_empty() {
            return Err(<Error as ser::Error>::custom(
                "record identifier renders to an empty string",
            ));
        }

        let id = RecordId::new(record_name, self.namespace.clone());
        let mut record = FlatRecord::new(record_type, id);
        self.encode_into(value, &mut record)?;
        Ok(record)
    }

    /// Encode `value` into the record shell rebuilt from `metadata`, a blob
    /// produced by `FlatRecord::export_system_fields`. Identity and system
    /// fields come from the blob, not from `value`.
    pub fn encode_with_metadata<T>(&self, value: &T, metadata: &[u8]) -> Result<FlatRecord>
    where
        T: Serialize + ?Sized,
    {
        let mut record = FlatRecord::from_system_fields(metadata)?;
        self.encode_into(value, &mut record)?;
        Ok(record)
    }

    /// Write the fields of `value` into an existing record. Returns the
    /// number of keys written.
    pub fn encode_into<T>(&self, value: &T, record: &mut FlatRecord) -> Result<usize>
    where
        T: Serialize + ?Sized,
    {
        let written = value.serialize(RecordSerializer::new(&mut *record, KeyPath::root()))?;
        debug!(
            record_type = record.record_type(),
            id = %record.id(),
            keys = written,
            "encoded record"
        );
        Ok(written)
    }
}

/// Decodes `FlatRecord`s back into values.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordDecoder {
    config: DecodeConfig,
}

impl RecordDecoder {
    pub fn new() -> Self {
        RecordDecoder::default()
    }

    /// Whether a string equal to `NULL_SENTINEL` decodes as null. Defaults
    /// to `true`.
    #[must_use]
    pub fn accept_legacy_null_literal(mut self, accept: bool) -> Self {
        self.config.accept_legacy_null_literal = accept;
        self
    }

    pub fn config(&self) -> DecodeConfig {
        self.config
    }

    pub fn decode<T: DeserializeOwned>(&self, record: &FlatRecord) -> Result<T> {
        let value = self.decode_fields(record)?;
        debug!(
            record_type = record.record_type(),
            id = %record.id(),
            keys = record.len(),
            "decoded record"
        );
        Ok(value)
    }

    /// Decode from any flat store, starting at the root.
    pub fn decode_fields<T, S>(&self, store: &S) -> Result<T>
    where
        T: DeserializeOwned,
        S: FieldStore + ?Sized,
    {
        T::deserialize(RecordDeserializer::new(store, KeyPath::root(), self.config))
    }
}

/// Encode `value` into a new record in the default namespace.
pub fn to_record<T>(value: &T) -> Result<FlatRecord>
where
    T: Serialize + Identifiable,
{
    RecordEncoder::new().encode(value)
}

/// Decode a record with the default options.
pub fn from_record<T: DeserializeOwned>(record: &FlatRecord) -> Result<T> {
    RecordDecoder::new().decode(record)
}

/// Flatten any value into a bare key map. A top-level value without keys
/// of its own (a scalar, a sequence, null) is stored under `ROOT_KEY`.
pub fn to_fields<T>(value: &T) -> Result<BTreeMap<String, PrimitiveValue>>
where
    T: Serialize + ?Sized,
{
    let mut fields = BTreeMap::new();
    value.serialize(RecordSerializer::new(&mut fields, KeyPath::root()))?;
    Ok(fields)
}

/// Rebuild a value from a flat store with the default options.
pub fn from_fields<T, S>(store: &S) -> Result<T>
where
    T: DeserializeOwned,
    S: FieldStore + ?Sized,
{
    RecordDecoder::new().decode_fields(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatrecord_core::{SystemFields, ROOT_KEY};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u32,
        title: String,
    }

    impl Identifiable for Note {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    fn note() -> Note {
        Note {
            id: 7,
            title: "groceries".to_string(),
        }
    }

    #[test]
    fn shape_names_are_short() {
        assert_eq!(shape_name::<Note>(), "Note");
        assert_eq!(shape_name::<Vec<Note>>(), "Vec");
        assert_eq!(shape_name::<u8>(), "u8");
    }

    #[test]
    fn encode_derives_identity() {
        let record = to_record(&note()).unwrap();
        assert_eq!(record.record_type(), "Note");
        assert_eq!(record.id().record_name, "7");
        assert_eq!(record.namespace(), &Namespace::default());
        assert_eq!(record.get("title"), Some(&PrimitiveValue::from("groceries")));
    }

    #[test]
    fn encode_as_and_namespace() {
        let encoder = RecordEncoder::with_namespace(Namespace::zone("Lists"));
        let record = encoder.encode_as(&note(), "ShoppingNote").unwrap();
        assert_eq!(record.record_type(), "ShoppingNote");
        assert_eq!(record.namespace().zone_name, "Lists");

        assert!(encoder.encode_as(&note(), "").is_err());
    }

    #[test]
    fn empty_identifier_is_rejected() {
        struct Nameless;
        impl Serialize for Nameless {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_unit()
            }
        }
        impl Identifiable for Nameless {
            type Id = String;
            fn id(&self) -> &String {
                static EMPTY: String = String::new();
                &EMPTY
            }
        }
        let err = RecordEncoder::new().encode(&Nameless).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn encode_with_metadata_keeps_system_fields() {
        let mut original = to_record(&note()).unwrap();
        original.set_system_fields(SystemFields {
            change_tag: Some("etag-3".to_string()),
            ..SystemFields::default()
        });
        let blob = original.export_system_fields().unwrap();

        let updated = Note {
            id: 7,
            title: "hardware".to_string(),
        };
        let record = RecordEncoder::new()
            .encode_with_metadata(&updated, &blob)
            .unwrap();
        assert_eq!(record.id(), original.id());
        assert_eq!(record.change_tag(), Some("etag-3"));
        assert_eq!(record.get("title"), Some(&PrimitiveValue::from("hardware")));
    }

    #[test]
    fn encode_with_bad_metadata_fails() {
        let err = RecordEncoder::new()
            .encode_with_metadata(&note(), b"{}")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMetadata { .. }));
    }

    #[test]
    fn record_round_trip() {
        let record = to_record(&note()).unwrap();
        let back: Note = from_record(&record).unwrap();
        assert_eq!(back, note());
    }

    #[test]
    fn single_values_use_root_key() {
        let fields = to_fields(&vec![1.5, 2.5]).unwrap();
        assert!(fields.contains_key(ROOT_KEY));
        let back: Vec<f64> = from_fields(&fields).unwrap();
        assert_eq!(back, vec![1.5, 2.5]);

        let fields = to_fields(&None::<String>).unwrap();
        assert_eq!(fields.get(ROOT_KEY), Some(&PrimitiveValue::Null));
        let back: Option<String> = from_fields(&fields).unwrap();
        assert_eq!(back, None);
    }

    #[test]
    fn decoder_options() {
        let decoder = RecordDecoder::new();
        assert!(decoder.config().accept_legacy_null_literal);
        let strict = decoder.accept_legacy_null_literal(false);
        assert!(!strict.config().accept_legacy_null_literal);
    }
}
