//! Typed read and write extension traits for flat stores.

use serde::de::DeserializeOwned;
use serde::Serialize;

use flatrecord_core::{FieldStore, KeyPath, Result};

use crate::de::{DecodeConfig, RecordDeserializer};
use crate::ser::RecordSerializer;

fn base_path(base: &str) -> KeyPath {
    if base.is_empty() {
        KeyPath::root()
    } else {
        KeyPath::root().field(base)
    }
}

/// Extension trait for typed reads.
///
/// Implemented for every `FieldStore`. `base` is a flat key prefix; the
/// empty string reads from the root.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use flatrecord_serde::{PrimitiveValue, TypedFieldReader};
///
/// let mut store = BTreeMap::new();
/// store.insert("settings_volume".to_string(), PrimitiveValue::Int(7));
///
/// let volume: i64 = store.read_as("settings_volume").unwrap();
/// assert_eq!(volume, 7);
/// ```
pub trait TypedFieldReader: FieldStore {
    fn read_as<T: DeserializeOwned>(&self, base: &str) -> Result<T> {
        self.read_as_with(base, DecodeConfig::default())
    }

    fn read_as_with<T: DeserializeOwned>(&self, base: &str, config: DecodeConfig) -> Result<T> {
        T::deserialize(RecordDeserializer::new(self, base_path(base), config))
    }
}

impl<S: FieldStore + ?Sized> TypedFieldReader for S {}

/// Extension trait for typed writes.
///
/// Implemented for every `FieldStore`. Writes never clear keys left over
/// from an earlier value at the same base.
pub trait TypedFieldWriter: FieldStore {
    /// Flatten `value` below `base`. Returns the number of keys written.
    fn write_as<T: Serialize + ?Sized>(&mut self, base: &str, value: &T) -> Result<usize> {
        value.serialize(RecordSerializer::new(self, base_path(base)))
    }
}

impl<S: FieldStore + ?Sized> TypedFieldWriter for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use flatrecord_core::PrimitiveValue;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Settings {
        volume: u8,
        muted: bool,
    }

    #[test]
    fn write_then_read_below_a_base() {
        let mut store: BTreeMap<String, PrimitiveValue> = BTreeMap::new();
        let settings = Settings {
            volume: 3,
            muted: true,
        };
        let written = store.write_as("settings", &settings).unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.get("settings_volume"), Some(&PrimitiveValue::UInt(3)));

        let back: Settings = store.read_as("settings").unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn read_from_root() {
        let mut store: BTreeMap<String, PrimitiveValue> = BTreeMap::new();
        store.write_as("", &Settings { volume: 1, muted: false }).unwrap();
        assert!(store.contains_key("volume"));
        let back: Settings = store.read_as("").unwrap();
        assert_eq!(back.volume, 1);
    }
}
