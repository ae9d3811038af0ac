//! Homogeneous collection adapter.
//!
//! A sequence whose first element is a leaf of an array-capable kind is
//! stored as one native `PrimitiveArray` under the sequence's own key. The
//! kind is locked by that first element; every later element must match.

use serde::de::{DeserializeSeed, SeqAccess};
use tracing::trace;

use flatrecord_core::{
    compose, Error, FieldStore, PrimitiveArray, PrimitiveValue, Result, ValueKind,
};

use crate::de::LeafDeserializer;

/// Appends leaves to a native array stored at one key.
#[derive(Debug)]
pub struct HomogeneousArrayWriter {
    key: String,
    kind: ValueKind,
    len: usize,
}

impl HomogeneousArrayWriter {
    /// Lock a writer to the kind of `first`, or `None` if that kind cannot
    /// live in a native array.
    pub fn lock(key: String, first: &PrimitiveValue) -> Option<Self> {
        let kind = first.kind();
        if !kind.is_array_element() {
            return None;
        }
        trace!(key = %key, kind = %kind, "locked homogeneous sequence");
        Some(HomogeneousArrayWriter { key, kind, len: 0 })
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `value` and leave the store holding every element appended so
    /// far. A mismatched element leaves the stored array as it was.
    pub fn append<S>(&mut self, store: &mut S, value: PrimitiveValue) -> Result<()>
    where
        S: FieldStore + ?Sized,
    {
        let found = value.kind();
        if found != self.kind {
            return Err(self.mismatch(found));
        }

        if self.len > 0 {
            if let Some(PrimitiveValue::Array(array)) = store.get_mut(&self.key) {
                array.push(value).map_err(|rejected| self.mismatch(rejected.kind()))?;
                self.len += 1;
                return Ok(());
            }
        }

        // First element, or the array went missing underneath us: start over
        // from this element.
        let mut array = PrimitiveArray::with_kind(self.kind)
            .ok_or_else(|| self.mismatch(found))?;
        array.push(value).map_err(|rejected| self.mismatch(rejected.kind()))?;
        store.set(self.key.clone(), PrimitiveValue::Array(array));
        self.len = 1;
        Ok(())
    }

    /// Reject an element that is not a leaf at all.
    pub fn reject_nested(&self) -> Error {
        Error::HeterogeneousSequence {
            key: self.key.clone(),
            locked: self.kind,
            found: "nested container".to_string(),
        }
    }

    fn mismatch(&self, found: ValueKind) -> Error {
        Error::HeterogeneousSequence {
            key: self.key.clone(),
            locked: self.kind,
            found: found.to_string(),
        }
    }
}

/// Reads the elements of a native array as a sequence.
pub struct HomogeneousArrayReader<'a> {
    array: &'a PrimitiveArray,
    key: &'a str,
    index: usize,
}

impl<'a> HomogeneousArrayReader<'a> {
    pub fn new(array: &'a PrimitiveArray, key: &'a str) -> Self {
        HomogeneousArrayReader {
            array,
            key,
            index: 0,
        }
    }
}

impl<'de, 'a> SeqAccess<'de> for HomogeneousArrayReader<'a> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        let Some(value) = self.array.get(self.index) else {
            return Ok(None);
        };
        let key = compose(self.key, &self.index.to_string());
        self.index += 1;
        seed.deserialize(LeafDeserializer::new(value, key)).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.array.len().saturating_sub(self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn appends_rewrite_one_key() {
        let mut store = BTreeMap::new();
        let first = PrimitiveValue::Int(1);
        let mut writer = HomogeneousArrayWriter::lock("array".to_string(), &first).unwrap();

        writer.append(&mut store, first).unwrap();
        writer.append(&mut store, PrimitiveValue::Int(2)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("array"),
            Some(&PrimitiveValue::Array(PrimitiveArray::Int(vec![1, 2])))
        );
        assert_eq!(writer.len(), 2);
    }

    #[test]
    fn mismatch_keeps_prior_elements() {
        let mut store = BTreeMap::new();
        let first = PrimitiveValue::from("a");
        let mut writer = HomogeneousArrayWriter::lock("names".to_string(), &first).unwrap();
        writer.append(&mut store, first).unwrap();

        let err = writer.append(&mut store, PrimitiveValue::Int(2)).unwrap_err();
        assert!(matches!(
            err,
            Error::HeterogeneousSequence {
                ref key,
                locked: ValueKind::String,
                ..
            } if key == "names"
        ));
        assert_eq!(
            store.get("names"),
            Some(&PrimitiveValue::Array(PrimitiveArray::String(vec!["a".to_string()])))
        );
    }

    #[test]
    fn null_cannot_lock() {
        assert!(HomogeneousArrayWriter::lock("x".to_string(), &PrimitiveValue::Null).is_none());
    }

    #[test]
    fn reader_yields_elements_in_order() {
        let array = PrimitiveArray::Int(vec![4, 5, 6]);
        let mut reader = HomogeneousArrayReader::new(&array, "array");
        assert_eq!(SeqAccess::size_hint(&reader), Some(3));

        let mut out = Vec::new();
        while let Some(v) = reader.next_element::<i32>().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![4, 5, 6]);
    }
}
