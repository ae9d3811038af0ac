//! Writers: flatten a serializable value into a flat store.
//!
//! Every serializer here returns the number of keys it wrote. Containers
//! whose children are found by key discovery (maps, expanded sequences,
//! enum variants with data) store a `Null` placeholder for a child that
//! wrote nothing, so the child is still discovered on decode.

use std::cell::Cell;

use serde::ser::{self, Serialize};
use tracing::trace;

use flatrecord_core::key::is_ambiguous_segment;
use flatrecord_core::{Error, FieldStore, KeyPath, PrimitiveValue, Result, Segment, SEPARATOR};

use crate::homogeneous::HomogeneousArrayWriter;
use crate::leaf::{special_leaf, KeySerializer, LeafSerializer};

/// How the children of a written value are found again on decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lookup {
    /// A leaf at the value's own key, or declared struct fields.
    Exact,
    /// Any child segment: maps and enum variants with data.
    Segments,
    /// Contiguous index segments: expanded sequences.
    Indices,
}

impl Lookup {
    /// Whether decoding a value stored at `owner` would also discover the
    /// keys of the sibling field `sibling`.
    fn reaches(self, owner: &str, sibling: &str) -> bool {
        let Some(rest) = sibling
            .strip_prefix(owner)
            .and_then(|rest| rest.strip_prefix(SEPARATOR))
        else {
            return false;
        };
        match self {
            Lookup::Exact => false,
            Lookup::Segments => true,
            Lookup::Indices => {
                let first = rest.split(SEPARATOR).next().unwrap_or_default();
                matches!(Segment::parse(first), Segment::Index(_))
            }
        }
    }
}

/// Serializes a value into the store at one `KeyPath`.
pub struct RecordSerializer<'a, S: ?Sized> {
    store: &'a mut S,
    path: KeyPath,
    lookup: Option<&'a Cell<Lookup>>,
}

impl<'a, S: FieldStore + ?Sized> RecordSerializer<'a, S> {
    pub fn new(store: &'a mut S, path: KeyPath) -> Self {
        RecordSerializer {
            store,
            path,
            lookup: None,
        }
    }

    /// Like `new`, but reports the layout of the written value to `lookup`.
    fn observed(store: &'a mut S, path: KeyPath, lookup: &'a Cell<Lookup>) -> Self {
        RecordSerializer {
            store,
            path,
            lookup: Some(lookup),
        }
    }

    fn observe(&self, lookup: Lookup) {
        if let Some(cell) = self.lookup {
            cell.set(lookup);
        }
    }

    /// Unkeyed values (leaves, sequences, null) at the root go under
    /// `ROOT_KEY`.
    fn anchored_path(&self) -> KeyPath {
        if self.path.is_root() {
            KeyPath::root_value()
        } else {
            self.path.clone()
        }
    }

    fn put(self, value: PrimitiveValue) -> Result<usize> {
        let key = self.anchored_path().into_key();
        trace!(key = %key, kind = %value.kind(), "set");
        self.store.set(key, value);
        Ok(1)
    }

    fn variant_path(&self, variant: &'static str) -> Result<KeyPath> {
        if is_ambiguous_segment(variant) {
            return Err(Error::unsupported_shape(
                self.path.as_str(),
                format!("variant name {:?} cannot be used as a key segment", variant),
            ));
        }
        Ok(self.path.child(Segment::Field(variant.to_string())))
    }
}

fn placeholder<S: FieldStore + ?Sized>(store: &mut S, path: &KeyPath, written: usize) -> usize {
    if written == 0 {
        store.set(path.as_str().to_string(), PrimitiveValue::Null);
        1
    } else {
        written
    }
}

impl<'a, S: FieldStore + ?Sized> ser::Serializer for RecordSerializer<'a, S> {
    type Ok = usize;
    type Error = Error;

    type SerializeSeq = SequenceWriter<'a, S>;
    type SerializeTuple = SequenceWriter<'a, S>;
    type SerializeTupleStruct = SequenceWriter<'a, S>;
    type SerializeTupleVariant = SequenceWriter<'a, S>;
    type SerializeMap = MapWriter<'a, S>;
    type SerializeStruct = KeyedWriter<'a, S>;
    type SerializeStructVariant = KeyedWriter<'a, S>;

    fn serialize_bool(self, v: bool) -> Result<usize> {
        self.put(PrimitiveValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<usize> {
        self.put(PrimitiveValue::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<usize> {
        self.put(PrimitiveValue::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<usize> {
        self.put(PrimitiveValue::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<usize> {
        self.put(PrimitiveValue::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<usize> {
        self.put(PrimitiveValue::UInt(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<usize> {
        self.put(PrimitiveValue::UInt(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<usize> {
        self.put(PrimitiveValue::UInt(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<usize> {
        self.put(PrimitiveValue::UInt(v))
    }

    fn serialize_f32(self, v: f32) -> Result<usize> {
        self.put(PrimitiveValue::Double(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<usize> {
        self.put(PrimitiveValue::Double(v))
    }

    fn serialize_char(self, v: char) -> Result<usize> {
        self.put(PrimitiveValue::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<usize> {
        self.put(PrimitiveValue::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<usize> {
        self.put(PrimitiveValue::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<usize> {
        self.put(PrimitiveValue::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<usize> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<usize> {
        self.put(PrimitiveValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<usize> {
        self.put(PrimitiveValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<usize> {
        self.put(PrimitiveValue::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<usize> {
        let special = special_leaf(name, value)
            .map_err(|e| e.at(self.anchored_path().as_str()))?;
        match special {
            Some(leaf) => self.put(leaf),
            None => value.serialize(self),
        }
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<usize> {
        self.observe(Lookup::Segments);
        let path = self.variant_path(variant)?;
        let written = value
            .serialize(RecordSerializer::new(&mut *self.store, path.clone()))
            .map_err(|e| e.at(path.as_str()))?;
        Ok(placeholder(self.store, &path, written))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        let path = self.anchored_path();
        self.observe(Lookup::Indices);
        Ok(SequenceWriter::new(self.store, path, false, self.lookup))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.observe(Lookup::Segments);
        let path = self.variant_path(variant)?;
        Ok(SequenceWriter::new(self.store, path, true, None))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.observe(Lookup::Segments);
        Ok(MapWriter {
            store: self.store,
            path: self.path,
            pending: None,
            written: 0,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(KeyedWriter {
            store: self.store,
            path: self.path,
            fields: Vec::new(),
            written: 0,
            placeholder: false,
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.observe(Lookup::Segments);
        let path = self.variant_path(variant)?;
        Ok(KeyedWriter {
            store: self.store,
            path,
            fields: Vec::new(),
            written: 0,
            placeholder: true,
        })
    }
}

/// Writes struct fields at `path_field`.
///
/// A field whose children are found by discovery (a map, an enum variant
/// with data, an expanded sequence) must not share its key prefix with a
/// sibling field, or decoding it would pick up the sibling's keys.
pub struct KeyedWriter<'a, S: ?Sized> {
    store: &'a mut S,
    path: KeyPath,
    fields: Vec<(&'static str, Lookup)>,
    written: usize,
    placeholder: bool,
}

impl<'a, S: FieldStore + ?Sized> KeyedWriter<'a, S> {
    fn field<T: ?Sized + Serialize>(&mut self, name: &'static str, value: &T) -> Result<()> {
        let path = self.path.field(name);
        let key = path.as_str().to_string();
        let lookup = Cell::new(Lookup::Exact);
        self.written += value
            .serialize(RecordSerializer::observed(&mut *self.store, path, &lookup))
            .map_err(|e| e.at(&key))?;
        let lookup = lookup.get();

        for &(sibling, sibling_lookup) in &self.fields {
            let (owner, other) = if lookup.reaches(name, sibling) {
                (name, sibling)
            } else if sibling_lookup.reaches(sibling, name) {
                (sibling, name)
            } else {
                continue;
            };
            return Err(Error::unsupported_shape(
                self.path.field(owner).as_str(),
                format!(
                    "field {:?} would discover the keys of sibling field {:?}",
                    owner, other
                ),
            ));
        }
        self.fields.push((name, lookup));
        Ok(())
    }

    fn finish(self) -> Result<usize> {
        if self.placeholder {
            Ok(placeholder(self.store, &self.path, self.written))
        } else {
            Ok(self.written)
        }
    }
}

impl<'a, S: FieldStore + ?Sized> ser::SerializeStruct for KeyedWriter<'a, S> {
    type Ok = usize;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<usize> {
        self.finish()
    }
}

impl<'a, S: FieldStore + ?Sized> ser::SerializeStructVariant for KeyedWriter<'a, S> {
    type Ok = usize;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<usize> {
        self.finish()
    }
}

/// Writes map entries at `path_key`. Keys must render to unambiguous
/// segments so they can be discovered again.
pub struct MapWriter<'a, S: ?Sized> {
    store: &'a mut S,
    path: KeyPath,
    pending: Option<String>,
    written: usize,
}

impl<'a, S: FieldStore + ?Sized> ser::SerializeMap for MapWriter<'a, S> {
    type Ok = usize;
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        let segment = key
            .serialize(KeySerializer)
            .map_err(|e| e.at(self.path.as_str()))?;
        if is_ambiguous_segment(&segment) {
            return Err(Error::unsupported_shape(
                self.path.as_str(),
                format!(
                    "map key {:?} is empty or contains the key separator",
                    segment
                ),
            ));
        }
        self.pending = Some(segment);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let segment = self
            .pending
            .take()
            .ok_or_else(|| <Error as ser::Error>::custom("map value serialized before its key"))?;
        let path = self.path.child(Segment::parse(&segment));
        let written = value
            .serialize(RecordSerializer::new(&mut *self.store, path.clone()))
            .map_err(|e| e.at(path.as_str()))?;
        self.written += placeholder(&mut *self.store, &path, written);
        Ok(())
    }

    fn end(self) -> Result<usize> {
        Ok(self.written)
    }
}

enum SequenceMode {
    /// No element seen yet.
    Pending,
    /// Native array at the sequence key, kind locked by the first element.
    Homogeneous(HomogeneousArrayWriter),
    /// One child per element at `key_index`.
    Expanded,
}

/// Writes a sequence. The first element picks the layout: a leaf of an
/// array-capable kind selects the native array, anything else (a nested
/// container, or null) expands the sequence into indexed children.
pub struct SequenceWriter<'a, S: ?Sized> {
    store: &'a mut S,
    path: KeyPath,
    lookup: Option<&'a Cell<Lookup>>,
    mode: SequenceMode,
    index: usize,
    written: usize,
    placeholder: bool,
}

impl<'a, S: FieldStore + ?Sized> SequenceWriter<'a, S> {
    fn new(
        store: &'a mut S,
        path: KeyPath,
        placeholder: bool,
        lookup: Option<&'a Cell<Lookup>>,
    ) -> Self {
        SequenceWriter {
            store,
            path,
            lookup,
            mode: SequenceMode::Pending,
            index: 0,
            written: 0,
            placeholder,
        }
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let index = self.index;
        self.index += 1;

        if let SequenceMode::Homogeneous(writer) = &mut self.mode {
            let leaf = match value.serialize(LeafSerializer) {
                Ok(leaf) => leaf,
                Err(Error::UnsupportedShape { .. }) => return Err(writer.reject_nested()),
                Err(e) => return Err(e.at(self.path.index(index).as_str())),
            };
            return writer.append(&mut *self.store, leaf);
        }

        if let SequenceMode::Expanded = self.mode {
            return self.expanded(index, value);
        }

        match value.serialize(LeafSerializer) {
            Ok(leaf) => match HomogeneousArrayWriter::lock(self.path.as_str().to_string(), &leaf) {
                Some(mut writer) => {
                    writer.append(&mut *self.store, leaf)?;
                    self.written = 1;
                    self.mode = SequenceMode::Homogeneous(writer);
                    if let Some(cell) = self.lookup {
                        cell.set(Lookup::Exact);
                    }
                    Ok(())
                }
                None => {
                    trace!(key = %self.path, "sequence starts with null, expanding");
                    self.mode = SequenceMode::Expanded;
                    self.expanded(index, value)
                }
            },
            Err(Error::UnsupportedShape { .. }) => {
                trace!(key = %self.path, "sequence of nested values, expanding");
                self.mode = SequenceMode::Expanded;
                self.expanded(index, value)
            }
            Err(e) => Err(e.at(self.path.index(index).as_str())),
        }
    }

    fn expanded<T: ?Sized + Serialize>(&mut self, index: usize, value: &T) -> Result<()> {
        let path = self.path.index(index);
        let written = value
            .serialize(RecordSerializer::new(&mut *self.store, path.clone()))
            .map_err(|e| e.at(path.as_str()))?;
        self.written += placeholder(&mut *self.store, &path, written);
        Ok(())
    }

    fn finish(self) -> Result<usize> {
        if self.placeholder {
            Ok(placeholder(self.store, &self.path, self.written))
        } else {
            Ok(self.written)
        }
    }
}

impl<'a, S: FieldStore + ?Sized> ser::SerializeSeq for SequenceWriter<'a, S> {
    type Ok = usize;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<usize> {
        self.finish()
    }
}

impl<'a, S: FieldStore + ?Sized> ser::SerializeTuple for SequenceWriter<'a, S> {
    type Ok = usize;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<usize> {
        self.finish()
    }
}

impl<'a, S: FieldStore + ?Sized> ser::SerializeTupleStruct for SequenceWriter<'a, S> {
    type Ok = usize;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<usize> {
        self.finish()
    }
}

impl<'a, S: FieldStore + ?Sized> ser::SerializeTupleVariant for SequenceWriter<'a, S> {
    type Ok = usize;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<usize> {
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection_literals::btree;
    use flatrecord_core::{PrimitiveArray, ValueKind, ROOT_KEY};
    use serde::Serialize;
    use std::collections::BTreeMap;

    fn flatten<T: Serialize>(value: &T) -> Result<BTreeMap<String, PrimitiveValue>> {
        let mut store = BTreeMap::new();
        value.serialize(RecordSerializer::new(&mut store, KeyPath::root()))?;
        Ok(store)
    }

    #[derive(Serialize)]
    struct Sub {
        number: i32,
        name: String,
    }

    #[derive(Serialize)]
    struct Outer {
        number: i32,
        #[serde(rename = "subValue")]
        sub_value: Sub,
    }

    #[test]
    fn nested_struct_keys_compose() {
        let store = flatten(&Outer {
            number: 5,
            sub_value: Sub {
                number: 10,
                name: "else".to_string(),
            },
        })
        .unwrap();
        assert_eq!(
            store,
            btree! {
                "number".to_string() => PrimitiveValue::Int(5),
                "subValue_number".to_string() => PrimitiveValue::Int(10),
                "subValue_name".to_string() => PrimitiveValue::from("else"),
            }
        );
    }

    #[test]
    fn top_level_scalar_uses_root_key() {
        let store = flatten(&42u16).unwrap();
        assert_eq!(store.get(ROOT_KEY), Some(&PrimitiveValue::UInt(42)));
    }

    #[test]
    fn leaf_sequence_is_one_native_array() {
        let store = flatten(&btree! { "array" => vec![1, 2, 3, 4] }).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("array"),
            Some(&PrimitiveValue::Array(PrimitiveArray::Int(vec![1, 2, 3, 4])))
        );
    }

    #[test]
    fn sequence_of_structs_expands() {
        let items = vec![
            Sub {
                number: 1,
                name: "a".to_string(),
            },
            Sub {
                number: 2,
                name: "b".to_string(),
            },
        ];
        let store = flatten(&btree! { "items" => items }).unwrap();
        assert_eq!(store.get("items_0_number"), Some(&PrimitiveValue::Int(1)));
        assert_eq!(store.get("items_1_name"), Some(&PrimitiveValue::from("b")));
        assert!(store.get("items").is_none());
    }

    #[test]
    fn mixed_sequence_is_rejected() {
        #[derive(Serialize)]
        #[serde(untagged)]
        enum Loose {
            Number(i64),
            Text(String),
        }
        let values = vec![Loose::Number(1), Loose::Text("two".to_string())];
        let err = flatten(&btree! { "array" => values }).unwrap_err();
        assert!(matches!(
            err,
            Error::HeterogeneousSequence { ref key, locked: ValueKind::Int, .. } if key == "array"
        ));
    }

    #[test]
    fn null_first_element_expands() {
        let store = flatten(&btree! { "maybe" => vec![None, Some(3)] }).unwrap();
        assert_eq!(store.get("maybe_0"), Some(&PrimitiveValue::Null));
        assert_eq!(store.get("maybe_1"), Some(&PrimitiveValue::Int(3)));
    }

    #[test]
    fn empty_children_get_placeholders() {
        let value: BTreeMap<String, Vec<i32>> = btree! {
            "empty".to_string() => vec![],
            "full".to_string() => vec![1],
        };
        let store = flatten(&btree! { "lists" => value }).unwrap();
        assert_eq!(store.get("lists_empty"), Some(&PrimitiveValue::Null));
        assert_eq!(
            store.get("lists_full"),
            Some(&PrimitiveValue::Array(PrimitiveArray::Int(vec![1])))
        );

        let store = flatten(&btree! { "list" => Vec::<i32>::new() }).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn ambiguous_map_keys_are_rejected() {
        let err = flatten(&btree! { "dict" => btree! { "two_words" => 1 } }).unwrap_err();
        assert!(matches!(err, Error::UnsupportedShape { ref key, .. } if key == "dict"));

        let err = flatten(&btree! { "dict" => btree! { "" => 1 } }).unwrap_err();
        assert!(matches!(err, Error::UnsupportedShape { .. }));
    }

    #[test]
    fn enum_layouts() {
        #[derive(Serialize)]
        enum Shape {
            Empty,
            Circle(f64),
            Rect { w: u32, h: u32 },
        }
        let store = flatten(&btree! {
            "a" => Shape::Empty,
            "b" => Shape::Circle(1.5),
            "c" => Shape::Rect { w: 2, h: 3 },
        })
        .unwrap();
        assert_eq!(store.get("a"), Some(&PrimitiveValue::from("Empty")));
        assert_eq!(store.get("b_Circle"), Some(&PrimitiveValue::Double(1.5)));
        assert_eq!(store.get("c_Rect_w"), Some(&PrimitiveValue::UInt(2)));
        assert_eq!(store.get("c_Rect_h"), Some(&PrimitiveValue::UInt(3)));
    }

    #[test]
    fn null_after_leaf_is_rejected() {
        let err = flatten(&btree! { "xs" => vec![Some(1), None, Some(3)] }).unwrap_err();
        assert!(matches!(
            err,
            Error::HeterogeneousSequence { ref key, locked: ValueKind::Int, ref found }
                if key == "xs" && found == "null"
        ));
    }

    #[derive(Serialize)]
    struct Inventory {
        tags: BTreeMap<String, i32>,
        tags_count: i32,
    }

    #[derive(Serialize)]
    struct CountFirst {
        tags_count: i32,
        tags: BTreeMap<String, i32>,
    }

    #[test]
    fn map_field_sharing_a_sibling_prefix_is_rejected() {
        let err = flatten(&Inventory {
            tags: btree! { "red".to_string() => 1 },
            tags_count: 1,
        })
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedShape { ref key, .. } if key == "tags"));

        let err = flatten(&CountFirst {
            tags_count: 0,
            tags: BTreeMap::new(),
        })
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedShape { ref key, .. } if key == "tags"));
    }

    #[test]
    fn data_variant_sharing_a_sibling_prefix_is_rejected() {
        #[derive(Serialize)]
        enum Status {
            Open,
            Assigned(u32),
        }

        #[derive(Serialize)]
        struct Ticket {
            status: Status,
            status_note: String,
        }

        let err = flatten(&Ticket {
            status: Status::Assigned(2),
            status_note: "x".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedShape { ref key, .. } if key == "status"));

        let store = flatten(&Ticket {
            status: Status::Open,
            status_note: "x".to_string(),
        })
        .unwrap();
        assert_eq!(store.get("status"), Some(&PrimitiveValue::from("Open")));
    }

    #[test]
    fn exact_fields_may_share_a_prefix() {
        #[derive(Serialize)]
        struct Summary {
            name: String,
            name_len: usize,
            items: Vec<i32>,
            items_total: i32,
            rows: Vec<Sub>,
            rows_seen: bool,
        }

        let store = flatten(&Summary {
            name: "abc".to_string(),
            name_len: 3,
            items: vec![1, 2],
            items_total: 3,
            rows: vec![Sub {
                number: 1,
                name: "a".to_string(),
            }],
            rows_seen: true,
        })
        .unwrap();
        assert_eq!(store.get("name_len"), Some(&PrimitiveValue::UInt(3)));
        assert_eq!(
            store.get("items").and_then(PrimitiveValue::as_array),
            Some(&PrimitiveArray::Int(vec![1, 2]))
        );
        assert_eq!(store.get("rows_0_number"), Some(&PrimitiveValue::Int(1)));
    }

    #[test]
    fn expanded_sequence_next_to_an_indexed_sibling_is_rejected() {
        #[derive(Serialize)]
        struct Pages {
            page: Vec<Sub>,
            page_0: i32,
        }

        let err = flatten(&Pages {
            page: vec![],
            page_0: 7,
        })
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedShape { ref key, .. } if key == "page"));
    }
}
