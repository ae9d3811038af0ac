//! Serde Transcoder for Flat Records
//!
//! This layer flattens any `Serialize` value into a `FlatRecord` (a mapping
//! from underscore-joined keys to `PrimitiveValue`s) and rebuilds it again
//! without a schema. It adds:
//! - `RecordEncoder` / `RecordDecoder`: identity-aware top-level entry points
//! - `to_record` / `from_record`, `to_fields` / `from_fields`: defaults
//! - `TypedFieldReader` / `TypedFieldWriter`: typed access below any key
//! - `RecordSerializer` / `RecordDeserializer`: the serde plumbing itself
//!
//! # Layout
//!
//! | value                         | flat keys                           |
//! |-------------------------------|-------------------------------------|
//! | `{ number: 5 }`               | `number -> 5`                       |
//! | `{ subValue: { number: 10 } }`| `subValue_number -> 10`             |
//! | `{ array: [1, 2, 3] }`        | `array -> [int; 3]` (one key)       |
//! | `{ intDict: {1: "one"} }`     | `intDict_1 -> "one"`                |
//! | `{ items: [{ n: 1 }] }`       | `items_0_n -> 1`                    |
//! | `{ x: None }`                 | `x -> Null`                         |
//!
//! # Example
//!
//! ```rust
//! use flatrecord_serde::{from_record, to_record, Identifiable, PrimitiveValue};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Note {
//!     id: String,
//!     tags: Vec<String>,
//! }
//!
//! impl Identifiable for Note {
//!     type Id = String;
//!     fn id(&self) -> &String {
//!         &self.id
//!     }
//! }
//!
//! let note = Note { id: "n1".into(), tags: vec!["home".into()] };
//! let record = to_record(&note).unwrap();
//! assert_eq!(record.record_type(), "Note");
//! assert_eq!(record.get("id"), Some(&PrimitiveValue::from("n1")));
//!
//! let back: Note = from_record(&record).unwrap();
//! assert_eq!(back, note);
//! ```

mod coder;
mod de;
mod homogeneous;
mod leaf;
mod ser;
mod typed;

pub use coder::{
    from_fields, from_record, shape_name, to_fields, to_record, Identifiable, RecordDecoder,
    RecordEncoder,
};
pub use de::{DecodeConfig, LeafDeserializer, RecordDeserializer, SequenceShape};
pub use homogeneous::{HomogeneousArrayReader, HomogeneousArrayWriter};
pub use ser::{KeyedWriter, MapWriter, RecordSerializer, SequenceWriter};
pub use typed::{TypedFieldReader, TypedFieldWriter};

// Re-export core types for convenience
pub use flatrecord_core::{
    compose, discover_child_segments, AssetRef, Error, FieldStore, FlatRecord, KeyPath, Location,
    Namespace, PrimitiveArray, PrimitiveValue, RecordId, RecordRef, Result, Segment,
    SystemFields, Timestamp, ValueKind, NULL_SENTINEL, ROOT_KEY, SEPARATOR, SUPER_SEGMENT,
};
