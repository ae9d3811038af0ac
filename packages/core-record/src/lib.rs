//! Flat Record Model
//!
//! This layer describes the storage side of the transcoder: a record that
//! only understands flat string keys and a handful of leaf kinds.
//! - `PrimitiveValue`: the closed set of leaf kinds, including one
//!   homogeneous native array kind
//! - Key algebra: `compose`, `KeyPath`, `discover_child_segments`
//! - `FieldStore`: the narrow store contract the transcoder consumes
//! - `FlatRecord`: identity + fields, with opaque metadata export/import
//!
//! # Example
//!
//! ```rust
//! use flatrecord_core::{FieldStore, FlatRecord, Namespace, PrimitiveValue, RecordId};
//!
//! let mut record = FlatRecord::new("Note", RecordId::new("n1", Namespace::default()));
//! record.set("subValue_number", 10i64);
//! record.set("subValue_name", "else");
//!
//! let children = record.child_segments("subValue");
//! assert!(children.contains("number"));
//! assert!(children.contains("name"));
//! ```

pub use bytes::Bytes;

mod error;
pub mod key;
mod record;
mod traits;
mod value;

pub use error::{Error, Result};
pub use key::{
    compose, discover_child_segments, KeyPath, Segment, ROOT_KEY, SEPARATOR, SUPER_SEGMENT,
};
pub use record::{FlatRecord, Namespace, RecordId, SystemFields, DEFAULT_OWNER, DEFAULT_ZONE};
pub use traits::FieldStore;
pub use value::{
    AssetRef, Location, PrimitiveArray, PrimitiveValue, RecordRef, Timestamp, ValueKind,
    ASSET_TOKEN, LOCATION_TOKEN, NULL_SENTINEL, REFERENCE_TOKEN, TIMESTAMP_TOKEN,
};
