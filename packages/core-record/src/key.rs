//! Key algebra: composing flat keys from nested paths, and recovering the
//! child segments of a path from the live key namespace.
//!
//! A flat key is the separator-joined rendering of a `KeyPath`. Decoding has
//! no schema manifest, so "which children exist under `base`" is answered by
//! scanning keys for the `base_` prefix (`discover_child_segments`).

use std::collections::BTreeSet;
use std::fmt;

/// Separator between key segments.
pub const SEPARATOR: char = '_';

/// Key used for a top-level value that is not keyed (a scalar, sequence,
/// or null). `$` never appears in a Rust field name.
pub const ROOT_KEY: &str = "$value";

/// Segment used for a base-type ("superclass") field.
pub const SUPER_SEGMENT: &str = "super";

/// Compose a child key: `segment` at the root, else `base_segment`.
pub fn compose(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        let mut key = String::with_capacity(base.len() + 1 + segment.len());
        key.push_str(base);
        key.push(SEPARATOR);
        key.push_str(segment);
        key
    }
}

/// The immediate child segment of `key` under `base`, if `key` lies below it.
///
/// At the root (`base` empty) every key that does not start with the
/// separator contributes its first token.
pub fn child_segment<'k>(key: &'k str, base: &str) -> Option<&'k str> {
    let rest = if base.is_empty() {
        if key.starts_with(SEPARATOR) {
            return None;
        }
        key
    } else {
        key.strip_prefix(base)?.strip_prefix(SEPARATOR)?
    };

    let segment = match rest.find(SEPARATOR) {
        Some(end) => &rest[..end],
        None => rest,
    };
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

/// Collect the deduplicated immediate child segments of `base` among `keys`.
///
/// This is a full scan; ordered stores should prefer a range scan (see
/// `FieldStore::child_segments`).
pub fn discover_child_segments<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    base: &str,
) -> BTreeSet<String> {
    keys.into_iter()
        .filter_map(|key| child_segment(key, base))
        .map(str::to_string)
        .collect()
}

/// Number of contiguous sequence indices `0, 1, 2, ...` among `segments`.
pub fn contiguous_len(segments: &BTreeSet<String>) -> usize {
    let mut len = 0;
    while segments.contains(len.to_string().as_str()) {
        len += 1;
    }
    len
}

/// A segment that cannot round-trip through discovery: empty, or containing
/// the separator.
pub fn is_ambiguous_segment(segment: &str) -> bool {
    segment.is_empty() || segment.contains(SEPARATOR)
}

/// One step of a `KeyPath`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Segment {
    /// A named field or map key.
    Field(String),
    /// A sequence index.
    Index(usize),
    /// The base-type field.
    Super,
}

impl Segment {
    /// Classify a raw segment string.
    pub fn parse(raw: &str) -> Segment {
        if raw == SUPER_SEGMENT {
            Segment::Super
        } else if raw.bytes().all(|b| b.is_ascii_digit()) && (raw == "0" || !raw.starts_with('0')) {
            // only canonical indices, so the segment renders back unchanged
            match raw.parse() {
                Ok(index) => Segment::Index(index),
                Err(_) => Segment::Field(raw.to_string()),
            }
        } else {
            Segment::Field(raw.to_string())
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => f.write_str(name),
            Segment::Index(index) => write!(f, "{}", index),
            Segment::Super => f.write_str(SUPER_SEGMENT),
        }
    }
}

/// The location of a value during a recursive encode or decode.
///
/// The rendered flat key is cached alongside the segments, so descending
/// one level costs one `compose`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
    rendered: String,
}

impl KeyPath {
    /// The empty path ("root, no path yet").
    pub fn root() -> Self {
        KeyPath::default()
    }

    /// The path of an unkeyed top-level value.
    pub fn root_value() -> Self {
        KeyPath::root().child(Segment::Field(ROOT_KEY.to_string()))
    }

    /// Build a path from segments, skipping empty ones when rendering.
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        segments
            .into_iter()
            .fold(KeyPath::root(), |path, segment| path.child(segment))
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Descend one level.
    #[must_use]
    pub fn child(&self, segment: Segment) -> KeyPath {
        let raw = segment.to_string();
        let rendered = if raw.is_empty() {
            self.rendered.clone()
        } else {
            compose(&self.rendered, &raw)
        };
        let mut segments = self.segments.clone();
        segments.push(segment);
        KeyPath { segments, rendered }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> KeyPath {
        self.child(Segment::parse(name))
    }

    #[must_use]
    pub fn index(&self, index: usize) -> KeyPath {
        self.child(Segment::Index(index))
    }

    /// The flat key this path renders to.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    pub fn into_key(self) -> String {
        self.rendered
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
