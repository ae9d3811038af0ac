//! The flat store contract consumed by the transcoder.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::key::{child_segment, discover_child_segments, SEPARATOR};
use crate::value::PrimitiveValue;

/// A mapping from flat string keys to `PrimitiveValue`s.
///
/// This is everything the encoder and decoder need from a backing store:
/// point reads and writes, and a way to enumerate keys so that child
/// segments can be discovered without a schema.
///
/// No internal locking is implied. Two passes must not share one store
/// mutably; `&mut` enforces that.
pub trait FieldStore {
    /// Read the value stored at `key`.
    fn get(&self, key: &str) -> Option<&PrimitiveValue>;

    /// Mutable access to the value stored at `key`.
    fn get_mut(&mut self, key: &str) -> Option<&mut PrimitiveValue>;

    /// Store `value` at `key`, replacing any previous value.
    fn set(&mut self, key: String, value: PrimitiveValue);

    /// Every key currently stored.
    fn keys(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    /// Deduplicated immediate child segments of `base`.
    ///
    /// The default scans every key, which is O(total keys) per call.
    /// Ordered stores should override it with a range scan.
    fn child_segments(&self, base: &str) -> BTreeSet<String> {
        discover_child_segments(self.keys(), base)
    }

    /// Whether any key lies strictly below `base`.
    fn contains_prefix(&self, base: &str) -> bool {
        self.keys().any(|key| child_segment(key, base).is_some())
    }
}

/// Child segments of `base` in an ordered map, visiting only keys that
/// share the `base_` prefix.
pub(crate) fn ordered_child_segments<V>(
    map: &BTreeMap<String, V>,
    base: &str,
) -> BTreeSet<String> {
    if base.is_empty() {
        return discover_child_segments(map.keys().map(String::as_str), base);
    }
    prefixed_keys(map, base)
        .filter_map(|key| child_segment(key, base))
        .map(str::to_string)
        .collect()
}

pub(crate) fn ordered_contains_prefix<V>(map: &BTreeMap<String, V>, base: &str) -> bool {
    if base.is_empty() {
        return map.keys().any(|key| child_segment(key, base).is_some());
    }
    prefixed_keys(map, base).any(|key| child_segment(key, base).is_some())
}

fn prefixed_keys<'a, V>(
    map: &'a BTreeMap<String, V>,
    base: &str,
) -> impl Iterator<Item = &'a str> + 'a {
    let mut prefix = String::with_capacity(base.len() + 1);
    prefix.push_str(base);
    prefix.push(SEPARATOR);

    let start = map
        .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
        .map(|(key, _)| key.as_str());
    start.take_while(move |key| key.starts_with(prefix.as_str()))
}

/// A bare field map is a store with no identity.
impl FieldStore for BTreeMap<String, PrimitiveValue> {
    fn get(&self, key: &str) -> Option<&PrimitiveValue> {
        BTreeMap::get(self, key)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut PrimitiveValue> {
        BTreeMap::get_mut(self, key)
    }

    fn set(&mut self, key: String, value: PrimitiveValue) {
        self.insert(key, value);
    }

    fn keys(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(BTreeMap::keys(self).map(String::as_str))
    }

    fn child_segments(&self, base: &str) -> BTreeSet<String> {
        ordered_child_segments(self, base)
    }

    fn contains_prefix(&self, base: &str) -> bool {
        ordered_contains_prefix(self, base)
    }
}

impl<T: FieldStore + ?Sized> FieldStore for &mut T {
    fn get(&self, key: &str) -> Option<&PrimitiveValue> {
        (**self).get(key)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut PrimitiveValue> {
        (**self).get_mut(key)
    }

    fn set(&mut self, key: String, value: PrimitiveValue) {
        (**self).set(key, value)
    }

    fn keys(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        (**self).keys()
    }

    fn child_segments(&self, base: &str) -> BTreeSet<String> {
        (**self).child_segments(base)
    }

    fn contains_prefix(&self, base: &str) -> bool {
        (**self).contains_prefix(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection_literals::btree;

    /// A store that only implements the required methods, so the default
    /// full-scan discovery is exercised.
    struct ScanStore(Vec<(String, PrimitiveValue)>);

    impl FieldStore for ScanStore {
        fn get(&self, key: &str) -> Option<&PrimitiveValue> {
            self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
        }

        fn get_mut(&mut self, key: &str) -> Option<&mut PrimitiveValue> {
            self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
        }

        fn set(&mut self, key: String, value: PrimitiveValue) {
            match self.get_mut(&key) {
                Some(slot) => *slot = value,
                None => self.0.push((key, value)),
            }
        }

        fn keys(&self) -> Box<dyn Iterator<Item = &str> + '_> {
            Box::new(self.0.iter().map(|(k, _)| k.as_str()))
        }
    }

    fn sample() -> BTreeMap<String, PrimitiveValue> {
        btree! {
            "intDict_1".to_string() => PrimitiveValue::from("one"),
            "intDict_2".to_string() => PrimitiveValue::from("two"),
            "intDictionary".to_string() => PrimitiveValue::from(1i64),
            "number".to_string() => PrimitiveValue::from(5i64),
            "subValue_dict_one".to_string() => PrimitiveValue::from(1i64),
        }
    }

    #[test]
    fn range_scan_matches_full_scan() {
        let map = sample();
        let mut scan = ScanStore(Vec::new());
        for (k, v) in map.clone() {
            scan.set(k, v);
        }

        for base in ["", "intDict", "subValue", "subValue_dict", "number", "missing"] {
            assert_eq!(
                FieldStore::child_segments(&map, base),
                scan.child_segments(base),
                "base {:?}",
                base
            );
            assert_eq!(
                FieldStore::contains_prefix(&map, base),
                scan.contains_prefix(base),
                "base {:?}",
                base
            );
        }
    }

    #[test]
    fn child_segments_of_map_keys() {
        let map = sample();
        let found = FieldStore::child_segments(&map, "intDict");
        let found: Vec<_> = found.into_iter().collect();
        assert_eq!(found, vec!["1", "2"]);
    }

    #[test]
    fn contains_prefix_ignores_exact_key() {
        let map = sample();
        assert!(!FieldStore::contains_prefix(&map, "number"));
        assert!(FieldStore::contains_prefix(&map, "subValue"));
    }

    #[test]
    fn set_replaces() {
        let mut map = BTreeMap::new();
        FieldStore::set(&mut map, "a".to_string(), PrimitiveValue::from(1i64));
        FieldStore::set(&mut map, "a".to_string(), PrimitiveValue::from(2i64));
        assert_eq!(FieldStore::get(&map, "a"), Some(&PrimitiveValue::from(2i64)));
    }
}
