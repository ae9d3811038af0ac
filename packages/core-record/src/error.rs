//! Error types for flat record transcoding.

use std::fmt;

use thiserror::Error;

use crate::value::ValueKind;

/// Errors raised while encoding into or decoding from a flat record.
///
/// Every kind except `InvalidMetadata` carries the flat key at which the
/// failure happened. Any error aborts the current encode or decode pass.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    /// The stored value's kind disagrees with the requested decode type.
    #[error("type mismatch at `{key}`: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    /// A required key is absent.
    #[error("missing key `{key}`")]
    MissingKey { key: String },

    /// A sequence element does not match the kind the native array is
    /// locked to.
    #[error("heterogeneous sequence at `{key}`: elements are {locked}, cannot append {found}")]
    HeterogeneousSequence {
        key: String,
        locked: ValueKind,
        found: String,
    },

    /// A nested record or sequence where only a flat leaf is accepted.
    #[error("unsupported shape at `{key}`: {message}")]
    UnsupportedShape { key: String, message: String },

    /// An exported metadata blob could not be rebuilt into a record shell.
    #[error("invalid metadata: {message}")]
    InvalidMetadata { message: String },

    /// Free-form error raised through serde (`custom`).
    #[error("{}", located(key, message))]
    Message { key: String, message: String },
}

fn located(key: &str, message: &str) -> String {
    if key.is_empty() {
        message.to_string()
    } else {
        format!("{} (at `{}`)", message, key)
    }
}

fn is_within(key: &str, location: &str) -> bool {
    key == location
        || key
            .strip_prefix(location)
            .is_some_and(|rest| rest.starts_with(crate::key::SEPARATOR))
}

impl Error {
    pub fn type_mismatch(key: &str, expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        Error::TypeMismatch {
            key: key.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn missing_key(key: &str) -> Self {
        Error::MissingKey {
            key: key.to_string(),
        }
    }

    pub fn unsupported_shape(key: &str, message: impl Into<String>) -> Self {
        Error::UnsupportedShape {
            key: key.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_metadata(message: impl fmt::Display) -> Self {
        Error::InvalidMetadata {
            message: message.to_string(),
        }
    }

    /// The flat key the error is tagged with, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Error::TypeMismatch { key, .. }
            | Error::MissingKey { key }
            | Error::HeterogeneousSequence { key, .. }
            | Error::UnsupportedShape { key, .. }
            | Error::Message { key, .. } => Some(key),
            Error::InvalidMetadata { .. } => None,
        }
    }

    /// Tag the error with `key` unless it already carries a location.
    ///
    /// Leaf helpers and serde's own error constructors do not know where
    /// they are; the container that called them does.
    #[must_use]
    pub fn at(mut self, location: &str) -> Self {
        match &mut self {
            Error::TypeMismatch { key, .. }
            | Error::HeterogeneousSequence { key, .. }
            | Error::UnsupportedShape { key, .. }
            | Error::Message { key, .. } => {
                if key.is_empty() {
                    *key = location.to_string();
                }
            }
            // serde reports a missing struct field by its bare name
            Error::MissingKey { key } => {
                if key.is_empty() {
                    *key = location.to_string();
                } else if !location.is_empty() && !is_within(key, location) {
                    *key = crate::key::compose(location, key);
                }
            }
            Error::InvalidMetadata { .. } => {}
        }
        self
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message {
            key: String::new(),
            message: msg.to_string(),
        }
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message {
            key: String::new(),
            message: msg.to_string(),
        }
    }

    fn invalid_type(unexp: serde::de::Unexpected, exp: &dyn serde::de::Expected) -> Self {
        Error::TypeMismatch {
            key: String::new(),
            expected: exp.to_string(),
            found: unexp.to_string(),
        }
    }

    fn invalid_value(unexp: serde::de::Unexpected, exp: &dyn serde::de::Expected) -> Self {
        Error::TypeMismatch {
            key: String::new(),
            expected: exp.to_string(),
            found: unexp.to_string(),
        }
    }

    fn missing_field(field: &'static str) -> Self {
        Error::MissingKey {
            key: field.to_string(),
        }
    }
}

/// Result alias for flat record operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::Error as _;

    #[test]
    fn display_includes_key() {
        let e = Error::missing_key("subValue_number");
        assert_eq!(e.to_string(), "missing key `subValue_number`");

        let e = Error::type_mismatch("flag", "bool", ValueKind::String);
        let display = e.to_string();
        assert!(display.contains("`flag`"));
        assert!(display.contains("expected bool"));
        assert!(display.contains("found string"));
    }

    #[test]
    fn heterogeneous_display() {
        let e = Error::HeterogeneousSequence {
            key: "array".to_string(),
            locked: ValueKind::Int,
            found: "string".to_string(),
        };
        let display = e.to_string();
        assert!(display.contains("array"));
        assert!(display.contains("int"));
        assert!(display.contains("string"));
    }

    #[test]
    fn at_fills_empty_key_only() {
        let e = Error::unsupported_shape("", "nested").at("items_0");
        assert_eq!(e.key(), Some("items_0"));

        let e = Error::unsupported_shape("inner", "nested").at("outer");
        assert_eq!(e.key(), Some("inner"));
    }

    #[test]
    fn missing_field_is_qualified_by_location() {
        let e = Error::missing_field("number").at("subValue");
        assert_eq!(e, Error::missing_key("subValue_number"));

        let e = Error::missing_field("number").at("");
        assert_eq!(e, Error::missing_key("number"));
    }

    #[test]
    fn custom_message_display() {
        let e = <Error as serde::de::Error>::custom("something went wrong");
        assert_eq!(e.to_string(), "something went wrong");
        let e = e.at("field");
        assert_eq!(e.to_string(), "something went wrong (at `field`)");
    }

    #[test]
    fn invalid_metadata_has_no_key() {
        let e = Error::invalid_metadata("truncated");
        assert_eq!(e.key(), None);
        assert_eq!(e.at("ignored").to_string(), "invalid metadata: truncated");
    }
}
