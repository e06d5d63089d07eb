//! Error types for yuzu-state operations.

use crate::Path;
use thiserror::Error;

/// Result type alias for yuzu-state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while reading or mutating the state tree.
#[derive(Debug, Error)]
pub enum StateError {
    /// A path segment does not exist in the tree.
    #[error("path not found: segment '{segment}' missing in {path}")]
    PathNotFound {
        /// The full path that was requested.
        path: Path,
        /// The first segment that could not be resolved.
        segment: String,
    },

    /// A segment addressed an array but was not a valid index.
    #[error("invalid array index '{segment}' at {path}")]
    InvalidIndex {
        /// The full path that was requested.
        path: Path,
        /// The non-numeric segment.
        segment: String,
    },

    /// Type mismatch when descending through a value.
    #[error("cannot descend into {found} at {path}")]
    NotAContainer {
        /// The path where descent stopped.
        path: Path,
        /// The actual type found.
        found: &'static str,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StateError {
    /// Create a path not found error.
    #[inline]
    pub fn path_not_found(path: Path, segment: impl Into<String>) -> Self {
        StateError::PathNotFound {
            path,
            segment: segment.into(),
        }
    }

    /// Create an invalid index error.
    #[inline]
    pub fn invalid_index(path: Path, segment: impl Into<String>) -> Self {
        StateError::InvalidIndex {
            path,
            segment: segment.into(),
        }
    }

    /// Create a not-a-container error.
    #[inline]
    pub fn not_a_container(path: Path, found: &'static str) -> Self {
        StateError::NotAContainer { path, found }
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn test_error_display_names_segment_and_path() {
        let err = StateError::path_not_found(path!("users", "0", "name"), "name");
        let msg = err.to_string();
        assert!(msg.contains("'name'"));
        assert!(msg.contains("$.users.0.name"));
    }

    #[test]
    fn test_value_type_name() {
        use serde_json::json;

        assert_eq!(value_type_name(&json!(null)), "null");
        assert_eq!(value_type_name(&json!(true)), "boolean");
        assert_eq!(value_type_name(&json!(42)), "number");
        assert_eq!(value_type_name(&json!("hi")), "string");
        assert_eq!(value_type_name(&json!([1])), "array");
        assert_eq!(value_type_name(&json!({"a": 1})), "object");
    }
}
