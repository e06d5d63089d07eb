//! The unit of incremental update: a path plus the value written there.

use crate::Path;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single path-addressed change to the state tree.
///
/// `value: None` is the absent sentinel: it records that the entry at `path`
/// was removed (or written with a value that does not survive JSON
/// serialization). There is no separate delete opcode. Absent values are
/// omitted from the serialized form, so a received patch with no `value` key
/// and one whose key was dropped in transit are indistinguishable — by design.
///
/// # Examples
///
/// ```
/// use yuzu_state::{path, Patch};
/// use serde_json::json;
///
/// let patch = Patch::set(path!("count"), json!(5));
/// assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"path":["count"],"value":5}"#);
///
/// let gone = Patch::absent(path!("count"));
/// assert_eq!(serde_json::to_string(&gone).unwrap(), r#"{"path":["count"]}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Target path from the root.
    pub path: Path,
    /// New value, or `None` for the absent sentinel.
    ///
    /// An explicit JSON `null` deserializes to `Some(Value::Null)`; only a
    /// missing `value` key is absent.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Patch {
    /// Create a patch writing `value` at `path`.
    #[inline]
    pub fn set(path: Path, value: impl Into<Value>) -> Self {
        Self {
            path,
            value: Some(value.into()),
        }
    }

    /// Create a patch recording removal of the entry at `path`.
    #[inline]
    pub fn absent(path: Path) -> Self {
        Self { path, value: None }
    }

    /// Whether this patch carries the absent sentinel.
    #[inline]
    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }
}
