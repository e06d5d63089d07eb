//! Path reads over a JSON tree.
//!
//! Two flavors: [`read_path_existing`] fails naming the first missing segment,
//! [`read_path_optional`] answers absent. Segments are interpreted against the
//! container they meet: objects by key, arrays by decimal index, with
//! `"length"` resolving to an array's element count.

use crate::error::{value_type_name, StateError, StateResult};
use crate::Path;
use serde_json::Value;

/// Read the value at `path`, failing if any segment is missing.
///
/// # Examples
///
/// ```
/// use yuzu_state::{path, read_path_existing};
/// use serde_json::json;
///
/// let doc = json!({"items": [1, 2, 3]});
/// assert_eq!(read_path_existing(&doc, &path!("items", 1)).unwrap(), &json!(2));
/// assert_eq!(read_path_existing(&doc, &path!("items", "length")).unwrap(), &json!(3));
/// assert!(read_path_existing(&doc, &path!("missing")).is_err());
/// ```
pub fn read_path_existing<'a>(doc: &'a Value, path: &Path) -> StateResult<ResolvedValue<'a>> {
    let mut current = doc;
    for seg in path.iter() {
        match descend(current, seg, path)? {
            Some(Resolved::Child(child)) => current = child,
            Some(Resolved::ArrayLength(len)) => {
                return Ok(ResolvedValue::Owned(Value::from(len as u64)));
            }
            None => {
                return Err(StateError::path_not_found(path.clone(), seg.clone()));
            }
        }
    }
    Ok(ResolvedValue::Borrowed(current))
}

/// Read the value at `path`, answering `None` if any segment is missing.
pub fn read_path_optional<'a>(doc: &'a Value, path: &Path) -> Option<ResolvedValue<'a>> {
    read_path_existing(doc, path).ok()
}

/// A value resolved by a path read.
///
/// Almost always a borrow into the tree; reading an array's `length`
/// pseudo-key materializes the count.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue<'a> {
    /// A reference into the document.
    Borrowed(&'a Value),
    /// A value computed during resolution.
    Owned(Value),
}

impl ResolvedValue<'_> {
    /// Get a reference to the resolved value.
    #[inline]
    pub fn as_value(&self) -> &Value {
        match self {
            ResolvedValue::Borrowed(v) => v,
            ResolvedValue::Owned(v) => v,
        }
    }

    /// Clone the resolved value out.
    #[inline]
    pub fn into_value(self) -> Value {
        match self {
            ResolvedValue::Borrowed(v) => v.clone(),
            ResolvedValue::Owned(v) => v,
        }
    }
}

impl PartialEq<Value> for ResolvedValue<'_> {
    fn eq(&self, other: &Value) -> bool {
        self.as_value() == other
    }
}

impl PartialEq<&Value> for ResolvedValue<'_> {
    fn eq(&self, other: &&Value) -> bool {
        self.as_value() == *other
    }
}

enum Resolved<'a> {
    Child(&'a Value),
    ArrayLength(usize),
}

fn descend<'a>(current: &'a Value, seg: &str, full_path: &Path) -> StateResult<Option<Resolved<'a>>> {
    match current {
        Value::Object(map) => Ok(map.get(seg).map(Resolved::Child)),
        Value::Array(arr) => {
            if seg == "length" {
                return Ok(Some(Resolved::ArrayLength(arr.len())));
            }
            let idx: usize = seg
                .parse()
                .map_err(|_| StateError::invalid_index(full_path.clone(), seg))?;
            Ok(arr.get(idx).map(Resolved::Child))
        }
        other => Err(StateError::not_a_container(
            full_path.clone(),
            value_type_name(other),
        )),
    }
}
