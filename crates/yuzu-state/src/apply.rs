//! Patch application against a local mirror.
//!
//! The applier walks the mirror from the root along all but the last path
//! segment, then assigns the final segment on the reached container. Arrays
//! get the same treatment the originating writes had: assigning one past the
//! end appends, assigning further out null-extends, and the `"length"`
//! pseudo-key resizes.

use crate::error::{StateError, StateResult};
use crate::{Patch, Path};
use serde_json::{Map, Value};

/// Apply a single patch to a document in place.
///
/// The empty path replaces the entire document. Applying the absent sentinel
/// removes a keyed entry, nulls an array slot, and nulls the root.
///
/// # Examples
///
/// ```
/// use yuzu_state::{apply_patch, path, Patch};
/// use serde_json::json;
///
/// let mut doc = json!({"count": 0});
/// apply_patch(&mut doc, &Patch::set(path!("count"), json!(5))).unwrap();
/// assert_eq!(doc, json!({"count": 5}));
///
/// apply_patch(&mut doc, &Patch::absent(path!("count"))).unwrap();
/// assert_eq!(doc, json!({}));
/// ```
pub fn apply_patch(doc: &mut Value, patch: &Patch) -> StateResult<()> {
    let segments = patch.path.segments();

    let Some((last, walk)) = segments.split_last() else {
        *doc = patch.value.clone().unwrap_or(Value::Null);
        return Ok(());
    };

    let mut current = doc;
    for seg in walk {
        current = descend_or_create(current, seg, &patch.path)?;
    }
    assign(current, last, patch.value.clone(), &patch.path)
}

/// Apply an ordered group of patches.
///
/// Stops at the first failure; earlier patches stay applied, matching the
/// one-at-a-time delivery the batch stands in for.
pub fn apply_patches<'a>(
    doc: &mut Value,
    patches: impl IntoIterator<Item = &'a Patch>,
) -> StateResult<()> {
    for patch in patches {
        apply_patch(doc, patch)?;
    }
    Ok(())
}

fn descend_or_create<'a>(
    current: &'a mut Value,
    seg: &str,
    full_path: &Path,
) -> StateResult<&'a mut Value> {
    if current.is_array() {
        let arr = current.as_array_mut().unwrap();
        let idx: usize = seg
            .parse()
            .map_err(|_| StateError::invalid_index(full_path.clone(), seg))?;
        if idx >= arr.len() {
            arr.resize(idx + 1, Value::Null);
        }
        return Ok(&mut arr[idx]);
    }

    // Anything that is not already a container becomes an object, so patches
    // arriving ahead of their ancestors still land.
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    let obj = current.as_object_mut().unwrap();
    Ok(obj.entry(seg.to_string()).or_insert(Value::Null))
}

fn assign(container: &mut Value, seg: &str, value: Option<Value>, full_path: &Path) -> StateResult<()> {
    match container {
        Value::Array(arr) => {
            if seg == "length" {
                if let Some(len) = value.as_ref().and_then(Value::as_u64) {
                    arr.resize(len as usize, Value::Null);
                    return Ok(());
                }
                return Err(StateError::invalid_index(full_path.clone(), seg));
            }
            let idx: usize = seg
                .parse()
                .map_err(|_| StateError::invalid_index(full_path.clone(), seg))?;
            let value = value.unwrap_or(Value::Null);
            if idx >= arr.len() {
                arr.resize(idx, Value::Null);
                arr.push(value);
            } else {
                arr[idx] = value;
            }
            Ok(())
        }
        Value::Object(obj) => {
            match value {
                Some(v) => {
                    obj.insert(seg.to_string(), v);
                }
                None => {
                    obj.remove(seg);
                }
            }
            Ok(())
        }
        _ => {
            // Replacing a primitive parent with an object mirrors the
            // intermediate-creation rule above.
            let mut map = Map::new();
            if let Some(v) = value {
                map.insert(seg.to_string(), v);
            }
            *container = Value::Object(map);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_apply_set_key() {
        let mut doc = json!({});
        apply_patch(&mut doc, &Patch::set(path!("name"), json!("Alice"))).unwrap();
        assert_eq!(doc, json!({"name": "Alice"}));
    }

    #[test]
    fn test_apply_creates_intermediates() {
        let mut doc = json!({});
        apply_patch(&mut doc, &Patch::set(path!("a", "b", "c"), json!(42))).unwrap();
        assert_eq!(doc, json!({"a": {"b": {"c": 42}}}));
    }

    #[test]
    fn test_apply_root_replacement() {
        let mut doc = json!({"old": true});
        apply_patch(&mut doc, &Patch::set(path!(), json!({"count": 42}))).unwrap();
        assert_eq!(doc, json!({"count": 42}));
    }

    #[test]
    fn test_apply_root_absent_nulls() {
        let mut doc = json!({"old": true});
        apply_patch(&mut doc, &Patch::absent(path!())).unwrap();
        assert_eq!(doc, json!(null));
    }

    #[test]
    fn test_apply_absent_removes_key() {
        let mut doc = json!({"a": 1, "b": 2});
        apply_patch(&mut doc, &Patch::absent(path!("a"))).unwrap();
        assert_eq!(doc, json!({"b": 2}));
    }

    #[test]
    fn test_apply_array_index_set() {
        let mut doc = json!({"items": [1, 2, 3]});
        apply_patch(&mut doc, &Patch::set(path!("items", 1), json!(99))).unwrap();
        assert_eq!(doc, json!({"items": [1, 99, 3]}));
    }

    #[test]
    fn test_apply_array_index_append() {
        let mut doc = json!({"items": [1, 2, 3]});
        apply_patch(&mut doc, &Patch::set(path!("items", 3), json!(4))).unwrap();
        assert_eq!(doc, json!({"items": [1, 2, 3, 4]}));
    }

    #[test]
    fn test_apply_array_index_extends_with_nulls() {
        let mut doc = json!({"items": [1]});
        apply_patch(&mut doc, &Patch::set(path!("items", 3), json!(4))).unwrap();
        assert_eq!(doc, json!({"items": [1, null, null, 4]}));
    }

    #[test]
    fn test_apply_array_length_truncates() {
        let mut doc = json!({"items": [1, 2, 3, 4]});
        apply_patch(&mut doc, &Patch::set(path!("items", "length"), json!(2))).unwrap();
        assert_eq!(doc, json!({"items": [1, 2]}));
    }

    #[test]
    fn test_apply_array_length_extends() {
        let mut doc = json!({"items": [1]});
        apply_patch(&mut doc, &Patch::set(path!("items", "length"), json!(3))).unwrap();
        assert_eq!(doc, json!({"items": [1, null, null]}));
    }

    #[test]
    fn test_apply_array_absent_slot_nulls() {
        let mut doc = json!({"items": [1, 2, 3]});
        apply_patch(&mut doc, &Patch::absent(path!("items", 1))).unwrap();
        assert_eq!(doc, json!({"items": [1, null, 3]}));
    }

    #[test]
    fn test_apply_push_sequence_matches_mutation() {
        // The wire stream a push(4) produces, replayed onto the old mirror.
        let mut doc = json!({"items": [1, 2, 3]});
        apply_patches(
            &mut doc,
            &[
                Patch::set(path!("items", 3), json!(4)),
                Patch::set(path!("items", "length"), json!(4)),
            ],
        )
        .unwrap();
        assert_eq!(doc, json!({"items": [1, 2, 3, 4]}));
    }

    #[test]
    fn test_apply_batch_idempotent() {
        let patches = [
            Patch::set(path!("count"), json!(1)),
            Patch::set(path!("value"), json!(2)),
        ];
        let mut once = json!({"count": 0, "value": 0});
        apply_patches(&mut once, &patches).unwrap();
        let mut twice = once.clone();
        apply_patches(&mut twice, &patches).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_subtree_replacement() {
        let mut doc = json!({"user": {"profile": {"name": "John"}, "age": 3}});
        apply_patch(&mut doc, &Patch::set(path!("user"), json!({"id": 7}))).unwrap();
        assert_eq!(doc, json!({"user": {"id": 7}}));
    }

    #[test]
    fn test_apply_bad_index_errors() {
        let mut doc = json!({"items": [1]});
        let err = apply_patch(&mut doc, &Patch::set(path!("items", "x"), json!(1))).unwrap_err();
        assert!(matches!(err, StateError::InvalidIndex { .. }));
    }
}
