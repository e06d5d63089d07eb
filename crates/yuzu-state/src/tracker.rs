//! Mutation capture for the server-held state tree.
//!
//! Rust has no transparent proxies, so capture is the explicit style: a
//! [`Tracker`] wraps the document together with a patch sink, and hands out
//! [`StateWriter`] cursors that carry the path by which they were reached.
//! Every write goes through the document first and then emits exactly one
//! patch per observed assignment; array mutators reproduce the element-wise
//! patch stream of ordinary index-and-length assignments.

use crate::error::{value_type_name, StateError, StateResult};
use crate::read::read_path_optional;
use crate::{apply_patch, DocCell, Patch, Path};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Receives every patch the tracker emits, in write order.
pub type PatchSink = Arc<dyn Fn(Patch) + Send + Sync>;

/// Observable state tree.
///
/// Writes are applied to the document before their patches reach the sink, so
/// the document is well-formed at every observation point and a snapshot taken
/// from inside the sink already reflects the write being reported.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use yuzu_state::{path, Tracker};
/// use serde_json::json;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let tracker = Tracker::new(json!({"count": 0}), Arc::new(move |p| {
///     sink.lock().unwrap().push(p);
/// }));
///
/// tracker.root().child("count").set(5).unwrap();
///
/// assert_eq!(tracker.snapshot(), json!({"count": 5}));
/// let seen = seen.lock().unwrap();
/// assert_eq!(seen[0].path, path!("count"));
/// assert_eq!(seen[0].value, Some(json!(5)));
/// ```
pub struct Tracker {
    doc: DocCell,
    sink: PatchSink,
}

impl Tracker {
    /// Create a tracker over an initial value, reporting to `sink`.
    pub fn new(initial: Value, sink: PatchSink) -> Self {
        Self {
            doc: DocCell::new(initial),
            sink,
        }
    }

    /// Cursor at the document root.
    #[inline]
    pub fn root(&self) -> StateWriter<'_> {
        self.at(Path::root())
    }

    /// Cursor at an arbitrary path.
    #[inline]
    pub fn at(&self, path: Path) -> StateWriter<'_> {
        StateWriter {
            tracker: self,
            path,
        }
    }

    /// Clone the current document.
    pub fn snapshot(&self) -> Value {
        self.doc.snapshot()
    }

    /// The underlying document cell.
    pub fn doc(&self) -> &DocCell {
        &self.doc
    }

    fn commit(&self, patches: Vec<Patch>) -> StateResult<()> {
        {
            let mut doc = self.doc.get();
            for patch in &patches {
                apply_patch(&mut doc, patch)?;
            }
        }
        // The lock is released before the sink runs so it may snapshot freely.
        for patch in patches {
            (self.sink)(patch);
        }
        Ok(())
    }

    fn with_array<T>(
        &self,
        path: &Path,
        f: impl FnOnce(&Vec<Value>) -> T,
    ) -> StateResult<T> {
        let doc = self.doc.get();
        let resolved = read_path_optional(&doc, path)
            .ok_or_else(|| missing(path))?;
        match resolved.as_value() {
            Value::Array(arr) => Ok(f(arr)),
            other => Err(StateError::not_a_container(
                path.clone(),
                value_type_name(other),
            )),
        }
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker").field("doc", &self.doc).finish()
    }
}

fn missing(path: &Path) -> StateError {
    let segment = path.last().unwrap_or_default().to_string();
    StateError::path_not_found(path.clone(), segment)
}

/// Path-carrying write cursor over a [`Tracker`].
///
/// Descending with [`child`](Self::child)/[`index`](Self::index) extends the
/// carried path; writes emit a patch at exactly that path.
#[derive(Clone)]
pub struct StateWriter<'a> {
    tracker: &'a Tracker,
    path: Path,
}

impl<'a> StateWriter<'a> {
    /// The path this cursor addresses.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cursor for a keyed child.
    #[inline]
    pub fn child(&self, key: impl Into<String>) -> StateWriter<'a> {
        StateWriter {
            tracker: self.tracker,
            path: self.path.with_segment(key),
        }
    }

    /// Cursor for an array element.
    #[inline]
    pub fn index(&self, i: usize) -> StateWriter<'a> {
        self.child(i.to_string())
    }

    /// Clone the value at this cursor, if present.
    pub fn get(&self) -> Option<Value> {
        let doc = self.tracker.doc.get();
        read_path_optional(&doc, &self.path).map(|v| v.into_value())
    }

    /// Whether a value exists at this cursor.
    pub fn exists(&self) -> bool {
        let doc = self.tracker.doc.get();
        read_path_optional(&doc, &self.path).is_some()
    }

    /// Assign a value at this cursor.
    ///
    /// Replacing a whole sub-tree is one patch carrying the new sub-tree;
    /// later writes inside it emit patches rooted below this path.
    pub fn set(&self, value: impl Serialize) -> StateResult<()> {
        let value = serde_json::to_value(value)?;
        self.tracker
            .commit(vec![Patch::set(self.path.clone(), value)])
    }

    /// Remove the entry at this cursor by assigning the absent sentinel.
    ///
    /// This is the sanctioned deletion: it emits a `{path, absent}` patch.
    pub fn clear(&self) -> StateResult<()> {
        self.tracker.commit(vec![Patch::absent(self.path.clone())])
    }

    /// Append one value to the array at this cursor.
    ///
    /// Emits a patch for the new element followed by one for `length`.
    pub fn push(&self, value: impl Serialize) -> StateResult<()> {
        self.push_all([serde_json::to_value(value)?])
    }

    /// Append several values to the array at this cursor.
    ///
    /// K values produce K element patches (in order) plus the `length` patch.
    pub fn push_all(&self, values: impl IntoIterator<Item = Value>) -> StateResult<()> {
        let len = self.tracker.with_array(&self.path, Vec::len)?;

        let mut patches = Vec::new();
        let mut next = len;
        for value in values {
            patches.push(Patch::set(self.path.clone().index(next), value));
            next += 1;
        }
        patches.push(Patch::set(
            self.path.clone().key("length"),
            Value::from(next as u64),
        ));
        self.tracker.commit(patches)
    }

    /// Remove and return the last element of the array at this cursor.
    ///
    /// Only the `length` patch is emitted; the element removal itself never
    /// appears on the wire.
    pub fn pop(&self) -> StateResult<Option<Value>> {
        let (removed, new_len) = self.tracker.with_array(&self.path, |arr| {
            (arr.last().cloned(), arr.len().saturating_sub(1))
        })?;

        self.tracker.commit(vec![Patch::set(
            self.path.clone().key("length"),
            Value::from(new_len as u64),
        )])?;
        Ok(removed)
    }

    /// Splice the array at this cursor: remove `delete_count` elements at
    /// `start`, inserting `items` in their place. Returns the removed
    /// elements.
    ///
    /// Emits a patch for every index whose value changed (ascending), then
    /// the `length` patch when the length changed.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> StateResult<Vec<Value>> {
        let old = self.tracker.with_array(&self.path, Vec::clone)?;

        let start = start.min(old.len());
        let delete_count = delete_count.min(old.len() - start);

        let mut new = old[..start].to_vec();
        new.extend(items);
        new.extend_from_slice(&old[start + delete_count..]);
        let removed = old[start..start + delete_count].to_vec();

        let mut patches = Vec::new();
        for (i, value) in new.iter().enumerate() {
            if old.get(i) != Some(value) {
                patches.push(Patch::set(self.path.clone().index(i), value.clone()));
            }
        }
        if new.len() != old.len() {
            patches.push(Patch::set(
                self.path.clone().key("length"),
                Value::from(new.len() as u64),
            ));
        }
        self.tracker.commit(patches)?;
        Ok(removed)
    }

    /// Resize the array at this cursor, truncating or null-extending.
    pub fn set_len(&self, len: usize) -> StateResult<()> {
        self.tracker.with_array(&self.path, |_| ())?;
        self.tracker.commit(vec![Patch::set(
            self.path.clone().key("length"),
            Value::from(len as u64),
        )])
    }
}

impl std::fmt::Debug for StateWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateWriter")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;
    use std::sync::Mutex;

    fn recording(initial: Value) -> (Tracker, Arc<Mutex<Vec<Patch>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let tracker = Tracker::new(
            initial,
            Arc::new(move |p| sink.lock().unwrap().push(p)),
        );
        (tracker, seen)
    }

    #[test]
    fn test_set_emits_one_patch_with_full_path() {
        let (tracker, seen) = recording(json!({"a": {"b": {"c": 0}}}));

        tracker
            .root()
            .child("a")
            .child("b")
            .child("c")
            .set(7)
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], Patch::set(path!("a", "b", "c"), json!(7)));
        assert_eq!(tracker.snapshot(), json!({"a": {"b": {"c": 7}}}));
    }

    #[test]
    fn test_reads_emit_nothing() {
        let (tracker, seen) = recording(json!({"a": [1, 2]}));

        let cursor = tracker.root().child("a");
        let _ = cursor.get();
        let _ = cursor.index(0).get();
        let _ = cursor.exists();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_subtree_replacement_is_single_patch() {
        let (tracker, seen) = recording(json!({"user": {"old": true}}));

        tracker
            .root()
            .child("user")
            .set(json!({"name": "Jane", "age": 30}))
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, path!("user"));
        assert_eq!(seen[0].value, Some(json!({"name": "Jane", "age": 30})));
    }

    #[test]
    fn test_writes_inside_replaced_subtree_root_below_it() {
        let (tracker, seen) = recording(json!({}));

        let user = tracker.root().child("user");
        user.set(json!({"name": "Jane"})).unwrap();
        user.child("name").set("John").unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[1].path, path!("user", "name"));
        assert_eq!(tracker.snapshot(), json!({"user": {"name": "John"}}));
    }

    #[test]
    fn test_push_emits_element_then_length() {
        let (tracker, seen) = recording(json!({"items": [1, 2, 3]}));

        tracker.root().child("items").push(4).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Patch::set(path!("items", 3), json!(4)));
        assert_eq!(seen[1], Patch::set(path!("items", "length"), json!(4)));
    }

    #[test]
    fn test_push_all_emits_k_plus_one_patches() {
        let (tracker, seen) = recording(json!({"xs": [0, 1, 2, 3, 4]}));

        tracker
            .root()
            .child("xs")
            .push_all([json!(10), json!(11)])
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].path, path!("xs", 5));
        assert_eq!(seen[1].path, path!("xs", 6));
        assert_eq!(seen[2], Patch::set(path!("xs", "length"), json!(7)));
    }

    #[test]
    fn test_pop_emits_only_length() {
        let (tracker, seen) = recording(json!({"items": [1, 2, 3]}));

        let removed = tracker.root().child("items").pop().unwrap();

        assert_eq!(removed, Some(json!(3)));
        assert_eq!(tracker.snapshot(), json!({"items": [1, 2]}));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], Patch::set(path!("items", "length"), json!(2)));
    }

    #[test]
    fn test_pop_empty_array() {
        let (tracker, seen) = recording(json!({"items": []}));

        let removed = tracker.root().child("items").pop().unwrap();

        assert_eq!(removed, None);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_emits_absent_and_removes() {
        let (tracker, seen) = recording(json!({"a": 1, "b": 2}));

        tracker.root().child("a").clear().unwrap();

        assert_eq!(tracker.snapshot(), json!({"b": 2}));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_absent());
        assert_eq!(seen[0].path, path!("a"));
    }

    #[test]
    fn test_root_replacement() {
        let (tracker, seen) = recording(json!({"old": 1}));

        tracker.root().set(json!({"new": 2})).unwrap();

        assert_eq!(tracker.snapshot(), json!({"new": 2}));
        let seen = seen.lock().unwrap();
        assert!(seen[0].path.is_empty());
    }

    #[test]
    fn test_splice_emits_changed_indices_then_length() {
        let (tracker, seen) = recording(json!({"xs": [1, 2, 3, 4]}));

        let removed = tracker
            .root()
            .child("xs")
            .splice(1, 2, [json!(9)])
            .unwrap();

        assert_eq!(removed, vec![json!(2), json!(3)]);
        assert_eq!(tracker.snapshot(), json!({"xs": [1, 9, 4]}));
        let seen = seen.lock().unwrap();
        // Index 1 changed (2→9), index 2 changed (3→4), then length.
        assert_eq!(seen[0], Patch::set(path!("xs", 1), json!(9)));
        assert_eq!(seen[1], Patch::set(path!("xs", 2), json!(4)));
        assert_eq!(seen[2], Patch::set(path!("xs", "length"), json!(3)));
    }

    #[test]
    fn test_splice_insertion_grows() {
        let (tracker, _) = recording(json!({"xs": [1, 2]}));

        tracker
            .root()
            .child("xs")
            .splice(1, 0, [json!(9), json!(8)])
            .unwrap();

        assert_eq!(tracker.snapshot(), json!({"xs": [1, 9, 8, 2]}));
    }

    #[test]
    fn test_set_len_truncates_mirror() {
        let (tracker, seen) = recording(json!({"xs": [1, 2, 3]}));

        tracker.root().child("xs").set_len(1).unwrap();

        assert_eq!(tracker.snapshot(), json!({"xs": [1]}));
        assert_eq!(
            seen.lock().unwrap()[0],
            Patch::set(path!("xs", "length"), json!(1))
        );
    }

    #[test]
    fn test_push_on_missing_array_errors() {
        let (tracker, seen) = recording(json!({}));

        assert!(tracker.root().child("items").push(1).is_err());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_push_on_non_array_errors() {
        let (tracker, _) = recording(json!({"items": 5}));
        let err = tracker.root().child("items").push(1).unwrap_err();
        assert!(matches!(err, StateError::NotAContainer { .. }));
    }

    #[test]
    fn test_emitted_patch_replays_onto_old_mirror() {
        let before = json!({"user": {"profile": {"name": "John"}}});
        let (tracker, seen) = recording(before.clone());

        tracker
            .root()
            .child("user")
            .child("profile")
            .child("name")
            .set("Jane")
            .unwrap();

        let mut mirror = before;
        for patch in seen.lock().unwrap().iter() {
            apply_patch(&mut mirror, patch).unwrap();
        }
        assert_eq!(mirror, tracker.snapshot());
    }
}
