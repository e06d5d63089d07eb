//! Path representation for addressing locations in the state tree.
//!
//! A path is an ordered sequence of string segments describing a descent from
//! the root. Segments are strings uniformly — array indices travel as their
//! decimal representation — because the wire protocol carries them that way
//! and the same segment may address an array slot or a keyed-map entry
//! depending on the container it meets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A path into the state tree.
///
/// The empty path denotes the root. Use builder methods to construct paths
/// incrementally.
///
/// # Examples
///
/// ```
/// use yuzu_state::Path;
///
/// let path = Path::root().key("items").index(3).key("status");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.segments(), ["items", "3", "status"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<String>);

impl Path {
    /// Create an empty path (root).
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Append a key segment and return self (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(k.into());
        self
    }

    /// Append an array-index segment and return self (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(i.to_string());
        self
    }

    /// Push a segment onto the path (mutating).
    #[inline]
    pub fn push(&mut self, seg: impl Into<String>) {
        self.0.push(seg.into());
    }

    /// Pop the last segment from the path.
    #[inline]
    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    /// Get the segments of this path.
    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Check if this path is empty (root).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of segments in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the last segment.
    #[inline]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a segment and return a new path (non-mutating builder).
    #[inline]
    pub fn with_segment(&self, seg: impl Into<String>) -> Path {
        let mut result = self.clone();
        result.0.push(seg.into());
        result
    }

    /// Check if this path is a prefix of another path.
    ///
    /// A path is a prefix of another if all of its segments match the
    /// beginning of the other path's segments. The empty path is a prefix of
    /// every path, including itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use yuzu_state::path;
    ///
    /// let parent = path!("user");
    /// let child = path!("user", "name");
    ///
    /// assert!(parent.is_prefix_of(&child));
    /// assert!(!child.is_prefix_of(&parent));
    /// assert!(parent.is_prefix_of(&parent));
    /// ```
    #[inline]
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }

    /// Get the parent path (path without the last segment).
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            let mut p = self.clone();
            p.pop();
            Some(p)
        }
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for seg in &self.0 {
            write!(f, ".{}", seg)?;
        }
        Ok(())
    }
}

impl FromIterator<String> for Path {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = String;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Path(segments.iter().map(|s| s.to_string()).collect())
    }
}

/// Construct a `Path` from a sequence of segments.
///
/// String literals become key segments; integers become stringified index
/// segments.
///
/// # Examples
///
/// ```
/// use yuzu_state::path;
///
/// let p = path!("items", 3, "status");
/// assert_eq!(p.segments(), ["items", "3", "status"]);
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($seg.to_string());
        )+
        p
    }};
}
