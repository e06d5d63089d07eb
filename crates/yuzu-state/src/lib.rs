//! JSON state tree primitives for yuzu state synchronization.
//!
//! This crate holds everything both peers agree on about the state itself:
//! paths, patches, reads, patch application, and the server-side mutation
//! tracker that turns writes into a patch stream.
//!
//! # Core concepts
//!
//! - **Path**: an ordered sequence of string segments naming a descent from
//!   the root; array indices travel as decimal strings.
//! - **Patch**: a path plus the value written there (`None` = absent), the
//!   unit of incremental update.
//! - **Tracker / StateWriter**: the producer-side cursor API; every write
//!   applies to the document and emits exactly one patch at its full path.
//! - **apply_patch**: the consumer-side applier that replays a patch stream
//!   onto a mirror.
//!
//! # Quick start
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use yuzu_state::{apply_patch, path, Tracker};
//! use serde_json::json;
//!
//! let stream = Arc::new(Mutex::new(Vec::new()));
//! let sink = stream.clone();
//! let tracker = Tracker::new(
//!     json!({"items": [1, 2, 3]}),
//!     Arc::new(move |p| sink.lock().unwrap().push(p)),
//! );
//!
//! tracker.root().child("items").push(4).unwrap();
//!
//! // Replaying the stream onto the old mirror reproduces the new state.
//! let mut mirror = json!({"items": [1, 2, 3]});
//! for patch in stream.lock().unwrap().iter() {
//!     apply_patch(&mut mirror, patch).unwrap();
//! }
//! assert_eq!(mirror, tracker.snapshot());
//! ```

mod apply;
mod doc_cell;
mod error;
mod patch;
mod path;
mod read;
mod tracker;

pub use apply::{apply_patch, apply_patches};
pub use doc_cell::DocCell;
pub use error::{value_type_name, StateError, StateResult};
pub use patch::Patch;
pub use path::Path;
pub use read::{read_path_existing, read_path_optional, ResolvedValue};
pub use tracker::{PatchSink, StateWriter, Tracker};

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
