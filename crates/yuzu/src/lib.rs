//! Yuzu keeps a JSON state tree, authoritatively held on a server,
//! synchronized in near real time to any number of connected clients.
//!
//! Producers mutate the server state through a path-carrying writer; every
//! mutation becomes a path-addressed patch and is delivered to all clients,
//! which apply it to a read-only mirror and fan out to subscribers registered
//! at any path in the tree.
//!
//! This facade re-exports the member crates:
//!
//! - [`state`]: paths, patches, the mutation tracker, patch application
//! - [`protocol`]: the complete/patch/patch-batch wire messages
//! - [`server`]: the authoritative server session layer and its transports
//! - [`client`]: the mirroring client, subscriptions, and the projection
//!
//! # A round trip in one process
//!
//! ```
//! use yuzu::client::{ClientConfig, YuzuClient};
//! use yuzu::server::{ServerConfig, YuzuServer};
//! use yuzu::state::path;
//! use serde_json::json;
//! use std::sync::{Arc, Mutex};
//!
//! // External transport mode: the "network" is two function calls.
//! let client_slot: Arc<Mutex<Option<YuzuClient>>> = Arc::new(Mutex::new(None));
//! let slot = client_slot.clone();
//! let server = YuzuServer::new(
//!     json!({"count": 0}),
//!     ServerConfig::external(move |msg, _| {
//!         if let Some(client) = &*slot.lock().unwrap() {
//!             client.handle_server_message(&msg);
//!         }
//!     }),
//! )
//! .unwrap();
//!
//! let peer = server.clone();
//! let client = YuzuClient::new(ClientConfig::external(move |msg| {
//!     peer.handle_client_message(&msg, None);
//! }))
//! .unwrap();
//! *client_slot.lock().unwrap() = Some(client.clone());
//! client.request_complete().unwrap();
//!
//! server.state().child("count").set(5).unwrap();
//! assert_eq!(client.read_existing(&path!("count")).unwrap(), json!(5));
//! ```

pub use yuzu_client as client;
pub use yuzu_protocol as protocol;
pub use yuzu_server as server;
pub use yuzu_state as state;

pub use yuzu_client::{ClientConfig, Subscription, YuzuClient};
pub use yuzu_server::{ServerConfig, YuzuServer};
pub use yuzu_state::{Patch, Path};
