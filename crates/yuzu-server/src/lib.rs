//! The yuzu state server.
//!
//! Holds the authoritative JSON state tree and synchronizes it to any number
//! of clients. Producers mutate the tree through a path-carrying writer; each
//! write becomes a patch, optionally coalesced within a batching window, and
//! is broadcast to every connected endpoint. Clients request the full tree
//! with a `complete` handshake, answered with a snapshot taken at service
//! time.
//!
//! # Quick start
//!
//! ```no_run
//! use yuzu_server::{ServerConfig, YuzuServer};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let server = YuzuServer::new(
//!     json!({"count": 0, "items": []}),
//!     ServerConfig::bind("127.0.0.1:4000".parse()?),
//! )?;
//!
//! // Producers write through the state cursor; every write is synchronized.
//! server.state().child("count").set(1)?;
//! server.state().child("items").push("first")?;
//!
//! server.serve().await?;
//! # Ok(())
//! # }
//! ```
//!
//! For hosts that already run axum, [`YuzuServer::router`] returns the
//! WebSocket route to merge; for everything else there is external transport
//! mode ([`ServerConfig::external`]) where the host moves the bytes.

mod batch;
mod config;
mod error;
mod server;
mod ws;

pub use config::{
    AuthError, AuthFn, Authenticate, ConnectRequest, OutboundFn, ServerConfig, TransportMode,
};
pub use error::{ServerError, ServerResult};
pub use server::YuzuServer;

pub use yuzu_protocol::{LogLevel, ServerMessage};
pub use yuzu_state::{Patch, Path, StateWriter};
