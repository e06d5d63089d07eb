//! The yuzu state client.
//!
//! Keeps a read-only, near-real-time mirror of a yuzu server's JSON state
//! tree. Subscriptions can be registered at any path and fire whenever a
//! patch lands at or below it; the subscribable projection offers the same
//! registration through path-carrying cursors.
//!
//! # Quick start
//!
//! ```no_run
//! use yuzu_client::{ClientConfig, YuzuClient};
//! use yuzu_state::path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = YuzuClient::new(ClientConfig::address("ws://localhost:4000/api/yuzu"))?;
//! client.connect().await?;
//!
//! // Path subscription: fires for every change at or below `user`.
//! let sub = client.subscribe(path!("user"), |value, changed| {
//!     println!("user changed at {changed}: {value:?}");
//! });
//!
//! // Or through the projection.
//! let _name = client.view().child("user").child("name").value();
//!
//! sub.unsubscribe();
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod registry;
mod subscription;
mod view;

pub use client::YuzuClient;
pub use config::{ClientConfig, ClientOutboundFn, ClientTransportMode, TokenFn, TokenProvider};
pub use error::{ClientError, ClientResult};
pub use registry::Listener;
pub use subscription::Subscription;
pub use view::StateView;

pub use yuzu_protocol::LogLevel;
pub use yuzu_state::{Patch, Path};
