//! Wire protocol for yuzu state synchronization.
//!
//! Defines the message shapes exchanged between a yuzu server and its
//! clients, tolerant inbound parsing (unknown message types are ignored,
//! malformed payloads are reported), and the instance-scoped session logger
//! both peers use.

mod logger;
mod message;

pub use logger::{LogLevel, SessionLogger};
pub use message::{
    parse_client_message, parse_server_message, ClientMessage, ProtocolError, ServerMessage,
};
