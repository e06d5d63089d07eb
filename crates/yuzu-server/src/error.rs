//! Error types for the yuzu server.

use thiserror::Error;

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised by the server session layer.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Construction-time misconfiguration.
    #[error("misconfigured server: {0}")]
    Misconfigured(String),

    /// The requested operation needs a transport mode this server was not
    /// built with.
    #[error("unsupported in {mode} transport mode: {operation}")]
    WrongTransportMode {
        /// The configured mode.
        mode: &'static str,
        /// What was attempted.
        operation: &'static str,
    },

    /// Failure binding or serving the listener.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Wire-level encode/decode failure.
    #[error(transparent)]
    Protocol(#[from] yuzu_protocol::ProtocolError),

    /// State tree failure.
    #[error(transparent)]
    State(#[from] yuzu_state::StateError),
}
