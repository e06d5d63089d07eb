//! Error types for the yuzu client.

use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised by the client session layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Construction-time misconfiguration.
    #[error("misconfigured client: {0}")]
    Misconfigured(String),

    /// Connecting or talking to the transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The token callback failed.
    #[error("token fetch failed: {0}")]
    Token(String),

    /// The requested operation needs a transport mode this client was not
    /// built with.
    #[error("unsupported in external transport mode: {0}")]
    ExternalMode(&'static str),

    /// Wire-level encode/decode failure.
    #[error(transparent)]
    Protocol(#[from] yuzu_protocol::ProtocolError),

    /// State tree failure.
    #[error(transparent)]
    State(#[from] yuzu_state::StateError),
}
