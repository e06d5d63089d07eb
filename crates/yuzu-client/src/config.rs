//! Client configuration.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use yuzu_protocol::LogLevel;

/// Callback the client sends through in external transport mode.
pub type ClientOutboundFn = Arc<dyn Fn(String) + Send + Sync>;

/// Source of the authentication token appended to the connect URL.
///
/// The callback form is consulted on every connect attempt, so rotated
/// tokens are picked up across reconnects.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Produce the current token value.
    async fn token(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// [`TokenProvider`] implementation for plain closures.
pub struct TokenFn<F>(pub F);

#[async_trait]
impl<F> TokenProvider for TokenFn<F>
where
    F: Fn() -> String + Send + Sync,
{
    async fn token(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok((self.0)())
    }
}

/// How the client reaches the server.
pub enum ClientTransportMode {
    /// The library owns a WebSocket to this address.
    Socket {
        /// Transport URL, e.g. `ws://host:4000/api/yuzu`.
        address: String,
    },
    /// The host moves the bytes; the library only sends through `on_message`.
    External {
        /// Invoked whenever the library wants to send.
        on_message: ClientOutboundFn,
    },
}

/// Configuration for a [`YuzuClient`](crate::YuzuClient).
///
/// # Examples
///
/// ```
/// use yuzu_client::{ClientConfig, TokenFn};
/// use std::time::Duration;
///
/// let config = ClientConfig::address("ws://localhost:4000/api/yuzu")
///     .with_reconnect_timeout(Duration::from_secs(1))
///     .with_get_token(TokenFn(|| "secret".to_string()));
/// ```
pub struct ClientConfig {
    /// Transport mode.
    pub transport: ClientTransportMode,
    /// Delay before retrying after an unexpected close.
    pub reconnect_timeout: Duration,
    /// Fixed token value. Ignored when `get_token` is also set.
    pub token: Option<String>,
    /// Token callback; takes precedence over `token`.
    pub get_token: Option<Arc<dyn TokenProvider>>,
    /// Session log verbosity.
    pub log_level: LogLevel,
}

pub(crate) const DEFAULT_RECONNECT_TIMEOUT: Duration = Duration::from_millis(3000);

impl ClientConfig {
    /// Config for a WebSocket connection to `address`.
    pub fn address(address: impl Into<String>) -> Self {
        Self {
            transport: ClientTransportMode::Socket {
                address: address.into(),
            },
            reconnect_timeout: DEFAULT_RECONNECT_TIMEOUT,
            token: None,
            get_token: None,
            log_level: LogLevel::default(),
        }
    }

    /// Config for external transport mode.
    pub fn external(on_message: impl Fn(String) + Send + Sync + 'static) -> Self {
        Self {
            transport: ClientTransportMode::External {
                on_message: Arc::new(on_message),
            },
            reconnect_timeout: DEFAULT_RECONNECT_TIMEOUT,
            token: None,
            get_token: None,
            log_level: LogLevel::default(),
        }
    }

    /// Set the reconnect delay.
    pub fn with_reconnect_timeout(mut self, timeout: Duration) -> Self {
        self.reconnect_timeout = timeout;
        self
    }

    /// Set a fixed token value.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the token callback. Takes precedence over a fixed token.
    pub fn with_get_token(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.get_token = Some(Arc::new(provider));
        self
    }

    /// Set the session log verbosity.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// The effective token source, if any: the callback wins when both are
    /// configured.
    pub(crate) fn token_source(&self) -> Option<TokenSource> {
        if let Some(provider) = &self.get_token {
            return Some(TokenSource::Callback(provider.clone()));
        }
        self.token.clone().map(TokenSource::Fixed)
    }
}

pub(crate) enum TokenSource {
    Fixed(String),
    Callback(Arc<dyn TokenProvider>),
}

impl TokenSource {
    pub(crate) async fn resolve(
        &self,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            TokenSource::Fixed(token) => Ok(token.clone()),
            TokenSource::Callback(provider) => provider.token().await,
        }
    }
}
