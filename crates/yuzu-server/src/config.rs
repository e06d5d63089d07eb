//! Server configuration.

use async_trait::async_trait;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use yuzu_protocol::LogLevel;

/// Callback the server sends through in external transport mode.
///
/// The second argument is the client identifier for targeted sends (currently
/// only `complete` replies) and `None` for broadcasts.
pub type OutboundFn = Arc<dyn Fn(String, Option<String>) + Send + Sync>;

/// Error type an [`Authenticate`] hook may raise; raising one rejects the
/// upgrade with a server-error status rather than unauthorized.
pub type AuthError = Box<dyn std::error::Error + Send + Sync>;

/// What an [`Authenticate`] hook gets to look at during the upgrade
/// handshake.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Parsed query parameters from the upgrade URL.
    pub query: HashMap<String, String>,
    /// The underlying request headers.
    pub headers: HeaderMap,
    /// The `Origin` header, when present and valid UTF-8.
    pub origin: Option<String>,
}

impl ConnectRequest {
    /// The canonical `token` query parameter, if the client sent one.
    pub fn token(&self) -> Option<&str> {
        self.query.get("token").map(String::as_str)
    }
}

/// Connect-time authorization hook.
///
/// Runs during the upgrade handshake. `Ok(false)` rejects the upgrade with an
/// unauthorized status; `Err` with a server-error status.
#[async_trait]
pub trait Authenticate: Send + Sync {
    /// Decide whether this connection may be established.
    async fn check(&self, request: &ConnectRequest) -> Result<bool, AuthError>;
}

/// [`Authenticate`] implementation for plain async-free closures.
pub struct AuthFn<F>(pub F);

#[async_trait]
impl<F> Authenticate for AuthFn<F>
where
    F: Fn(&ConnectRequest) -> bool + Send + Sync,
{
    async fn check(&self, request: &ConnectRequest) -> Result<bool, AuthError> {
        Ok((self.0)(request))
    }
}

/// How the server reaches its clients.
pub enum TransportMode {
    /// The host owns the HTTP server and merges [`router`](crate::YuzuServer::router)
    /// into its own app.
    Attach,
    /// The library binds its own listener at this address.
    Bind {
        /// Address to bind.
        addr: SocketAddr,
    },
    /// The host wires any transport through callbacks; the library creates
    /// none.
    External {
        /// Invoked whenever the library wants to send.
        on_message: OutboundFn,
    },
}

impl TransportMode {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            TransportMode::Attach => "attach",
            TransportMode::Bind { .. } => "bind",
            TransportMode::External { .. } => "external",
        }
    }
}

impl std::fmt::Debug for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for a [`YuzuServer`](crate::YuzuServer).
///
/// A transport mode must be supplied; construction fails otherwise.
///
/// # Examples
///
/// ```
/// use yuzu_server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::attach()
///     .with_path("sync")
///     .with_batch_delay(Duration::from_millis(10));
/// assert_eq!(config.path, "/sync");
/// ```
pub struct ServerConfig {
    /// Transport mode. `None` fails construction.
    pub transport: Option<TransportMode>,
    /// URL path the WebSocket route is served at. A missing leading slash is
    /// prepended.
    pub path: String,
    /// Patch coalescing window; zero sends each patch immediately.
    pub batch_delay: Duration,
    /// Connect-time authorization hook.
    pub authenticate: Option<Arc<dyn Authenticate>>,
    /// Session log verbosity.
    pub log_level: LogLevel,
}

pub(crate) const DEFAULT_PATH: &str = "/api/yuzu";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: None,
            path: DEFAULT_PATH.to_string(),
            batch_delay: Duration::ZERO,
            authenticate: None,
            log_level: LogLevel::default(),
        }
    }
}

impl ServerConfig {
    /// Config for attaching to a host-owned HTTP server.
    pub fn attach() -> Self {
        Self {
            transport: Some(TransportMode::Attach),
            ..Self::default()
        }
    }

    /// Config for binding an own listener.
    pub fn bind(addr: SocketAddr) -> Self {
        Self {
            transport: Some(TransportMode::Bind { addr }),
            ..Self::default()
        }
    }

    /// Config for external transport mode.
    pub fn external(on_message: impl Fn(String, Option<String>) + Send + Sync + 'static) -> Self {
        Self {
            transport: Some(TransportMode::External {
                on_message: Arc::new(on_message),
            }),
            ..Self::default()
        }
    }

    /// Set the WebSocket route path, prepending a slash when missing.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    /// Set the patch coalescing window.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Set the connect-time authorization hook.
    pub fn with_authenticate(mut self, hook: impl Authenticate + 'static) -> Self {
        self.authenticate = Some(Arc::new(hook));
        self
    }

    /// Set the session log verbosity.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}
