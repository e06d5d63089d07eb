//! The server session layer.
//!
//! A [`YuzuServer`] owns the authoritative state tree behind a mutation
//! tracker, a patch batcher, and the set of currently-open endpoints. Patches
//! flow tracker → batcher → broadcast; `complete` requests are answered with
//! a snapshot taken at service time and go to the requesting endpoint only.

use crate::batch::PatchBatcher;
use crate::config::{Authenticate, OutboundFn, ServerConfig, TransportMode};
use crate::error::{ServerError, ServerResult};
use crate::ws;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::mpsc;
use uuid::Uuid;
use yuzu_protocol::{parse_client_message, ClientMessage, ServerMessage, SessionLogger};
use yuzu_state::{StateWriter, Tracker};

/// The authoritative state server.
///
/// # Examples
///
/// External transport mode, wired by the host:
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use yuzu_server::{ServerConfig, YuzuServer};
/// use serde_json::json;
///
/// let outbox = Arc::new(Mutex::new(Vec::new()));
/// let sink = outbox.clone();
/// let server = YuzuServer::new(
///     json!({"count": 0}),
///     ServerConfig::external(move |msg, client| {
///         sink.lock().unwrap().push((msg, client));
///     }),
/// )
/// .unwrap();
///
/// server.state().child("count").set(5).unwrap();
/// let sent = outbox.lock().unwrap();
/// assert_eq!(sent[0].0, r#"{"type":"patch","patch":{"path":["count"],"value":5}}"#);
/// assert_eq!(sent[0].1, None); // broadcast
/// ```
///
/// Cloning is cheap and shares the same server.
#[derive(Clone)]
pub struct YuzuServer {
    inner: Arc<ServerInner>,
}

pub(crate) struct ServerInner {
    tracker: Tracker,
    batcher: PatchBatcher,
    pub(crate) connections: Mutex<HashMap<Uuid, mpsc::UnboundedSender<String>>>,
    pub(crate) authenticate: Option<Arc<dyn Authenticate>>,
    pub(crate) logger: SessionLogger,
    path: String,
    mode: Mode,
}

enum Mode {
    /// Attach or bind: the library's WebSocket route carries the traffic.
    Socket { addr: Option<SocketAddr> },
    /// Host-wired transport.
    External { on_message: OutboundFn },
}

/// Where a reply or broadcast should go.
pub(crate) enum Reply {
    Endpoint(Uuid),
    External(Option<String>),
}

impl YuzuServer {
    /// Create a server over an initial state tree.
    ///
    /// Fails when the configuration names no transport mode.
    pub fn new(initial: Value, config: ServerConfig) -> ServerResult<Self> {
        let Some(transport) = config.transport else {
            return Err(ServerError::Misconfigured(
                "one of attach, bind, or external transport must be supplied".into(),
            ));
        };
        let mode = match transport {
            TransportMode::Attach => Mode::Socket { addr: None },
            TransportMode::Bind { addr } => Mode::Socket { addr: Some(addr) },
            TransportMode::External { on_message } => Mode::External { on_message },
        };
        let logger = SessionLogger::new(config.log_level);

        let inner = Arc::new_cyclic(|weak: &Weak<ServerInner>| {
            let flush_target = weak.clone();
            let batcher = PatchBatcher::new(
                config.batch_delay,
                Arc::new(move |msg| {
                    if let Some(inner) = flush_target.upgrade() {
                        inner.broadcast(&msg);
                    }
                }),
            );

            let patch_target = weak.clone();
            let tracker = Tracker::new(
                initial,
                Arc::new(move |patch| {
                    if let Some(inner) = patch_target.upgrade() {
                        inner.batcher.submit(patch);
                    }
                }),
            );

            ServerInner {
                tracker,
                batcher,
                connections: Mutex::new(HashMap::new()),
                authenticate: config.authenticate,
                logger,
                path: config.path,
                mode,
            }
        });

        Ok(Self { inner })
    }

    /// Writer cursor at the state root. Every write through it is observed
    /// and synchronized.
    pub fn state(&self) -> StateWriter<'_> {
        self.inner.tracker.root()
    }

    /// Clone the current state tree.
    pub fn snapshot(&self) -> Value {
        self.inner.tracker.snapshot()
    }

    /// Number of currently-open endpoints (always zero in external mode).
    pub fn client_count(&self) -> usize {
        self.inner.connections.lock().unwrap().len()
    }

    /// The axum router carrying the WebSocket route, for hosts that attach
    /// the server to their own app.
    pub fn router(&self) -> ServerResult<axum::Router> {
        match &self.inner.mode {
            Mode::Socket { .. } => Ok(ws::router(self.inner.clone(), &self.inner.path)),
            Mode::External { .. } => Err(ServerError::WrongTransportMode {
                mode: "external",
                operation: "router",
            }),
        }
    }

    /// Bind the configured address and serve until the task is dropped.
    pub async fn serve(&self) -> ServerResult<()> {
        let Mode::Socket { addr: Some(addr) } = &self.inner.mode else {
            return Err(ServerError::WrongTransportMode {
                mode: self.mode_name(),
                operation: "serve",
            });
        };
        let listener = tokio::net::TcpListener::bind(*addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve_on(&self, listener: tokio::net::TcpListener) -> ServerResult<()> {
        let app = self.router()?;
        self.inner
            .logger
            .info(&format!("listening on {}", listener.local_addr()?));
        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Feed one inbound wire message in external transport mode.
    ///
    /// `client_id` identifies the sender for targeted replies. Malformed
    /// messages are logged and discarded; unknown types are ignored.
    pub fn handle_client_message(&self, raw: &str, client_id: Option<&str>) {
        match &self.inner.mode {
            Mode::External { .. } => self
                .inner
                .handle_inbound(raw, Reply::External(client_id.map(str::to_string))),
            Mode::Socket { .. } => self
                .inner
                .logger
                .warn("handle_client_message called outside external transport mode"),
        }
    }

    /// Drop every open endpoint.
    pub fn shutdown(&self) {
        let dropped = {
            let mut connections = self.inner.connections.lock().unwrap();
            let n = connections.len();
            connections.clear();
            n
        };
        self.inner
            .logger
            .info(&format!("shut down, dropped {dropped} endpoints"));
    }

    fn mode_name(&self) -> &'static str {
        match &self.inner.mode {
            Mode::Socket { addr: None } => "attach",
            Mode::Socket { addr: Some(_) } => "bind",
            Mode::External { .. } => "external",
        }
    }
}

impl std::fmt::Debug for YuzuServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YuzuServer")
            .field("mode", &self.mode_name())
            .field("clients", &self.client_count())
            .finish()
    }
}

impl ServerInner {
    pub(crate) fn register(&self, id: Uuid, tx: mpsc::UnboundedSender<String>) {
        self.connections.lock().unwrap().insert(id, tx);
        self.logger.info(&format!("endpoint {id} connected"));
    }

    pub(crate) fn unregister(&self, id: Uuid) {
        if self.connections.lock().unwrap().remove(&id).is_some() {
            self.logger.info(&format!("endpoint {id} disconnected"));
        }
    }

    /// Parse and dispatch one inbound message.
    pub(crate) fn handle_inbound(&self, raw: &str, reply: Reply) {
        match parse_client_message(raw) {
            Ok(Some(ClientMessage::Complete)) => {
                self.logger.debug("complete requested");
                let msg = ServerMessage::Complete {
                    state: self.tracker.snapshot(),
                };
                self.send_to(&msg, reply);
            }
            Ok(None) => self.logger.debug("ignoring unknown message type"),
            Err(e) => self.logger.error(&format!("discarding bad message: {e}")),
        }
    }

    /// Send a message to one endpoint.
    fn send_to(&self, msg: &ServerMessage, reply: Reply) {
        let Ok(text) = msg.encode() else {
            self.logger.error("failed to encode outbound message");
            return;
        };
        match (&self.mode, reply) {
            (Mode::Socket { .. }, Reply::Endpoint(id)) => {
                let connections = self.connections.lock().unwrap();
                if let Some(tx) = connections.get(&id) {
                    if tx.send(text).is_err() {
                        self.logger.warn(&format!("send to closing endpoint {id}"));
                    }
                }
            }
            (Mode::External { on_message }, Reply::External(client_id)) => {
                on_message(text, client_id);
            }
            _ => self.logger.warn("reply target does not match transport mode"),
        }
    }

    /// Send a message to every open endpoint.
    pub(crate) fn broadcast(&self, msg: &ServerMessage) {
        let Ok(text) = msg.encode() else {
            self.logger.error("failed to encode outbound message");
            return;
        };
        match &self.mode {
            Mode::Socket { .. } => {
                let mut dead = Vec::new();
                {
                    let connections = self.connections.lock().unwrap();
                    for (id, tx) in connections.iter() {
                        if tx.send(text.clone()).is_err() {
                            dead.push(*id);
                        }
                    }
                }
                for id in dead {
                    self.unregister(id);
                }
            }
            Mode::External { on_message } => on_message(text, None),
        }
    }
}
