//! The client session layer.
//!
//! A [`YuzuClient`] keeps a read-only mirror of the server's state tree. On
//! every connect it sends the `complete` handshake, replaces the mirror with
//! the reply, and from then on applies incoming patches, fanning out to
//! subscribed listeners. An unexpected close schedules exactly one reconnect
//! timer; `disconnect` and `reconnect` cancel it first.

use crate::config::{ClientConfig, ClientOutboundFn, ClientTransportMode, TokenSource};
use crate::error::{ClientError, ClientResult};
use crate::registry::{Listener, SubscriptionRegistry};
use crate::subscription::Subscription;
use crate::view::StateView;
use futures_util::{SinkExt, StreamExt};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use yuzu_protocol::{parse_server_message, ClientMessage, ServerMessage, SessionLogger};
use yuzu_state::{apply_patch, read_path_existing, read_path_optional, DocCell, Path};

/// A synchronized, read-only mirror of a yuzu server's state tree.
///
/// Cloning is cheap and shares the same session.
///
/// # Examples
///
/// External transport mode, wired by the host:
///
/// ```
/// use yuzu_client::{ClientConfig, YuzuClient};
/// use yuzu_state::path;
/// use serde_json::json;
///
/// let client = YuzuClient::new(ClientConfig::external(|_msg| {})).unwrap();
///
/// let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let _sub = client.subscribe(path!("count"), move |value, _| {
///     sink.lock().unwrap().push(value.cloned());
/// });
///
/// client.handle_server_message(r#"{"type":"patch","patch":{"path":["count"],"value":5}}"#);
///
/// assert_eq!(client.state(), json!({"count": 5}));
/// assert_eq!(*seen.lock().unwrap(), vec![Some(json!(5))]);
/// ```
#[derive(Clone)]
pub struct YuzuClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) mirror: DocCell,
    pub(crate) registry: Arc<SubscriptionRegistry>,
    logger: SessionLogger,
    mode: Mode,
    reconnect_timeout: Duration,
    token: Option<TokenSource>,
    connected: watch::Sender<bool>,
    /// Live outbound channel, tagged with the generation it belongs to.
    conn: Mutex<Option<(u64, mpsc::UnboundedSender<Outgoing>)>>,
    conn_epoch: AtomicU64,
    reconnect_timer: Mutex<Option<JoinHandle<()>>>,
    /// Set while a close is user-initiated, suppressing auto-reconnect.
    closing: AtomicBool,
}

enum Mode {
    Socket { address: String },
    External { on_message: ClientOutboundFn },
}

enum Outgoing {
    Text(String),
    Close,
}

impl YuzuClient {
    /// Create a client. The session starts disconnected; call
    /// [`connect`](Self::connect) to open the transport.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let token = config.token_source();
        let mode = match config.transport {
            ClientTransportMode::Socket { address } => {
                if address.is_empty() {
                    return Err(ClientError::Misconfigured(
                        "address must not be empty".into(),
                    ));
                }
                Mode::Socket { address }
            }
            ClientTransportMode::External { on_message } => Mode::External { on_message },
        };
        let (connected, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(ClientInner {
                mirror: DocCell::default(),
                registry: SubscriptionRegistry::new(),
                logger: SessionLogger::new(config.log_level),
                mode,
                reconnect_timeout: config.reconnect_timeout,
                token,
                connected,
                conn: Mutex::new(None),
                conn_epoch: AtomicU64::new(0),
                reconnect_timer: Mutex::new(None),
                closing: AtomicBool::new(false),
            }),
        })
    }

    /// Open the transport and run the `complete` handshake.
    ///
    /// A failed attempt schedules the reconnect timer before returning the
    /// error. No-op in external transport mode.
    pub async fn connect(&self) -> ClientResult<()> {
        if matches!(self.inner.mode, Mode::External { .. }) {
            return Ok(());
        }
        attempt_connect(self.inner.clone()).await
    }

    /// Close the transport without auto-reconnect. Cancels any pending
    /// reconnect timer. No-op in external transport mode.
    pub fn disconnect(&self) {
        if matches!(self.inner.mode, Mode::External { .. }) {
            return;
        }
        self.inner.closing.store(true, Ordering::SeqCst);
        self.inner.cancel_reconnect();
        let conn = self.inner.conn.lock().unwrap().take();
        if let Some((_, tx)) = conn {
            let _ = tx.send(Outgoing::Close);
        }
        self.inner.set_connected(false);
    }

    /// Close and immediately reopen the transport. No-op in external
    /// transport mode.
    pub async fn reconnect(&self) -> ClientResult<()> {
        if matches!(self.inner.mode, Mode::External { .. }) {
            return Ok(());
        }
        self.disconnect();
        attempt_connect(self.inner.clone()).await
    }

    /// Whether the transport is currently open. Always false in external
    /// transport mode.
    pub fn is_connected(&self) -> bool {
        *self.inner.connected.borrow()
    }

    /// Watch connectivity changes.
    pub fn connected_watch(&self) -> watch::Receiver<bool> {
        self.inner.connected.subscribe()
    }

    /// Clone the current mirror.
    pub fn state(&self) -> Value {
        self.inner.mirror.snapshot()
    }

    /// Read the value at `path`, failing if any segment is missing.
    pub fn read_existing(&self, path: &Path) -> ClientResult<Value> {
        let doc = self.inner.mirror.get();
        Ok(read_path_existing(&doc, path)?.into_value())
    }

    /// Read the value at `path`, answering `None` when missing.
    pub fn read_optional(&self, path: &Path) -> Option<Value> {
        let doc = self.inner.mirror.get();
        read_path_optional(&doc, path).map(|v| v.into_value())
    }

    /// Subscribable projection cursor at the mirror root.
    pub fn view(&self) -> StateView {
        StateView::new(self.inner.clone(), Path::root())
    }

    /// Register a listener at `path`; it fires for every patch whose path it
    /// prefixes, and on every `complete` reload.
    pub fn subscribe(
        &self,
        path: Path,
        listener: impl Fn(Option<&Value>, &Path) + Send + Sync + 'static,
    ) -> Subscription {
        let listener: Listener = Arc::new(listener);
        self.inner.registry.add(path, listener)
    }

    /// Register a listener at the root: it fires for every patch.
    pub fn on_any(
        &self,
        listener: impl Fn(Option<&Value>, &Path) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(Path::root(), listener)
    }

    /// Ask the server for a fresh full snapshot.
    ///
    /// Sent automatically on every connect; in external transport mode the
    /// host decides when to call this.
    pub fn request_complete(&self) -> ClientResult<()> {
        let text = ClientMessage::Complete.encode()?;
        match &self.inner.mode {
            Mode::External { on_message } => {
                on_message(text);
                Ok(())
            }
            Mode::Socket { .. } => {
                let conn = self.inner.conn.lock().unwrap();
                let Some((_, tx)) = &*conn else {
                    return Err(ClientError::Transport("not connected".into()));
                };
                tx.send(Outgoing::Text(text))
                    .map_err(|_| ClientError::Transport("connection closing".into()))
            }
        }
    }

    /// Feed one inbound wire message in external transport mode.
    ///
    /// Malformed messages are logged and discarded; unknown types are
    /// ignored.
    pub fn handle_server_message(&self, raw: &str) {
        self.inner.handle_raw(raw);
    }
}

impl std::fmt::Debug for YuzuClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YuzuClient")
            .field("connected", &self.is_connected())
            .field("listeners", &self.inner.registry.len())
            .finish()
    }
}

impl ClientInner {
    fn set_connected(&self, connected: bool) {
        self.connected.send_replace(connected);
    }

    fn cancel_reconnect(&self) {
        if let Some(timer) = self.reconnect_timer.lock().unwrap().take() {
            timer.abort();
        }
    }

    /// Arm the single reconnect timer, unless one is already pending.
    fn schedule_reconnect(self: &Arc<Self>) {
        let mut timer = self.reconnect_timer.lock().unwrap();
        if timer.is_some() {
            return;
        }
        let inner = self.clone();
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.reconnect_timeout).await;
            *inner.reconnect_timer.lock().unwrap() = None;
            inner.logger.info("reconnecting");
            let _ = attempt_connect(inner.clone()).await;
        }));
    }

    /// Reader task epilogue: deregister this generation's channel and decide
    /// whether to auto-reconnect.
    fn connection_lost(self: &Arc<Self>, epoch: u64) {
        {
            let mut conn = self.conn.lock().unwrap();
            match &*conn {
                Some((current, _)) if *current == epoch => {}
                // A newer connection took over; nothing to do.
                _ => return,
            }
            *conn = None;
        }
        self.set_connected(false);
        if !self.closing.load(Ordering::SeqCst) {
            self.logger.warn("connection lost");
            self.schedule_reconnect();
        }
    }

    /// Build the connect URL, consulting the token source for this attempt.
    async fn connect_url(&self) -> ClientResult<String> {
        let Mode::Socket { address } = &self.mode else {
            return Err(ClientError::ExternalMode("connect"));
        };
        let Some(source) = &self.token else {
            return Ok(address.clone());
        };
        let token = source
            .resolve()
            .await
            .map_err(|e| ClientError::Token(e.to_string()))?;
        let encoded = utf8_percent_encode(&token, NON_ALPHANUMERIC);
        let separator = if address.contains('?') { '&' } else { '?' };
        Ok(format!("{address}{separator}token={encoded}"))
    }

    /// Parse and dispatch one inbound message.
    pub(crate) fn handle_raw(&self, raw: &str) {
        match parse_server_message(raw) {
            Ok(Some(ServerMessage::Complete { state })) => {
                self.logger.debug("full state received");
                self.mirror.replace(state);
                let doc = self.mirror.snapshot();
                self.registry.notify_all(&doc);
            }
            Ok(Some(ServerMessage::Patch { patch })) => {
                {
                    let mut doc = self.mirror.get();
                    if let Err(e) = apply_patch(&mut doc, &patch) {
                        self.logger.error(&format!("discarding bad patch: {e}"));
                        return;
                    }
                }
                let doc = self.mirror.snapshot();
                self.registry.notify_single(&doc, &patch.path);
            }
            Ok(Some(ServerMessage::PatchBatch { patches })) => {
                {
                    let mut doc = self.mirror.get();
                    for patch in &patches {
                        if let Err(e) = apply_patch(&mut doc, patch) {
                            self.logger.error(&format!("discarding bad patch: {e}"));
                        }
                    }
                }
                let doc = self.mirror.snapshot();
                let paths: Vec<Path> = patches.into_iter().map(|p| p.path).collect();
                self.registry.notify_batch(&doc, &paths);
            }
            Ok(None) => self.logger.debug("ignoring unknown message type"),
            Err(e) => self.logger.error(&format!("discarding bad message: {e}")),
        }
    }
}

/// One connect attempt: resolve the token, open the socket, run the
/// handshake, and start the pump tasks. Failure schedules the reconnect
/// timer.
async fn attempt_connect(inner: Arc<ClientInner>) -> ClientResult<()> {
    inner.cancel_reconnect();
    inner.closing.store(false, Ordering::SeqCst);

    match open_socket(&inner).await {
        Ok(()) => Ok(()),
        Err(e) => {
            inner.logger.warn(&format!("connect failed: {e}"));
            if !inner.closing.load(Ordering::SeqCst) {
                inner.schedule_reconnect();
            }
            Err(e)
        }
    }
}

async fn open_socket(inner: &Arc<ClientInner>) -> ClientResult<()> {
    let url = inner.connect_url().await?;
    let (socket, _) = connect_async(url.as_str())
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    let (mut sink, mut stream) = socket.split();

    let epoch = inner.conn_epoch.fetch_add(1, Ordering::SeqCst) + 1;
    let (tx, mut rx) = mpsc::unbounded_channel::<Outgoing>();
    *inner.conn.lock().unwrap() = Some((epoch, tx.clone()));

    tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            match out {
                Outgoing::Text(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                Outgoing::Close => break,
            }
        }
        // Channel drained or dropped: close the socket properly.
        let _ = sink.send(Message::Close(None)).await;
    });

    tx.send(Outgoing::Text(ClientMessage::Complete.encode()?))
        .map_err(|_| ClientError::Transport("connection closed during handshake".into()))?;
    inner.set_connected(true);
    inner.logger.info("connected");

    let reader = inner.clone();
    tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => reader.handle_raw(&text),
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    reader.logger.error(&format!("transport error: {e}"));
                    break;
                }
            }
        }
        reader.connection_lost(epoch);
    });

    Ok(())
}
