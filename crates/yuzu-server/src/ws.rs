//! Default WebSocket transport.
//!
//! One axum route at the configured path. The authentication hook runs during
//! the upgrade handshake; only an accepted upgrade reaches the socket pump,
//! which bridges the endpoint onto the session layer's connection registry.

use crate::config::ConnectRequest;
use crate::server::{Reply, ServerInner};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub(crate) fn router(inner: Arc<ServerInner>, path: &str) -> Router {
    Router::new().route(path, get(upgrade)).with_state(inner)
}

async fn upgrade(
    State(inner): State<Arc<ServerInner>>,
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(auth) = &inner.authenticate {
        let origin = headers
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let request = ConnectRequest {
            query,
            headers,
            origin,
        };
        match auth.check(&request).await {
            Ok(true) => {}
            Ok(false) => {
                inner.logger.warn("upgrade rejected: unauthorized");
                return StatusCode::UNAUTHORIZED.into_response();
            }
            Err(e) => {
                inner.logger.error(&format!("authenticate hook failed: {e}"));
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }
    ws.on_upgrade(move |socket| pump(inner, socket))
}

async fn pump(inner: Arc<ServerInner>, socket: WebSocket) {
    let id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    inner.register(id, tx);

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        // Registry entry gone: say goodbye properly.
        let _ = sink.send(Message::Close(None)).await;
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => inner.handle_inbound(&text, Reply::Endpoint(id)),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                inner
                    .logger
                    .error(&format!("endpoint {id} transport error: {e}"));
                break;
            }
        }
    }

    inner.unregister(id);
    writer.abort();
}
