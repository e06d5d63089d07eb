//! End-to-end synchronization over real WebSockets: handshake, live patches,
//! authentication, and token refresh across reconnects.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use yuzu_client::{ClientConfig, TokenFn, YuzuClient};
use yuzu_server::{AuthFn, ServerConfig, YuzuServer};
use yuzu_state::path;

/// Spawn a server on an ephemeral port; answer its WebSocket address.
async fn spawn_server(server: &YuzuServer) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = server.clone();
    tokio::spawn(async move {
        let _ = server.serve_on(listener).await;
    });
    format!("ws://{addr}/api/yuzu")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test]
async fn test_handshake_mirrors_full_state() {
    let server = YuzuServer::new(
        json!({"count": 7, "items": ["a"]}),
        ServerConfig::attach(),
    )
    .unwrap();
    let address = spawn_server(&server).await;

    let client = YuzuClient::new(ClientConfig::address(address)).unwrap();
    client.connect().await.unwrap();

    assert!(client.is_connected());
    let mirror = client.clone();
    wait_until(move || mirror.state() == json!({"count": 7, "items": ["a"]})).await;

    client.disconnect();
}

#[tokio::test]
async fn test_live_patches_reach_subscribers() {
    let server = YuzuServer::new(json!({"count": 0}), ServerConfig::attach()).unwrap();
    let address = spawn_server(&server).await;

    let client = YuzuClient::new(ClientConfig::address(address)).unwrap();
    client.connect().await.unwrap();
    let mirror = client.clone();
    wait_until(move || mirror.state() == json!({"count": 0})).await;

    let firings: Arc<Mutex<Vec<Option<Value>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = firings.clone();
    let _sub = client.subscribe(path!("count"), move |value, _| {
        sink.lock().unwrap().push(value.cloned());
    });

    let waiting = server.clone();
    wait_until(move || waiting.client_count() == 1).await;
    server.state().child("count").set(41).unwrap();
    server.state().child("count").set(42).unwrap();

    let observed = firings.clone();
    wait_until(move || observed.lock().unwrap().len() == 2).await;
    assert_eq!(
        *firings.lock().unwrap(),
        vec![Some(json!(41)), Some(json!(42))]
    );

    client.disconnect();
}

#[tokio::test]
async fn test_unauthorized_token_rejects_connect() {
    let server = YuzuServer::new(
        json!({}),
        ServerConfig::attach()
            .with_authenticate(AuthFn(|req: &yuzu_server::ConnectRequest| req.token() == Some("letmein"))),
    )
    .unwrap();
    let address = spawn_server(&server).await;

    let denied = YuzuClient::new(
        ClientConfig::address(address.clone()).with_token("wrong"),
    )
    .unwrap();
    assert!(denied.connect().await.is_err());
    assert!(!denied.is_connected());
    denied.disconnect();

    let allowed = YuzuClient::new(ClientConfig::address(address).with_token("letmein")).unwrap();
    allowed.connect().await.unwrap();
    assert!(allowed.is_connected());
    allowed.disconnect();
}

#[tokio::test]
async fn test_token_value_is_percent_encoded() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let capture = seen.clone();
    let server = YuzuServer::new(
        json!({}),
        ServerConfig::attach().with_authenticate(AuthFn(move |req: &yuzu_server::ConnectRequest| {
            capture
                .lock()
                .unwrap()
                .push(req.token().unwrap_or_default().to_string());
            true
        })),
    )
    .unwrap();
    let address = spawn_server(&server).await;

    let client = YuzuClient::new(
        ClientConfig::address(address).with_token("va lue&x=1"),
    )
    .unwrap();
    client.connect().await.unwrap();

    // The query decoder hands the original value back to the auth hook.
    assert_eq!(*seen.lock().unwrap(), vec!["va lue&x=1".to_string()]);
    client.disconnect();
}

#[tokio::test]
async fn test_reconnect_refreshes_token() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let capture = seen.clone();
    let server = YuzuServer::new(
        json!({"v": 1}),
        ServerConfig::attach().with_authenticate(AuthFn(move |req: &yuzu_server::ConnectRequest| {
            capture
                .lock()
                .unwrap()
                .push(req.token().unwrap_or_default().to_string());
            true
        })),
    )
    .unwrap();
    let address = spawn_server(&server).await;

    let counter = AtomicU64::new(0);
    let client = YuzuClient::new(
        ClientConfig::address(address)
            .with_reconnect_timeout(Duration::from_millis(100))
            .with_get_token(TokenFn(move || {
                format!("token-{}", counter.fetch_add(1, Ordering::SeqCst) + 1)
            })),
    )
    .unwrap();
    client.connect().await.unwrap();

    let waiting = server.clone();
    wait_until(move || waiting.client_count() == 1).await;

    // Server drops every endpoint; the client comes back by itself with a
    // freshly fetched token.
    server.shutdown();
    let observed = seen.clone();
    wait_until(move || observed.lock().unwrap().len() >= 2).await;

    let tokens = seen.lock().unwrap().clone();
    assert_eq!(tokens[0], "token-1");
    assert_eq!(tokens[1], "token-2");

    let mirror = client.clone();
    wait_until(move || mirror.is_connected()).await;
    client.disconnect();
}

#[tokio::test]
async fn test_disconnect_suppresses_auto_reconnect() {
    let server = YuzuServer::new(json!({}), ServerConfig::attach()).unwrap();
    let address = spawn_server(&server).await;

    let client = YuzuClient::new(
        ClientConfig::address(address).with_reconnect_timeout(Duration::from_millis(50)),
    )
    .unwrap();
    client.connect().await.unwrap();
    let waiting = server.clone();
    wait_until(move || waiting.client_count() == 1).await;

    client.disconnect();
    assert!(!client.is_connected());

    // Give a would-be reconnect timer ample room to misfire.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!client.is_connected());
    assert_eq!(server.client_count(), 0);
}

#[tokio::test]
async fn test_explicit_reconnect_resyncs_state() {
    let server = YuzuServer::new(json!({"v": 1}), ServerConfig::attach()).unwrap();
    let address = spawn_server(&server).await;

    let client = YuzuClient::new(ClientConfig::address(address)).unwrap();
    client.connect().await.unwrap();
    let mirror = client.clone();
    wait_until(move || mirror.state() == json!({"v": 1})).await;

    // State moves while we are still connected; reconnect lands on the new
    // snapshot either way.
    server.state().child("v").set(2).unwrap();
    client.reconnect().await.unwrap();

    let mirror = client.clone();
    wait_until(move || mirror.state() == json!({"v": 2})).await;
    assert!(client.is_connected());
    client.disconnect();
}
