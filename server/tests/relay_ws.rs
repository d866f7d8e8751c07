//! End-to-end WebSocket tests for the inbox relay: a real server on a real
//! port, real clients, and the fan-out rules observed from the outside.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use huddle_auth::Authenticator;
use huddle_config::{AppConfig, AuthConfig};
use huddle_database::initialize_database;
use huddle_gateway::{create_router, GatewayState};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_TIMEOUT: Duration = Duration::from_millis(300);

/// Serve the app on an ephemeral port and return its ws base url.
async fn spawn_app() -> (String, TempDir) {
    let db_dir = TempDir::new().expect("create temp dir");
    let db_path = db_dir.path().join("huddle-ws-test.db");

    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", db_path.to_string_lossy());
    config.database.max_connections = 5;

    let pool = initialize_database(&config.database)
        .await
        .expect("initialise database");
    let authenticator = Authenticator::new(pool.clone(), AuthConfig::default());
    let state = GatewayState::new(pool, authenticator);
    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    (format!("ws://{address}"), db_dir)
}

async fn connect(base: &str, team: Option<&str>) -> WsClient {
    let url = match team {
        Some(team) => format!("{base}/ws?team_id={team}"),
        None => format!("{base}/ws"),
    };

    let (stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("ws connect");
    stream
}

/// Next text frame, skipping transport frames, within the receive timeout.
async fn recv_text(client: &mut WsClient) -> Option<String> {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match timeout(remaining, client.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(text),
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(_))) | Ok(None) => return None,
            Err(_) => return None,
        }
    }
}

/// Assert nothing arrives for a short window.
async fn assert_silent(client: &mut WsClient) {
    let result = timeout(SILENCE_TIMEOUT, client.next()).await;
    match result {
        Err(_) => {}
        Ok(Some(Ok(Message::Text(text)))) => panic!("expected silence, got frame: {text}"),
        Ok(_) => {}
    }
}

#[tokio::test]
async fn frames_fan_out_to_teammates_and_not_back_to_the_sender() {
    let (base, _db) = spawn_app().await;

    let mut a = connect(&base, Some("t1")).await;
    let mut b = connect(&base, Some("t1")).await;
    let mut x = connect(&base, Some("t2")).await;

    let frame = r#"{"body":"standup in five","author":"lena"}"#;
    a.send(Message::Text(frame.to_string())).await.unwrap();

    assert_eq!(recv_text(&mut b).await.as_deref(), Some(frame));
    assert_silent(&mut x).await;
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn empty_and_malformed_frames_relay_nothing_and_keep_the_connection() {
    let (base, _db) = spawn_app().await;

    let mut a = connect(&base, Some("t1")).await;
    let mut b = connect(&base, Some("t1")).await;

    a.send(Message::Text(r#"{"body":"   "}"#.to_string()))
        .await
        .unwrap();
    assert_silent(&mut b).await;

    a.send(Message::Text("definitely not json".to_string()))
        .await
        .unwrap();
    assert_silent(&mut b).await;

    // The connection survived both; a valid frame still goes through.
    let frame = r#"{"body":"still here"}"#;
    a.send(Message::Text(frame.to_string())).await.unwrap();
    assert_eq!(recv_text(&mut b).await.as_deref(), Some(frame));
}

#[tokio::test]
async fn connection_without_a_team_id_receives_nothing() {
    let (base, _db) = spawn_app().await;

    let mut lurker = connect(&base, None).await;
    let mut a = connect(&base, Some("t1")).await;
    let mut b = connect(&base, Some("t1")).await;

    a.send(Message::Text(r#"{"body":"team only"}"#.to_string()))
        .await
        .unwrap();

    assert!(recv_text(&mut b).await.is_some());
    assert_silent(&mut lurker).await;

    // And frames from the unsubscribed connection go nowhere.
    lurker
        .send(Message::Text(r#"{"body":"into the void"}"#.to_string()))
        .await
        .unwrap();
    assert_silent(&mut a).await;
    assert_silent(&mut b).await;
}

#[tokio::test]
async fn closed_peer_does_not_disrupt_remaining_subscribers() {
    let (base, _db) = spawn_app().await;

    let mut a = connect(&base, Some("t1")).await;
    let b = connect(&base, Some("t1")).await;
    let mut c = connect(&base, Some("t1")).await;

    drop(b);

    let frame = r#"{"body":"after b left"}"#;
    a.send(Message::Text(frame.to_string())).await.unwrap();

    assert_eq!(recv_text(&mut c).await.as_deref(), Some(frame));
}
