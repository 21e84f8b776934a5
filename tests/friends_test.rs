//! Integration tests for friend-request transition broadcasts and the
//! unread-dot side effect.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use linkup_server::db::DbPool;
use linkup_server::routes::build_router;
use linkup_server::state::AppState;

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Helper: start the server on a random port and return (db, base_url, addr).
async fn start_test_server() -> (DbPool, String, SocketAddr) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = linkup_server::db::init_db(&data_dir).expect("Failed to init DB");
    let state = AppState::new(db.clone());
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
        let _keep = tmp_dir;
    });

    (db, format!("http://{}", addr), addr)
}

fn seed_user(db: &DbPool, username: &str) -> i64 {
    let conn = db.lock().unwrap();
    conn.execute(
        "INSERT INTO users (username) VALUES (?1)",
        rusqlite::params![username],
    )
    .unwrap();
    let id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO profiles (user_id, is_online, last_seen) VALUES (?1, 0, ?2)",
        rusqlite::params![id, Utc::now()],
    )
    .unwrap();
    id
}

fn seed_friendship(db: &DbPool, from_user: i64, to_user: i64, status: &str) -> i64 {
    let conn = db.lock().unwrap();
    conn.execute(
        "INSERT INTO friend_requests (from_user, to_user, status, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![from_user, to_user, status, Utc::now()],
    )
    .unwrap();
    conn.last_insert_rowid()
}

async fn connect_ws(addr: SocketAddr, user_id: i64) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws?user_id={}", addr, user_id))
        .await
        .expect("Failed to connect WebSocket");
    ws
}

async fn expect_event(ws: &mut WsClient, kind: &str) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(3), ws.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {} event", kind))
            .expect("stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = frame {
            let value: Value = serde_json::from_str(text.as_str()).unwrap();
            if value["event"] == kind {
                return value;
            }
        }
    }
}

async fn assert_no_event(ws: &mut WsClient, kind: &str, wait: Duration) {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return;
        }
        match tokio::time::timeout(remaining, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                let value: Value = serde_json::from_str(text.as_str()).unwrap();
                assert_ne!(value["event"], kind, "unexpected {} event: {}", kind, value);
            }
            Ok(Some(Ok(_))) => continue,
            _ => return,
        }
    }
}

#[tokio::test]
async fn creating_a_request_broadcasts_to_the_target() {
    let (db, base_url, addr) = start_test_server().await;
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");

    let mut bob_ws = connect_ws(addr, bob).await;
    // Give the server-side actor a beat to register the session
    tokio::time::sleep(Duration::from_millis(150)).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/friends/requests", base_url))
        .json(&json!({"from_user": alice, "to_user": bob}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "pending");

    let event = expect_event(&mut bob_ws, "friend_request").await;
    assert_eq!(event["from_user"], alice);
    assert_eq!(event["request_id"], body["id"]);
}

#[tokio::test]
async fn accepting_a_request_broadcasts_to_both_parties() {
    let (db, base_url, addr) = start_test_server().await;
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");
    let request_id = seed_friendship(&db, alice, bob, "pending");

    let mut alice_ws = connect_ws(addr, alice).await;
    let mut bob_ws = connect_ws(addr, bob).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!(
            "{}/api/friends/requests/{}/accept",
            base_url, request_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    for ws in [&mut alice_ws, &mut bob_ws] {
        let event = expect_event(ws, "friend_request_accepted").await;
        assert_eq!(event["from_user"], alice);
        assert_eq!(event["to_user"], bob);
        assert_eq!(event["request_id"], request_id);
    }
}

#[tokio::test]
async fn duplicate_request_is_rejected_in_either_direction() {
    let (db, base_url, _addr) = start_test_server().await;
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");
    seed_friendship(&db, alice, bob, "pending");

    let client = reqwest::Client::new();
    for (from, to) in [(alice, bob), (bob, alice)] {
        let resp = client
            .post(format!("{}/api/friends/requests", base_url))
            .json(&json!({"from_user": from, "to_user": to}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);
    }

    // Self-request is a bad request, unknown target a 404
    let resp = client
        .post(format!("{}/api/friends/requests", base_url))
        .json(&json!({"from_user": alice, "to_user": alice}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{}/api/friends/requests", base_url))
        .json(&json!({"from_user": alice, "to_user": 9999}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unread_dot_fires_once_until_conversation_is_read() {
    let (db, base_url, addr) = start_test_server().await;
    let alice = seed_user(&db, "alice");
    let bob = seed_user(&db, "bob");
    seed_friendship(&db, alice, bob, "accepted");

    let mut bob_ws = connect_ws(addr, bob).await;
    let mut alice_ws = connect_ws(addr, alice).await;
    expect_event(&mut bob_ws, "online_status").await;

    let send = |content: &str| {
        json!({"event": "send_message", "receiver_id": bob, "content": content}).to_string()
    };

    // First message flips the flag and fires the dot
    alice_ws.send(Message::text(send("one"))).await.unwrap();
    expect_event(&mut bob_ws, "new_message").await;
    expect_event(&mut bob_ws, "new_message_dot").await;

    // Second message finds the flag already set — no second dot
    alice_ws.send(Message::text(send("two"))).await.unwrap();
    expect_event(&mut bob_ws, "new_message").await;
    assert_no_event(&mut bob_ws, "new_message_dot", Duration::from_millis(400)).await;

    // Bob acknowledges the conversation; the clear broadcasts nothing
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/conversations/read", base_url))
        .json(&json!({"user_id": bob, "friend_id": alice}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

    let unread: i64 = {
        let conn = db.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE receiver = ?1 AND is_read = 0",
            rusqlite::params![bob],
            |row| row.get(0),
        )
        .unwrap()
    };
    assert_eq!(unread, 0);

    // Next message flips it again
    alice_ws.send(Message::text(send("three"))).await.unwrap();
    expect_event(&mut bob_ws, "new_message").await;
    expect_event(&mut bob_ws, "new_message_dot").await;
}
