use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::db::models::UserRow;
use crate::state::AppState;
use crate::ws::protocol;
use crate::ws::registry::{GroupKey, SessionHandle};

/// Ping interval: server sends WebSocket ping every 30 seconds.
/// Prevents connection leaks from abrupt disconnects.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if pong not received within 10 seconds after ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the actor-per-connection pattern for one WebSocket session.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader task: processes incoming frames one at a time, in order
///
/// The mpsc channel allows any part of the system to push events to this
/// client by cloning the sender. `identity` is None for anonymous sessions,
/// which join the placeholder group and trigger no presence changes.
pub async fn run_connection(socket: WebSocket, state: AppState, identity: Option<UserRow>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let group = match &identity {
        Some(user) => GroupKey::User(user.id),
        None => GroupKey::Anonymous,
    };
    let session_id = Uuid::new_v4();

    // Register this session in the connection registry, then flip presence.
    state.registry.join(
        group.clone(),
        SessionHandle {
            id: session_id,
            tx: tx.clone(),
        },
    );
    if let Some(user) = &identity {
        state.presence.on_connect(user).await;
    }

    tracing::info!(group = %group, session = %session_id, "WebSocket actor started");

    // Spawn writer task: forwards mpsc messages to the WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: inbound frames for this session are strictly sequential —
    // each dispatch completes before the next frame is pulled.
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_frame(text.as_str(), &state, identity.as_ref()).await;
                }
                Message::Binary(_) => {
                    tracing::debug!(group = %group, "ignoring binary frame (protocol is JSON text)");
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(group = %group, reason = ?frame, "client initiated close");
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(group = %group, error = %e, "WebSocket receive error");
                break;
            }
            None => {
                tracing::info!(group = %group, "WebSocket stream ended");
                break;
            }
        }
    }

    // Cleanup: abort writer and ping tasks
    writer_handle.abort();
    ping_handle.abort();

    // Deregister first so the presence tracker sees the remaining session
    // count, then run the offline transition exactly once.
    state.registry.leave(&group, session_id);
    if let Some(user) = &identity {
        state.presence.on_disconnect(user).await;
    }

    tracing::info!(group = %group, session = %session_id, "WebSocket actor stopped");
}

/// Writer task: receives messages from the mpsc channel and forwards them
/// to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
