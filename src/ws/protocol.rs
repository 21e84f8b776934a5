//! Inbound event routing: decode a JSON text frame from one session and
//! dispatch to the matching handler.
//!
//! Malformed events (unknown tag, missing required field) are dropped
//! silently — logged server-side, never surfaced to the client. Frames from
//! one session are handled one at a time in arrival order; the reader loop
//! awaits each dispatch before pulling the next frame.

use serde::Deserialize;

use crate::chat::broadcast::{
    broadcast_new_message, broadcast_new_message_dot, broadcast_typing_indicator,
};
use crate::chat::events::MessagePayload;
use crate::db::models::UserRow;
use crate::state::AppState;

/// Events a client may send over the socket, tagged by the `event` field.
/// Fields are optional at the wire level and validated per handler, so a
/// missing field drops the one event instead of failing the decode.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage {
        receiver_id: Option<i64>,
        content: Option<String>,
    },
    Typing {
        receiver_id: Option<i64>,
        #[serde(default)]
        is_typing: bool,
    },
}

/// Handle one inbound text frame from `user`'s session.
/// Anonymous sessions cannot trigger any of these events.
pub async fn handle_text_frame(text: &str, state: &AppState, user: Option<&UserRow>) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(error = %e, "dropping undecodable client event");
            return;
        }
    };

    let Some(user) = user else {
        tracing::debug!("dropping client event from anonymous session");
        return;
    };

    match event {
        ClientEvent::SendMessage {
            receiver_id,
            content,
        } => handle_send_message(state, user, receiver_id, content).await,
        ClientEvent::Typing {
            receiver_id,
            is_typing,
        } => handle_typing(state, user, receiver_id, is_typing),
    }
}

/// Persist the message, then fan out to both the receiver's group and the
/// sender's own group (so the sender's other open sessions see the echo).
/// The broadcast only happens after the insert committed; a persistence
/// failure kills this one send and nothing else.
async fn handle_send_message(
    state: &AppState,
    user: &UserRow,
    receiver_id: Option<i64>,
    content: Option<String>,
) {
    let (Some(receiver_id), Some(content)) = (receiver_id, content) else {
        tracing::debug!(user_id = user.id, "send_message missing receiver_id or content");
        return;
    };
    if content.is_empty() {
        tracing::debug!(user_id = user.id, "send_message with empty content");
        return;
    }

    let message = match state.store.create_message(user.id, receiver_id, content).await {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(
                user_id = user.id,
                receiver_id,
                error = %e,
                "failed to persist message, not broadcasting"
            );
            return;
        }
    };

    let payload = MessagePayload::from(&message);
    broadcast_new_message(state.broadcaster.as_ref(), receiver_id, payload.clone());
    broadcast_new_message(state.broadcaster.as_ref(), user.id, payload);

    // Unread-dot side effect: flipping the flag false→true notifies the
    // receiver's group. Best-effort, the message itself already went out.
    match state.store.flag_unread(user.id, receiver_id).await {
        Ok(true) => broadcast_new_message_dot(state.broadcaster.as_ref(), receiver_id),
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(
                user_id = user.id,
                receiver_id,
                error = %e,
                "failed to update unread flag"
            );
        }
    }
}

/// Typing indicator goes to the receiver's group only — no sender echo.
fn handle_typing(state: &AppState, user: &UserRow, receiver_id: Option<i64>, is_typing: bool) {
    let Some(receiver_id) = receiver_id else {
        tracing::debug!(user_id = user.id, "typing event missing receiver_id");
        return;
    };

    broadcast_typing_indicator(
        state.broadcaster.as_ref(),
        receiver_id,
        user.id,
        &user.username,
        is_typing,
    );
}
