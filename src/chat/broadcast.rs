//! Typed broadcast helpers for chat events.
//! Each wraps an event payload and hands it to the GroupBroadcaster for a
//! single target group.

use crate::chat::events::{MessagePayload, ServerEvent};
use crate::ws::broadcast::GroupBroadcaster;
use crate::ws::registry::GroupKey;

/// Deliver a new chat message to one party's sessions. Called once for the
/// receiver and once for the sender, so the sender's other open tabs see
/// the echo.
pub fn broadcast_new_message(
    broadcaster: &dyn GroupBroadcaster,
    target: i64,
    message: MessagePayload,
) {
    broadcaster.send(&GroupKey::User(target), &ServerEvent::NewMessage { message });
}

/// Deliver a typing indicator to the receiver's sessions only.
pub fn broadcast_typing_indicator(
    broadcaster: &dyn GroupBroadcaster,
    target: i64,
    user_id: i64,
    username: &str,
    is_typing: bool,
) {
    broadcaster.send(
        &GroupKey::User(target),
        &ServerEvent::TypingIndicator {
            user_id,
            username: username.to_string(),
            is_typing,
        },
    );
}

/// Presence change, delivered to each accepted friend's sessions.
pub fn broadcast_online_status(
    broadcaster: &dyn GroupBroadcaster,
    target: i64,
    user_id: i64,
    username: &str,
    is_online: bool,
) {
    broadcaster.send(
        &GroupKey::User(target),
        &ServerEvent::OnlineStatus {
            user_id,
            username: username.to_string(),
            is_online,
        },
    );
}

/// Notify the target of a newly created friend request.
pub fn broadcast_friend_request(
    broadcaster: &dyn GroupBroadcaster,
    target: i64,
    from_user: i64,
    request_id: i64,
) {
    broadcaster.send(
        &GroupKey::User(target),
        &ServerEvent::FriendRequest {
            from_user,
            request_id,
        },
    );
}

/// Notify one party that a friend request was accepted.
pub fn broadcast_friend_request_accepted(
    broadcaster: &dyn GroupBroadcaster,
    target: i64,
    from_user: i64,
    to_user: i64,
    request_id: i64,
) {
    broadcaster.send(
        &GroupKey::User(target),
        &ServerEvent::FriendRequestAccepted {
            from_user,
            to_user,
            request_id,
        },
    );
}

/// Unread-flag toggle notification, delivered to the party that now has
/// unseen messages.
pub fn broadcast_new_message_dot(broadcaster: &dyn GroupBroadcaster, target: i64) {
    broadcaster.send(&GroupKey::User(target), &ServerEvent::NewMessageDot);
}
