//! Presence tracking: persisted online/offline transitions plus best-effort
//! notification of the user's accepted friends.
//!
//! One presence state is shared by all of a user's sessions. Connect always
//! marks the user online; offline is only persisted and broadcast once the
//! user's live session count reaches zero, so closing one of several tabs
//! never flaps presence.

use std::sync::Arc;

use chrono::Utc;

use crate::chat::broadcast::broadcast_online_status;
use crate::db::models::UserRow;
use crate::store::ChatStore;
use crate::ws::broadcast::GroupBroadcaster;
use crate::ws::registry::{ConnectionRegistry, GroupKey};

#[derive(Clone)]
pub struct PresenceTracker {
    store: ChatStore,
    broadcaster: Arc<dyn GroupBroadcaster>,
    registry: Arc<ConnectionRegistry>,
}

impl PresenceTracker {
    pub fn new(
        store: ChatStore,
        broadcaster: Arc<dyn GroupBroadcaster>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            store,
            broadcaster,
            registry,
        }
    }

    /// A session for `user` opened: persist online + last-seen, then tell
    /// the user's friends. The presence row is created on first sight.
    pub async fn on_connect(&self, user: &UserRow) {
        if let Err(e) = self.store.get_or_create_presence(user.id).await {
            tracing::warn!(user_id = user.id, error = %e, "presence row lookup failed");
            return;
        }
        if let Err(e) = self.store.set_presence(user.id, true, Utc::now()).await {
            tracing::warn!(user_id = user.id, error = %e, "failed to persist online status");
            return;
        }
        self.notify_friends(user, true).await;
    }

    /// A session for `user` closed. Skips the offline transition while
    /// other sessions of the same user remain registered.
    pub async fn on_disconnect(&self, user: &UserRow) {
        let remaining = self.registry.session_count(&GroupKey::User(user.id));
        if remaining > 0 {
            tracing::debug!(
                user_id = user.id,
                remaining,
                "sessions remain, keeping user online"
            );
            return;
        }

        match self.store.set_presence(user.id, false, Utc::now()).await {
            Ok(true) => {}
            Ok(false) => {
                // Presence row missing — log and move on, never fatal.
                tracing::warn!(user_id = user.id, "no presence row to mark offline");
                return;
            }
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "failed to persist offline status");
                return;
            }
        }
        self.notify_friends(user, false).await;
    }

    /// Best-effort fan-out of an online_status event to every accepted
    /// friend's group. Lookup failure is logged and swallowed.
    pub async fn notify_friends(&self, user: &UserRow, is_online: bool) {
        let friends = match self.store.accepted_friends(user.id).await {
            Ok(friends) => friends,
            Err(e) => {
                tracing::warn!(user_id = user.id, error = %e, "friend lookup failed");
                return;
            }
        };

        for friend in friends {
            broadcast_online_status(
                self.broadcaster.as_ref(),
                friend.id,
                user.id,
                &user.username,
                is_online,
            );
        }
    }
}
