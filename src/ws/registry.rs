//! Connection registry: tracks all active WebSocket sessions per user.
//!
//! A user can have multiple concurrent sessions (multiple devices/tabs);
//! each is registered under the user's group. Sessions without a resolved
//! identity share the anonymous group and never receive targeted events.

use dashmap::DashMap;
use std::fmt;

use crate::ws::{ConnectionSender, SessionId};

/// Fan-out target: one user's bucket of live sessions, or the shared
/// placeholder bucket for unidentified connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    User(i64),
    Anonymous,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::User(id) => write!(f, "user_{}", id),
            GroupKey::Anonymous => write!(f, "user_anonymous"),
        }
    }
}

/// One registered session: its id plus the channel used to push frames to it.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub tx: ConnectionSender,
}

/// Registry of user group -> live sessions. Owned service object, injected
/// wherever session lookup is needed (never a process-wide singleton).
/// DashMap shards give per-group exclusion for concurrent join/leave.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    groups: DashMap<GroupKey, Vec<SessionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    /// Add a session to a group, creating the group if absent.
    /// Re-joining with the same session id replaces the previous handle.
    pub fn join(&self, group: GroupKey, handle: SessionHandle) {
        let mut sessions = self.groups.entry(group.clone()).or_default();
        sessions.retain(|s| s.id != handle.id);
        sessions.push(handle);

        tracing::debug!(group = %group, sessions = sessions.len(), "session joined");
    }

    /// Remove a session from a group. A no-op if the session (or the group)
    /// is already gone. Empty groups are reclaimed.
    pub fn leave(&self, group: &GroupKey, session: SessionId) {
        let mut remove_group = false;

        if let Some(mut sessions) = self.groups.get_mut(group) {
            sessions.retain(|s| s.id != session && !s.tx.is_closed());
            if sessions.is_empty() {
                remove_group = true;
            }
        }

        // The guard above must be dropped before removing the entry.
        if remove_group {
            self.groups.remove_if(group, |_, sessions| sessions.is_empty());
        }

        tracing::debug!(group = %group, "session left");
    }

    /// Snapshot of the live senders for a group (possibly empty).
    pub fn sessions_of(&self, group: &GroupKey) -> Vec<ConnectionSender> {
        self.groups
            .get(group)
            .map(|sessions| sessions.iter().map(|s| s.tx.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of live sessions in a group.
    pub fn session_count(&self, group: &GroupKey) -> usize {
        self.groups.get(group).map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn handle() -> (SessionHandle, mpsc::UnboundedReceiver<axum::extract::ws::Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SessionHandle {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    #[test]
    fn sessions_of_unknown_user_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.sessions_of(&GroupKey::User(42)).is_empty());
        assert_eq!(registry.session_count(&GroupKey::User(42)), 0);
    }

    #[test]
    fn join_and_leave_track_membership() {
        let registry = ConnectionRegistry::new();
        let (s1, _rx1) = handle();
        let (s2, _rx2) = handle();
        let group = GroupKey::User(1);

        registry.join(group.clone(), s1.clone());
        registry.join(group.clone(), s2.clone());
        assert_eq!(registry.session_count(&group), 2);

        registry.leave(&group, s1.id);
        assert_eq!(registry.session_count(&group), 1);

        // Remaining sender is s2's
        let senders = registry.sessions_of(&group);
        assert_eq!(senders.len(), 1);
        assert!(senders[0].same_channel(&s2.tx));
    }

    #[test]
    fn leave_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (s1, _rx1) = handle();
        let group = GroupKey::User(7);

        registry.join(group.clone(), s1.clone());
        registry.leave(&group, s1.id);
        registry.leave(&group, s1.id);
        assert!(registry.sessions_of(&group).is_empty());

        // Leaving a group that never existed is also fine
        registry.leave(&GroupKey::User(99), s1.id);
    }

    #[test]
    fn duplicate_join_replaces_handle() {
        let registry = ConnectionRegistry::new();
        let (s1, _rx1) = handle();
        let group = GroupKey::User(3);

        registry.join(group.clone(), s1.clone());
        registry.join(group.clone(), s1.clone());
        assert_eq!(registry.session_count(&group), 1);
    }

    #[test]
    fn empty_group_is_reclaimed() {
        let registry = ConnectionRegistry::new();
        let (s1, _rx1) = handle();
        let group = GroupKey::Anonymous;

        registry.join(group.clone(), s1.clone());
        registry.leave(&group, s1.id);
        assert_eq!(registry.groups.len(), 0);
    }
}
