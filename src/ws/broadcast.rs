//! Group fan-out: deliver one event to every live session of a target user.
//!
//! The broadcaster is behind a trait so handlers and the presence tracker
//! can be exercised against a test double, and so a distributed
//! implementation can be swapped in later without touching callers.

use std::sync::Arc;

use axum::extract::ws::Message;

use crate::chat::events::ServerEvent;
use crate::ws::registry::{ConnectionRegistry, GroupKey};

/// Delivery of one logical event to all sessions in a target group.
pub trait GroupBroadcaster: Send + Sync {
    /// Deliver `event` to every session currently in `target`'s group.
    /// Zero live sessions is a silent no-op — the target may simply be
    /// offline. A failed send to one session never affects its siblings.
    fn send(&self, target: &GroupKey, event: &ServerEvent);
}

/// In-process broadcaster: direct dispatch to sessions in the registry.
pub struct LocalBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl LocalBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

impl GroupBroadcaster for LocalBroadcaster {
    fn send(&self, target: &GroupKey, event: &ServerEvent) {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(group = %target, error = %e, "failed to serialize event");
                return;
            }
        };
        let msg = Message::Text(text.into());

        // Sessions whose channel has closed are skipped; the actor cleans
        // them out of the registry on disconnect.
        for sender in self.registry.sessions_of(target) {
            let _ = sender.send(msg.clone());
        }
    }
}
