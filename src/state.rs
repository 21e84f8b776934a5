use std::sync::Arc;

use crate::chat::presence::PresenceTracker;
use crate::db::DbPool;
use crate::store::ChatStore;
use crate::ws::broadcast::GroupBroadcaster;
use crate::ws::registry::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// Live WebSocket sessions per user group
    pub registry: Arc<ConnectionRegistry>,
    /// Fan-out path to connected sessions
    pub broadcaster: Arc<dyn GroupBroadcaster>,
    /// Persistence collaborator (users, messages, friends, presence rows)
    pub store: ChatStore,
    /// Online/offline transitions and friend notification
    pub presence: PresenceTracker,
}

impl AppState {
    /// Wire up the default single-process component graph.
    pub fn new(db: DbPool) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster: Arc<dyn GroupBroadcaster> =
            Arc::new(crate::ws::broadcast::LocalBroadcaster::new(registry.clone()));
        let store = ChatStore::new(db.clone());
        let presence = PresenceTracker::new(store.clone(), broadcaster.clone(), registry.clone());

        Self {
            db,
            registry,
            broadcaster,
            store,
            presence,
        }
    }
}
