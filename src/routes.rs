use axum::{
    routing::{get, post},
    Router,
};

use crate::friends;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the full axum Router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler::ws_upgrade))
        .route("/api/friends/requests", post(friends::create_request))
        .route(
            "/api/friends/requests/{id}/accept",
            post(friends::accept_request),
        )
        .route(
            "/api/conversations/read",
            post(friends::mark_conversation_read),
        )
        .with_state(state)
}
