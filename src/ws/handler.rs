use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    response::Response,
};
use serde::Deserialize;

use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for WebSocket connection. Identity issuance is handled
/// by an external service; the socket trusts the supplied user id.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub user_id: Option<i64>,
}

/// GET /ws?user_id=N
/// WebSocket upgrade endpoint. A missing or unresolvable user id is not
/// fatal: the session proceeds as anonymous — it joins the placeholder
/// group, receives no targeted events, and cannot trigger presence changes.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = match params.user_id {
        Some(user_id) => match state.store.user_by_id(user_id).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                tracing::warn!(user_id, "unknown user id at connect, proceeding anonymous");
                None
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "user lookup failed, proceeding anonymous");
                None
            }
        },
        None => None,
    };

    tracing::info!(
        user = ?identity.as_ref().map(|u| u.id),
        "WebSocket connect attempt"
    );

    ws.on_upgrade(move |socket| actor::run_connection(socket, state, identity))
}
