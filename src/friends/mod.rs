//! Friend-request transitions and their live-notification side effects.
//!
//! The CRUD surface here is deliberately thin — identity and the richer
//! listing/search endpoints live in an external service. What matters to
//! the real-time core is the side-effect contract: creating a request
//! broadcasts to the target, accepting broadcasts to both parties, and
//! acknowledging a conversation clears the unread flag silently.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::chat::broadcast::{broadcast_friend_request, broadcast_friend_request_accepted};
use crate::db::models::FriendRequestRow;
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub from_user: i64,
    pub to_user: i64,
}

#[derive(Debug, Serialize)]
pub struct FriendRequestResponse {
    pub id: i64,
    pub from_user: i64,
    pub to_user: i64,
    pub status: String,
}

impl From<&FriendRequestRow> for FriendRequestResponse {
    fn from(row: &FriendRequestRow) -> Self {
        Self {
            id: row.id,
            from_user: row.from_user,
            to_user: row.to_user,
            status: row.status.as_str().to_string(),
        }
    }
}

fn status_for(err: &StoreError) -> StatusCode {
    match err {
        StoreError::UnknownUser(_) | StoreError::UnknownRequest(_) => StatusCode::NOT_FOUND,
        StoreError::DuplicateRequest | StoreError::NotPending(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /api/friends/requests — create a pending friend request.
/// Side effect: broadcasts friend_request to the target's group.
pub async fn create_request(
    State(state): State<AppState>,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<FriendRequestResponse>), StatusCode> {
    if body.from_user == body.to_user {
        return Err(StatusCode::BAD_REQUEST);
    }

    let row = state
        .store
        .create_friend_request(body.from_user, body.to_user)
        .await
        .map_err(|e| {
            tracing::warn!(from = body.from_user, to = body.to_user, error = %e,
                "friend request create failed");
            status_for(&e)
        })?;

    broadcast_friend_request(state.broadcaster.as_ref(), row.to_user, row.from_user, row.id);

    Ok((StatusCode::CREATED, Json(FriendRequestResponse::from(&row))))
}

/// POST /api/friends/requests/{id}/accept — pending→accepted.
/// Side effect: broadcasts friend_request_accepted to both parties' groups.
pub async fn accept_request(
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
) -> Result<Json<FriendRequestResponse>, StatusCode> {
    let row = state
        .store
        .accept_friend_request(request_id)
        .await
        .map_err(|e| {
            tracing::warn!(request_id, error = %e, "friend request accept failed");
            status_for(&e)
        })?;

    for target in [row.from_user, row.to_user] {
        broadcast_friend_request_accepted(
            state.broadcaster.as_ref(),
            target,
            row.from_user,
            row.to_user,
            row.id,
        );
    }

    Ok(Json(FriendRequestResponse::from(&row)))
}

#[derive(Debug, Deserialize)]
pub struct MarkReadBody {
    pub user_id: i64,
    pub friend_id: i64,
}

/// POST /api/conversations/read — the recipient acknowledges a
/// conversation: message read flags are set and the unread flag toward
/// them is cleared. The true→false transition broadcasts nothing.
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    Json(body): Json<MarkReadBody>,
) -> Result<StatusCode, StatusCode> {
    state
        .store
        .mark_conversation_read(body.user_id, body.friend_id)
        .await
        .map_err(|e| {
            tracing::warn!(user_id = body.user_id, friend_id = body.friend_id, error = %e,
                "mark conversation read failed");
            status_for(&e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}
