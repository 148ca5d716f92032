use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::CurrentUser,
    contacts::{dto::MakeFriendRequest, services::submit_friend_request},
    envelope::Envelope,
    error::AppResult,
    extract::JsonBody,
    state::AppState,
    store::FriendRequest,
};

pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/contacts/request", post(make_friend))
        .route("/contacts/requests", get(pending_requests))
}

/// Sends a friend request; delivery of a notification to the target is not
/// wired up, the request row is the only trace.
#[instrument(skip_all)]
pub async fn make_friend(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<MakeFriendRequest>,
) -> AppResult<Json<Envelope<FriendRequest>>> {
    let request = submit_friend_request(&state, &user, payload.uid).await?;
    Ok(Json(Envelope::ok(request)))
}

/// Pending requests addressed to the current user, oldest first.
#[instrument(skip_all)]
pub async fn pending_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Envelope<Vec<FriendRequest>>>> {
    let requests = state.contacts.incoming_requests(user.uid).await?;
    Ok(Json(Envelope::ok(requests)))
}
