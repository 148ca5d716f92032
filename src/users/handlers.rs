use axum::{extract::State, routing::get, Json, Router};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        extractors::CurrentUser,
        password::hash_password,
        services::{is_valid_email, normalize_email},
    },
    envelope::Envelope,
    error::{AppError, AppResult, RuleViolation},
    extract::{JsonBody, QueryParams},
    state::AppState,
    users::dto::{ModifyUserRequest, PublicUser, UserQuery},
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route(
        "/user",
        get(get_user)
            .post(current_user)
            .patch(modify_user)
            .delete(delete_user),
    )
}

/// Blank input means "leave unchanged".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<UserQuery>,
) -> AppResult<Json<Envelope<PublicUser>>> {
    let email = normalize_email(&query.email);
    if email.is_empty() {
        return Err(AppError::Validation("email is empty".into()));
    }

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(RuleViolation::UserNotFound)?;
    Ok(Json(Envelope::ok(PublicUser::from(user))))
}

#[instrument(skip_all)]
pub async fn current_user(CurrentUser(user): CurrentUser) -> Json<Envelope<PublicUser>> {
    Json(Envelope::ok(PublicUser::from(user)))
}

/// Email changes are not re-checked against other users here; the store's
/// unique index is the only guard, and a clash surfaces as a storage error.
#[instrument(skip_all)]
pub async fn modify_user(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    JsonBody(payload): JsonBody<ModifyUserRequest>,
) -> AppResult<Json<Envelope<PublicUser>>> {
    if let Some(username) = non_empty(payload.username) {
        user.username = username;
    }
    if let Some(email) = non_empty(payload.email.map(|e| normalize_email(&e))) {
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }
        user.email = email;
    }
    if let Some(password) = non_empty(payload.password) {
        user.password_hash = hash_password(&password)?;
    }
    if let Some(description) = non_empty(payload.description) {
        user.description = Some(description);
    }
    if let Some(gender) = payload.gender {
        user.gender = gender;
    }

    state.users.save(&user).await?;

    info!(uid = user.uid, "user modified");
    Ok(Json(Envelope::ok(PublicUser::from(user))))
}

#[instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Envelope<()>>> {
    let deleted = state.users.delete_by_email(&user.email).await?;
    if deleted == 0 {
        warn!("user already gone");
    }
    info!(uid = user.uid, "user deleted");
    Ok(Json(Envelope::message("user deleted")))
}
