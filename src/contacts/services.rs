use tracing::{debug, info};

use crate::{
    error::{AppResult, RuleViolation},
    state::AppState,
    store::{FriendRequest, User},
};

/// Record a pending request from `requester` to `target_uid`.
///
/// Checks run cheapest first and the first failure wins; nothing is written
/// unless every check passed.
pub async fn submit_friend_request(
    state: &AppState,
    requester: &User,
    target_uid: i64,
) -> AppResult<FriendRequest> {
    if target_uid == requester.uid {
        return Err(RuleViolation::SelfRequest.into());
    }

    let target = state
        .users
        .find_by_uid(target_uid)
        .await?
        .ok_or(RuleViolation::TargetNotFound)?;

    if state.contacts.contact_exists(requester.uid, target.uid).await? {
        return Err(RuleViolation::AlreadyContact.into());
    }

    if state.contacts.request_exists(requester.uid, target.uid).await? {
        return Err(RuleViolation::DuplicateRequest { to_uid: target.uid }.into());
    }

    // A concurrent submit can still win between the check and the insert.
    let Some(request) = state.contacts.create_request(requester.uid, target.uid).await? else {
        debug!(to_uid = target.uid, "lost race on friend request insert");
        return Err(RuleViolation::DuplicateRequest { to_uid: target.uid }.into());
    };

    info!(
        from_uid = request.from_user_uid,
        to_uid = request.to_user_uid,
        "friend request recorded"
    );
    Ok(request)
}
