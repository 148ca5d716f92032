use serde::Deserialize;

/// Request body for a friend request.
#[derive(Debug, Deserialize)]
pub struct MakeFriendRequest {
    pub uid: i64,
}
