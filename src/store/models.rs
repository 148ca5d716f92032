use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,  // surrogate key
    pub uid: i64, // public id, used by contact relations
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub description: Option<String>,
    pub gender: i16,
    pub last_login: i64, // unix seconds, 0 until the first login
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub description: Option<String>,
    pub gender: i16,
}

/// Pending, directional contact proposal.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FriendRequest {
    pub id: i64,
    pub from_user_uid: i64,
    pub to_user_uid: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Confirmed relationship row keyed by (user_uid, friend_uid).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Contact {
    pub user_uid: i64,
    pub friend_uid: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
