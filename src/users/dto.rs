use serde::{Deserialize, Serialize};

use crate::store::User;

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub uid: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub gender: i16,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            uid: u.uid,
            username: u.username,
            email: u.email,
            description: u.description,
            gender: u.gender,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub email: String,
}

/// Partial update: absent or empty fields keep the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct ModifyUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub description: Option<String>,
    pub gender: Option<i16>,
}
