//! Persistence seam for users, contacts and friend requests.
//!
//! Handlers only see the traits; `PgStore` backs them in production and
//! `MemoryStore` in tests. Check-then-write sequences that must be atomic
//! (find-or-create by email, one pending request per ordered pair) are single
//! trait methods so each backend can resolve races itself.

use async_trait::async_trait;

pub mod models;
pub mod postgres;
#[cfg(test)]
pub mod memory;

pub use models::{Contact, FriendRequest, NewUser, User};
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert the user unless the email is taken. `None` means a row with that
    /// email already existed and nothing was written.
    async fn create_if_absent(&self, new_user: NewUser) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn find_by_uid(&self, uid: i64) -> anyhow::Result<Option<User>>;
    /// Persist the profile columns of `user`, keyed by its id. `last_login` is
    /// left alone; only `record_login` moves the token epoch.
    async fn save(&self, user: &User) -> anyhow::Result<()>;
    /// Move the login epoch to `max(now, last_login + 1)` in a single step and
    /// return it, so concurrent logins never share an epoch and it never moves
    /// backwards. `None` when no user with `id` exists.
    async fn record_login(&self, id: i64, now: i64) -> anyhow::Result<Option<i64>>;
    /// Returns the number of deleted rows.
    async fn delete_by_email(&self, email: &str) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn contact_exists(&self, user_uid: i64, friend_uid: i64) -> anyhow::Result<bool>;
    async fn request_exists(&self, from_uid: i64, to_uid: i64) -> anyhow::Result<bool>;
    /// `None` means a request for the same ordered pair was already pending.
    async fn create_request(
        &self,
        from_uid: i64,
        to_uid: i64,
    ) -> anyhow::Result<Option<FriendRequest>>;
    async fn incoming_requests(&self, to_uid: i64) -> anyhow::Result<Vec<FriendRequest>>;
}
