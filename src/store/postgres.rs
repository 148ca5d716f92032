use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::{Contact, ContactStore, FriendRequest, NewUser, User, UserStore};

const USER_COLUMNS: &str =
    "id, uid, username, email, password_hash, description, gender, last_login, created_at";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_user_by(&self, column: &str, value: i64) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find user by {column}"))?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_if_absent(&self, new_user: NewUser) -> anyhow::Result<Option<User>> {
        // The unique index on email arbitrates concurrent registrations.
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password_hash, description, gender)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.description)
            .bind(new_user.gender)
            .fetch_optional(&self.db)
            .await
            .context("insert user")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        self.find_user_by("id", id).await
    }

    async fn find_by_uid(&self, uid: i64) -> anyhow::Result<Option<User>> {
        self.find_user_by("uid", uid).await
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET username = $2, email = $3, password_hash = $4,
                   description = $5, gender = $6
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.description)
        .bind(user.gender)
        .execute(&self.db)
        .await
        .context("save user")?;
        Ok(())
    }

    async fn record_login(&self, id: i64, now: i64) -> anyhow::Result<Option<i64>> {
        let epoch = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
               SET last_login = GREATEST($2, last_login + 1)
             WHERE id = $1
            RETURNING last_login
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("record login")?;
        Ok(epoch)
    }

    async fn delete_by_email(&self, email: &str) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn contact_exists(&self, user_uid: i64, friend_uid: i64) -> anyhow::Result<bool> {
        let row = sqlx::query_as::<_, Contact>(
            r#"
            SELECT user_uid, friend_uid, created_at
              FROM contacts
             WHERE user_uid = $1 AND friend_uid = $2
            "#,
        )
        .bind(user_uid)
        .bind(friend_uid)
        .fetch_optional(&self.db)
        .await
        .context("find contact")?;
        Ok(row.is_some())
    }

    async fn request_exists(&self, from_uid: i64, to_uid: i64) -> anyhow::Result<bool> {
        let row = sqlx::query_as::<_, FriendRequest>(
            r#"
            SELECT id, from_user_uid, to_user_uid, created_at
              FROM friend_requests
             WHERE from_user_uid = $1 AND to_user_uid = $2
            "#,
        )
        .bind(from_uid)
        .bind(to_uid)
        .fetch_optional(&self.db)
        .await
        .context("find friend request")?;
        Ok(row.is_some())
    }

    async fn create_request(
        &self,
        from_uid: i64,
        to_uid: i64,
    ) -> anyhow::Result<Option<FriendRequest>> {
        let row = sqlx::query_as::<_, FriendRequest>(
            r#"
            INSERT INTO friend_requests (from_user_uid, to_user_uid)
            VALUES ($1, $2)
            ON CONFLICT (from_user_uid, to_user_uid) DO NOTHING
            RETURNING id, from_user_uid, to_user_uid, created_at
            "#,
        )
        .bind(from_uid)
        .bind(to_uid)
        .fetch_optional(&self.db)
        .await
        .context("insert friend request")?;
        Ok(row)
    }

    async fn incoming_requests(&self, to_uid: i64) -> anyhow::Result<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, FriendRequest>(
            r#"
            SELECT id, from_user_uid, to_user_uid, created_at
              FROM friend_requests
             WHERE to_user_uid = $1
             ORDER BY created_at ASC
            "#,
        )
        .bind(to_uid)
        .fetch_all(&self.db)
        .await
        .context("list incoming friend requests")?;
        Ok(rows)
    }
}
