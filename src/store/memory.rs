use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use super::{Contact, ContactStore, FriendRequest, NewUser, User, UserStore};

const FIRST_UID: i64 = 10_000;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    contacts: Vec<Contact>,
    requests: Vec<FriendRequest>,
    next_id: i64,
    next_uid: i64,
}

/// In-process store with the same constraints as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_contact(&self, user_uid: i64, friend_uid: i64) {
        self.tables.lock().contacts.push(Contact {
            user_uid,
            friend_uid,
            created_at: OffsetDateTime::now_utc(),
        });
    }

    pub fn request_count(&self) -> usize {
        self.tables.lock().requests.len()
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().users.len()
    }
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn next_uid(&mut self) -> i64 {
        let uid = FIRST_UID + self.next_uid;
        self.next_uid += 1;
        uid
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_if_absent(&self, new_user: NewUser) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.lock();
        if t.users.iter().any(|u| u.email == new_user.email) {
            return Ok(None);
        }
        let user = User {
            id: t.next_id(),
            uid: t.next_uid(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            description: new_user.description,
            gender: new_user.gender,
            last_login: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(Some(user))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.tables.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.tables.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_uid(&self, uid: i64) -> anyhow::Result<Option<User>> {
        Ok(self.tables.lock().users.iter().find(|u| u.uid == uid).cloned())
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        let mut t = self.tables.lock();
        if t.users.iter().any(|u| u.id != user.id && u.email == user.email) {
            anyhow::bail!("duplicate key value violates unique constraint \"users_email_key\"");
        }
        if let Some(row) = t.users.iter_mut().find(|u| u.id == user.id) {
            *row = User {
                last_login: row.last_login,
                created_at: row.created_at,
                ..user.clone()
            };
        }
        Ok(())
    }

    async fn record_login(&self, id: i64, now: i64) -> anyhow::Result<Option<i64>> {
        let mut t = self.tables.lock();
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|row| {
            row.last_login = now.max(row.last_login.saturating_add(1));
            row.last_login
        }))
    }

    async fn delete_by_email(&self, email: &str) -> anyhow::Result<u64> {
        let mut t = self.tables.lock();
        let before = t.users.len();
        t.users.retain(|u| u.email != email);
        Ok((before - t.users.len()) as u64)
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn contact_exists(&self, user_uid: i64, friend_uid: i64) -> anyhow::Result<bool> {
        Ok(self
            .tables
            .lock()
            .contacts
            .iter()
            .any(|c| c.user_uid == user_uid && c.friend_uid == friend_uid))
    }

    async fn request_exists(&self, from_uid: i64, to_uid: i64) -> anyhow::Result<bool> {
        Ok(self
            .tables
            .lock()
            .requests
            .iter()
            .any(|r| r.from_user_uid == from_uid && r.to_user_uid == to_uid))
    }

    async fn create_request(
        &self,
        from_uid: i64,
        to_uid: i64,
    ) -> anyhow::Result<Option<FriendRequest>> {
        let mut t = self.tables.lock();
        if t
            .requests
            .iter()
            .any(|r| r.from_user_uid == from_uid && r.to_user_uid == to_uid)
        {
            return Ok(None);
        }
        let request = FriendRequest {
            id: t.next_id(),
            from_user_uid: from_uid,
            to_user_uid: to_uid,
            created_at: OffsetDateTime::now_utc(),
        };
        t.requests.push(request.clone());
        Ok(Some(request))
    }

    async fn incoming_requests(&self, to_uid: i64) -> anyhow::Result<Vec<FriendRequest>> {
        Ok(self
            .tables
            .lock()
            .requests
            .iter()
            .filter(|r| r.to_user_uid == to_uid)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn login_epoch_never_moves_backwards() {
        let store = MemoryStore::new();
        let user = store
            .create_if_absent(NewUser {
                username: "a".into(),
                email: "a@x.com".into(),
                password_hash: "$argon2id$stub".into(),
                description: None,
                gender: 0,
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.record_login(user.id, 1_000).await.unwrap(), Some(1_000));
        assert_eq!(store.record_login(user.id, 1_000).await.unwrap(), Some(1_001));
        assert_eq!(store.record_login(user.id, 5).await.unwrap(), Some(1_002));
        assert_eq!(store.record_login(user.id + 1, 2_000).await.unwrap(), None);
    }
}
