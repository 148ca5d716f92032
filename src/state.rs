use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::config::JwtConfig;
use crate::store::{ContactStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub contacts: Arc<dyn ContactStore>,
    pub keys: Arc<JwtKeys>,
}

impl AppState {
    pub fn new<S>(jwt: &JwtConfig, store: Arc<S>) -> Self
    where
        S: UserStore + ContactStore + 'static,
    {
        Self {
            users: store.clone(),
            contacts: store,
            keys: Arc::new(JwtKeys::from_config(jwt)),
        }
    }

    /// State over an empty [`MemoryStore`](crate::store::memory::MemoryStore)
    /// with a fixed signing secret. The store handle is returned for
    /// assertions on raw rows.
    #[cfg(test)]
    pub fn in_memory() -> (Self, Arc<crate::store::memory::MemoryStore>) {
        let store = Arc::new(crate::store::memory::MemoryStore::new());
        let jwt = JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        };
        (Self::new(&jwt, store.clone()), store)
    }
}
