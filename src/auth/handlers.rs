use axum::{extract::State, routing::post, Json, Router};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest},
        password::{check_password_hash, hash_password},
        services::{is_valid_email, normalize_email, require},
    },
    envelope::Envelope,
    error::{AppError, AppResult, RuleViolation},
    extract::JsonBody,
    state::AppState,
    store::NewUser,
    users::dto::PublicUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<RegisterRequest>,
) -> AppResult<Json<Envelope<PublicUser>>> {
    require("username", &payload.username)?;
    require("password", &payload.password)?;
    require("email", &payload.email)?;

    payload.email = normalize_email(&payload.email);
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let new_user = NewUser {
        username: payload.username,
        email: payload.email,
        password_hash,
        description: payload.description.filter(|d| !d.is_empty()),
        gender: payload.gender,
    };

    let Some(user) = state.users.create_if_absent(new_user).await? else {
        warn!("email already registered");
        return Err(AppError::Conflict("user already exists".into()));
    };

    info!(user_id = user.id, uid = user.uid, email = %user.email, "user registered");
    Ok(Json(Envelope::ok(PublicUser::from(user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<LoginRequest>,
) -> AppResult<Json<Envelope<LoginResponse>>> {
    require("email", &payload.email)?;
    require("password", &payload.password)?;

    payload.email = normalize_email(&payload.email);
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    let Some(mut user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(RuleViolation::UserNotFound.into());
    };

    if let Err(e) = check_password_hash(&payload.password, &user.password_hash) {
        warn!(user_id = user.id, "login invalid password");
        return Err(e.into());
    }

    // The store picks the epoch; earlier tokens are revoked from here on.
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let Some(login_at) = state.users.record_login(user.id, now).await? else {
        warn!(user_id = user.id, "user vanished during login");
        return Err(RuleViolation::UserNotFound.into());
    };
    user.last_login = login_at;

    let token = state.keys.sign(user.id, login_at)?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(Envelope::ok(LoginResponse {
        token,
        user: PublicUser::from(user),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UserStore;
    use tokio::task::JoinSet;

    fn register_body(username: &str, email: &str, password: &str) -> JsonBody<RegisterRequest> {
        JsonBody(RegisterRequest {
            username: username.into(),
            password: password.into(),
            email: email.into(),
            description: None,
            gender: 0,
        })
    }

    fn login_body(email: &str, password: &str) -> JsonBody<LoginRequest> {
        JsonBody(LoginRequest {
            email: email.into(),
            password: password.into(),
        })
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let (state, store) = AppState::in_memory();
        let Json(env) = register(State(state), register_body("a", "A@x.com ", "pw1"))
            .await
            .unwrap();
        let public = env.data.unwrap();
        assert_eq!(public.username, "a");
        assert_eq!(public.email, "a@x.com");

        let row = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_ne!(row.password_hash, "pw1");
        assert!(check_password_hash("pw1", &row.password_hash).is_ok());
        assert_eq!(row.last_login, 0);
    }

    #[tokio::test]
    async fn register_same_email_conflicts() {
        let (state, store) = AppState::in_memory();
        let _ = register(State(state.clone()), register_body("a", "a@x.com", "pw1"))
            .await
            .unwrap();
        let err = register(State(state), register_body("b", "a@x.com", "pw2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_have_one_winner() {
        let (state, store) = AppState::in_memory();
        let mut set = JoinSet::new();
        for i in 0..8 {
            let state = state.clone();
            set.spawn(async move {
                register(State(state), register_body(&format!("u{i}"), "race@x.com", "pw"))
                    .await
                    .map(|_| ())
            });
        }

        let (mut ok, mut conflicts) = (0, 0);
        while let Some(res) = set.join_next().await {
            match res.unwrap() {
                Ok(()) => ok += 1,
                Err(AppError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert_eq!((ok, conflicts), (1, 7));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn register_requires_fields_and_valid_email() {
        let (state, _) = AppState::in_memory();
        let err = register(State(state.clone()), register_body("", "a@x.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = register(State(state), register_body("a", "not-an-email", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn login_issues_token_bound_to_stored_epoch() {
        let (state, store) = AppState::in_memory();
        let _ = register(State(state.clone()), register_body("a", "a@x.com", "pw1"))
            .await
            .unwrap();

        let Json(env) = login(State(state.clone()), login_body("a@x.com", "pw1"))
            .await
            .unwrap();
        let resp = env.data.unwrap();
        let claims = state.keys.verify(&resp.token).unwrap();
        let row = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(claims.sub, row.id);
        assert_eq!(claims.login_at, row.last_login);
        assert!(row.last_login > 0);
    }

    #[tokio::test]
    async fn relogin_advances_epoch() {
        let (state, _) = AppState::in_memory();
        let _ = register(State(state.clone()), register_body("a", "a@x.com", "pw1"))
            .await
            .unwrap();
        let Json(first) = login(State(state.clone()), login_body("a@x.com", "pw1"))
            .await
            .unwrap();
        let Json(second) = login(State(state.clone()), login_body("a@x.com", "pw1"))
            .await
            .unwrap();
        let t1 = state.keys.verify(&first.data.unwrap().token).unwrap();
        let t2 = state.keys.verify(&second.data.unwrap().token).unwrap();
        assert!(t2.login_at > t1.login_at);
    }

    #[tokio::test]
    async fn login_wrong_password_is_unauthorized() {
        let (state, store) = AppState::in_memory();
        let _ = register(State(state.clone()), register_body("a", "a@x.com", "pw1"))
            .await
            .unwrap();
        let err = login(State(state), login_body("a@x.com", "pw2")).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(crate::error::AuthError::WrongPassword)));
        let row = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(row.last_login, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_logins_leave_one_live_token() {
        let (state, store) = AppState::in_memory();
        let _ = register(State(state.clone()), register_body("a", "a@x.com", "pw1"))
            .await
            .unwrap();

        let mut set = JoinSet::new();
        for _ in 0..4 {
            let state = state.clone();
            set.spawn(async move {
                let Json(env) = login(State(state), login_body("a@x.com", "pw1"))
                    .await
                    .unwrap();
                env.data.unwrap().token
            });
        }

        let mut epochs = Vec::new();
        while let Some(token) = set.join_next().await {
            epochs.push(state.keys.verify(&token.unwrap()).unwrap().login_at);
        }
        let row = store.find_by_email("a@x.com").await.unwrap().unwrap();
        let live = epochs.iter().filter(|e| **e == row.last_login).count();
        epochs.sort_unstable();
        epochs.dedup();
        assert_eq!(epochs.len(), 4);
        assert_eq!(live, 1);
    }

    #[tokio::test]
    async fn login_unknown_email_is_not_found() {
        let (state, _) = AppState::in_memory();
        let err = login(State(state), login_body("ghost@x.com", "pw")).await.unwrap_err();
        assert!(matches!(err, AppError::Rule(RuleViolation::UserNotFound)));
    }
}
