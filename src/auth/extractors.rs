use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::{claims::Claims, jwt::TokenError};
use crate::{
    error::{AppError, AuthError},
    state::AppState,
    store::User,
};

/// Bearer token whose signature and expiry have been checked. Does not touch
/// the store, so it suits endpoints that only need the token's identity.
#[derive(Debug)]
pub struct TokenClaims(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for TokenClaims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingToken)
            .inspect_err(|_| warn!("missing Authorization header"))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AuthError::InvalidScheme)
            .inspect_err(|_| warn!("invalid auth scheme"))?;

        let claims = state.keys.verify(token).map_err(|e| match e {
            TokenError::Expired => {
                warn!("expired token");
                AuthError::ExpiredToken
            }
            TokenError::Invalid => {
                warn!("invalid token");
                AuthError::InvalidToken
            }
        })?;

        Ok(TokenClaims(claims))
    }
}

/// The user a fresh token resolves to. Protected handlers take this as a
/// parameter; it cannot exist unless resolution succeeded.
///
/// A token is fresh only while its `login_at` equals the user's stored
/// `last_login`, so rewriting `last_login` for any reason revokes every token
/// issued before.
#[derive(Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TokenClaims(claims) = TokenClaims::from_request_parts(parts, state).await?;

        let Some(user) = state.users.find_by_id(claims.sub).await? else {
            warn!(user_id = claims.sub, "token for unknown user");
            return Err(AuthError::UnknownUser.into());
        };

        if user.last_login != claims.login_at {
            warn!(
                user_id = user.id,
                token_epoch = claims.login_at,
                last_login = user.last_login,
                "stale token"
            );
            return Err(AuthError::StaleToken.into());
        }

        Ok(CurrentUser(user))
    }
}
