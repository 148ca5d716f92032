//! Error types shared by every handler and how they render on the wire.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::envelope::Envelope;

/// Why a request was rejected with 401. The variant is logged; clients only
/// ever see the generic message from [`AuthError::public_message`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingToken,
    #[error("invalid auth scheme")]
    InvalidScheme,
    #[error("bad token signature or claims")]
    InvalidToken,
    #[error("token expired")]
    ExpiredToken,
    #[error("token subject does not exist")]
    UnknownUser,
    #[error("token predates the last login")]
    StaleToken,
    #[error("password mismatch")]
    WrongPassword,
}

impl AuthError {
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::WrongPassword => "password not correct",
            _ => "invalid or expired token",
        }
    }
}

/// Business-rule violations, each with its own message so clients can branch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("user not found")]
    UserNotFound,
    #[error("cannot make friend with self")]
    SelfRequest,
    #[error("target user not exist")]
    TargetNotFound,
    #[error("target user is already friend")]
    AlreadyContact,
    #[error("already sent a request to user {to_uid}")]
    DuplicateRequest { to_uid: i64 },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Rule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::Auth(reason) => reason.public_message().to_string(),
            AppError::Rule(rule) => rule.to_string(),
            // storage errors are echoed for operators; they never carry credentials
            AppError::Internal(e) => format!("{e:#}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Internal(e) = &self {
            error!(error = %format!("{e:#}"), "request failed");
        }
        (status, Json(Envelope::<()>::error(self.message()))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
