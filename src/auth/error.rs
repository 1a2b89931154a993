use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::error_chain_fmt;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,
    #[error("Session expired. Please login again.")]
    TokenExpired,
    #[error("Invalid authentication token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    Validation(String),
    #[error("Failed to sign the access token.")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),
    #[error("Failed to process the password.")]
    PasswordHash(String),
    #[error("Authentication is not configured.")]
    NotConfigured,
}

impl AuthError {
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AuthError::MissingToken => Some("NO_TOKEN"),
            AuthError::TokenExpired => Some("TOKEN_EXPIRED"),
            AuthError::InvalidToken(_) => Some("INVALID_TOKEN"),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(err),
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}

impl std::fmt::Debug for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::TokenExpired
            | AuthError::InvalidToken(_)
            | AuthError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::TokenSigning(_) | AuthError::PasswordHash(_) | AuthError::NotConfigured => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self.code() {
            Some(code) => serde_json::json!({ "error": self.to_string(), "code": code }),
            None => serde_json::json!({ "error": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
