use actix_web::dev::Payload;
use actix_web::{http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::{AuthError, AuthResult, JwtService};

pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// The authenticated administrator.
///
/// Used as a handler argument, it rejects requests without a valid bearer
/// token (`Authorization` header or `auth_token` cookie) with a 401.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
}

impl FromRequest for AdminUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> AuthResult<AdminUser> {
    let jwt = req
        .app_data::<web::Data<JwtService>>()
        .ok_or(AuthError::NotConfigured)?;
    let token = bearer_token(req).ok_or(AuthError::MissingToken)?;

    let claims = jwt.decode_access_token(&token).map_err(|err| {
        tracing::warn!("Rejected access token: {:?}", err);
        err
    })?;
    let id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AuthError::InvalidToken(jsonwebtoken::errors::ErrorKind::InvalidSubject.into()))?;

    Ok(AdminUser {
        id,
        username: claims.username,
        email: claims.email,
        name: claims.name,
    })
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        req.cookie(AUTH_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}
