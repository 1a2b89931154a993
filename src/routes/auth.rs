use actix_web::{cookie::Cookie, web, HttpResponse};
use serde::Deserialize;

use crate::auth::{
    AdminAccount, AdminUser, AuthError, JwtService, PasswordService, AUTH_COOKIE_NAME,
};

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Deserialize, Debug, Default)]
pub struct LoginBody {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

#[tracing::instrument(
    name = "Admin login handler",
    skip(body, account, passwords, jwt),
    fields(username = ?body.username)
)]
pub async fn handle_login(
    body: web::Json<LoginBody>,
    account: web::Data<AdminAccount>,
    passwords: web::Data<PasswordService>,
    jwt: web::Data<JwtService>,
) -> Result<HttpResponse, AuthError> {
    let (username, password) = match (present(&body.username), present(&body.password)) {
        (Some(username), Some(password)) => (username, password),
        _ => {
            return Err(AuthError::Validation(String::from(
                "Username and password are required",
            )))
        }
    };

    let user = account
        .authenticate(&passwords, username, password)?
        .ok_or_else(|| AuthError::InvalidCredentials(String::from("Invalid username or password")))?;
    let access_token = jwt.issue_access_token(&user)?;

    tracing::info!("User logged in: {}", user.username);

    let cookie = Cookie::build(AUTH_COOKIE_NAME, access_token.token.clone())
        .path("/")
        .http_only(true)
        .finish();

    Ok(HttpResponse::Ok().cookie(cookie).json(serde_json::json!({
        "success": true,
        "token": access_token.token,
        "expiresAt": access_token.expires_at,
        "user": user
    })))
}

/// Tokens are stateless, so logging out only clears the cookie.
#[tracing::instrument(name = "Admin logout handler", skip(admin), fields(username = %admin.username))]
pub async fn handle_logout(admin: AdminUser) -> HttpResponse {
    let mut response = HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Logged out successfully"
    }));
    let _ = response.add_removal_cookie(&Cookie::build(AUTH_COOKIE_NAME, "").path("/").finish());

    response
}

pub async fn handle_me(admin: AdminUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": admin
    }))
}

/// Returns the new password hash; persisting it is left to the operator
/// (`APP_AUTH__ADMIN__PASSWORD_HASH`).
#[tracing::instrument(
    name = "Admin change password handler",
    skip(admin, body, account, passwords),
    fields(username = %admin.username)
)]
pub async fn handle_change_password(
    admin: AdminUser,
    body: web::Json<ChangePasswordBody>,
    account: web::Data<AdminAccount>,
    passwords: web::Data<PasswordService>,
) -> Result<HttpResponse, AuthError> {
    let (current_password, new_password) =
        match (present(&body.current_password), present(&body.new_password)) {
            (Some(current), Some(new)) => (current, new),
            _ => {
                return Err(AuthError::Validation(String::from(
                    "Current and new password are required",
                )))
            }
        };

    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "New password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    account
        .authenticate(&passwords, &admin.username, current_password)?
        .ok_or_else(|| AuthError::InvalidCredentials(String::from("Current password is incorrect")))?;

    let password_hash = passwords.hash_password(new_password)?;

    tracing::warn!(
        "Password changed for {}, update APP_AUTH__ADMIN__PASSWORD_HASH to persist it",
        admin.username
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Password changed successfully",
        "passwordHash": password_hash
    })))
}
