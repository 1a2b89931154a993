//! Admin authentication: a single configured account, argon2 password
//! hashes and HS256 bearer tokens.

mod error;
mod extractor;
mod jwt;
mod password;

pub use error::{AuthError, AuthResult};
pub use extractor::{AdminUser, AUTH_COOKIE_NAME};
pub use jwt::{AccessTokenClaims, JwtService, SignedAccessToken};
pub use password::PasswordService;

use secrecy::{ExposeSecret, Secret};

use crate::config::AdminSettings;

const ADMIN_ID: i64 = 1;

/// The administrator allowed to manage lists and imports.
#[derive(Clone)]
pub struct AdminAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    password_hash: Secret<String>,
}

impl AdminAccount {
    pub fn from_settings(settings: &AdminSettings) -> AdminAccount {
        AdminAccount {
            id: ADMIN_ID,
            username: settings.username.clone(),
            email: settings.email.clone(),
            name: settings.name.clone(),
            password_hash: settings.password_hash.clone(),
        }
    }

    pub fn profile(&self) -> AdminUser {
        AdminUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }

    /// Returns the admin profile when `username` and `password` match.
    pub fn authenticate(
        &self,
        passwords: &PasswordService,
        username: &str,
        password: &str,
    ) -> AuthResult<Option<AdminUser>> {
        if username != self.username {
            return Ok(None);
        }

        let matches = passwords.verify_password(password, self.password_hash.expose_secret())?;

        Ok(matches.then(|| self.profile()))
    }
}
