use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::auth::{AdminUser, AuthError, AuthResult};
use crate::config::AuthSettings;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub username: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_ttl: Duration,
}

impl JwtService {
    pub fn from_settings(settings: &AuthSettings) -> JwtService {
        let secret_bytes = settings.jwt_secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        JwtService {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation,
            access_token_ttl: Duration::seconds(settings.token_ttl_secs),
        }
    }

    pub fn issue_access_token(&self, user: &AdminUser) -> AuthResult<SignedAccessToken> {
        let now = Utc::now();
        let expires_at = now + self.access_token_ttl;

        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthError::TokenSigning)?;

        Ok(SignedAccessToken { token, expires_at })
    }

    pub fn decode_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;

        Ok(token_data.claims)
    }
}
