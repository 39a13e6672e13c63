//! Password hashing and token authentication.

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::db;
use crate::error::ApiError;
use crate::models::User;
use crate::query;
use crate::AppState;

const TOKEN_SCHEME: &str = "Token ";

/// Argon2id password hasher producing PHC strings.
#[derive(Debug, Clone)]
pub struct Hasher {
    params: Params,
}

impl Default for Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl Hasher {
    /// Low cost parameters for tests and throwaway databases.
    pub fn fast() -> Self {
        Self {
            params: Params::new(1024, 1, 1, None).unwrap_or_default(),
        }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Parameters are read back from the stored hash, so hashes made with
    /// other costs still verify.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                log::warn!("unreadable password hash: {}", e);
                false
            }
        }
    }
}

pub fn generate_token() -> String {
    Uuid::new_v4().to_simple().to_string()
}

/// Extracts the key from an `Authorization: Token <key>` header.
pub fn token_from_header(value: &str) -> Option<&str> {
    value
        .strip_prefix(TOKEN_SCHEME)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The active user owning the request's token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(token_from_header)
            .map(str::to_string);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or(ApiError::Unauthorized)?;
            let state =
                state.ok_or_else(|| ApiError::Internal("application state missing".to_string()))?;
            let user = db::run(&state, move |conn| query::find_user_by_token(&token, conn)).await?;
            match user {
                Some(user) if user.is_active => Ok(AuthUser(user)),
                _ => Err(ApiError::Unauthorized),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = Hasher::fast();
        let hash = hasher.hash("testpass123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("testpass123", &hash));
        assert!(!hasher.verify("wrong", &hash));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!Hasher::fast().verify("pw", "not-a-hash"));
    }

    #[test]
    fn tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn header_parsing() {
        assert_eq!(token_from_header("Token abc123"), Some("abc123"));
        assert_eq!(token_from_header("Bearer abc123"), None);
        assert_eq!(token_from_header("Token "), None);
    }
}
