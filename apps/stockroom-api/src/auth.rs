//! Authentication module.
//!
//! JWT access tokens, argon2 password hashing, and the [`AuthUser`]
//! extractor that turns a bearer token into an [`Identity`].
//!
//! ## Request Flow
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! AuthUser::from_request_parts
//!        ├── header missing / not "Bearer ..."   → 401
//!        ├── signature / expiry / type invalid   → 401
//!        ├── user `sub` no longer exists         → 401
//!        └── Identity { id, username, role }     → handler
//! ```

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use stockroom_core::validation::{validate_password, validate_username};
use stockroom_core::{Identity, UserRole};
use stockroom_db::Database;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AdminAccount;
use crate::error::ApiError;
use crate::AppState;

const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type
    pub token_type: String,
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("access_lifetime_secs", &self.access_lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: String, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
        }
    }

    /// Generate an access token for `username`.
    pub fn generate_access_token(&self, username: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(ApiError::Unauthorized("Expected access token".to_string()));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Hash a password for storage (argon2id, random salt, PHC string).
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Admin Bootstrap
// =============================================================================

/// Creates the configured admin account unless that username already exists.
///
/// An existing account is left as it is, password and role included.
pub async fn bootstrap_admin(
    db: &Database,
    account: &AdminAccount,
) -> Result<Identity, ApiError> {
    if let Some(existing) = db.users().find_by_username(&account.username).await? {
        if existing.role != UserRole::Admin {
            warn!(
                username = %existing.username,
                "Bootstrap admin name belongs to a staff account"
            );
        }
        return Ok(existing.identity());
    }

    validate_username(&account.username)?;
    validate_password(&account.password)?;

    let password_hash = hash_password(&account.password)?;
    let user = db
        .users()
        .create(&account.username, &password_hash, UserRole::Admin)
        .await?;

    info!(username = %user.username, "Admin account created");
    Ok(user.identity())
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".to_string()))?;

        let claims = state.jwt.validate_access_token(token)?;

        let user = state
            .db
            .users()
            .find_by_username(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

        debug!(username = %user.username, "Request authenticated");
        Ok(AuthUser(user.identity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);

        let token = manager.generate_access_token("alice").unwrap();
        let claims = manager.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.token_type, "access");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a".to_string(), 3600);
        let verifier = JwtManager::new("secret-b".to_string(), 3600);

        let token = issuer.generate_access_token("alice").unwrap();
        assert!(matches!(
            verifier.validate_access_token(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    fn admin_account(username: &str, password: &str) -> AdminAccount {
        AdminAccount {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let db = Database::new(stockroom_db::DbConfig::in_memory()).await.unwrap();

        let created = bootstrap_admin(&db, &admin_account("root", "first-pass")).await.unwrap();
        assert_eq!(created.role, UserRole::Admin);

        let again = bootstrap_admin(&db, &admin_account("root", "second-pass")).await.unwrap();
        assert_eq!(again.id, created.id);

        let stored = db.users().find_by_username("root").await.unwrap().unwrap();
        assert!(verify_password("first-pass", &stored.password_hash));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_validates_credentials() {
        let db = Database::new(stockroom_db::DbConfig::in_memory()).await.unwrap();

        let err = bootstrap_admin(&db, &admin_account("ro ot", "pass")).await.unwrap_err();
        assert_eq!(err.classify().1, "validation_error");
        assert!(db.users().find_by_username("ro ot").await.unwrap().is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s validation leeway
        let manager = JwtManager::new("test-secret".to_string(), -120);
        let token = manager.generate_access_token("alice").unwrap();

        assert!(manager.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter2").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-hash"));
        assert_ne!(hash, hash_password("hunter2").unwrap());
    }
}
