//! Accounts: registration, login, current identity, password change.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use stockroom_core::validation::{validate_password, validate_username};
use stockroom_core::{CoreError, Identity, UserRole};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::ApiError;
use crate::{ApiJson, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/", post(register))
        .route("/login/", post(login))
        .route("/me/", get(me))
        .route("/change-password/", post(change_password))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Open to anyone for `staff` accounts; `admin` accounts need an admin token.
async fn register(
    State(state): State<Arc<AppState>>,
    caller: Option<AuthUser>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Json<Identity>, ApiError> {
    if request.role == UserRole::Admin && !caller.as_ref().map_or(false, |c| c.0.is_admin()) {
        warn!(username = %request.username, "Admin registration without admin token");
        return Err(ApiError::Forbidden(
            "Only an admin can create admin accounts".to_string(),
        ));
    }

    validate_username(&request.username)?;
    validate_password(&request.password)?;

    let password_hash = hash_password(&request.password)?;
    let user = state
        .db
        .users()
        .create(&request.username, &password_hash, request.role)
        .await?;

    info!(username = %user.username, role = ?user.role, "Account registered");
    Ok(Json(user.identity()))
}

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state.db.users().find_by_username(&request.username).await?;

    let user = match user {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            warn!(username = %request.username, "Login rejected");
            return Err(CoreError::BadCredentials.into());
        }
    };

    let access_token = state.jwt.generate_access_token(&user.username)?;
    info!(username = %user.username, "Login succeeded");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

async fn me(AuthUser(identity): AuthUser) -> Json<Identity> {
    Json(identity)
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state.db.users().get_by_id(identity.id).await?;

    if !verify_password(&request.old_password, &user.password_hash) {
        return Err(CoreError::BadCredentials.into());
    }
    validate_password(&request.new_password)?;

    let password_hash = hash_password(&request.new_password)?;
    state
        .db
        .users()
        .update_password_hash(user.id, &password_hash)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}
