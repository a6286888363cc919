//! # Stockroom API
//!
//! HTTP server in front of the inventory store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Stockroom API Server                            │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  users         │  │  items         │  │  history                   ││
//! │  │                │  │                │  │                            ││
//! │  │ • register     │  │ • restock      │  │ • list (type filter)       ││
//! │  │ • login        │  │ • list/summary │  │ • search                   ││
//! │  │ • me           │  │ • search       │  │ • get                      ││
//! │  │ • change pass  │  │ • update       │  │ • delete (admin)           ││
//! │  └────────────────┘  │ • sell         │  └────────────────────────────┘│
//! │                      └────────────────┘                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  SQLite      │  │  JWT + argon2│  │  Snapshot export         ││  │
//! │  │  │ stockroom-db │  │              │  │  (optional, periodic)    ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`] for the environment variables.

pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod routes;

use axum::async_trait;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use stockroom_db::{Database, Inventory};

// Re-exports
pub use auth::{bootstrap_admin, AuthUser, JwtManager};
pub use config::{AdminAccount, ApiConfig};
pub use error::ApiError;
pub use routes::router;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub inventory: Inventory,
    pub jwt: JwtManager,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the store, the token manager and the inventory operations.
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let inventory = db.inventory(config.display_offset);
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs);

        AppState {
            db,
            inventory,
            jwt,
            config,
        }
    }
}

/// `Json` whose rejection is an [`ApiError`], so malformed bodies get the
/// same `{code, message}` shape as every other error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// `Path` whose rejection is an [`ApiError`] (`/items/abc`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

/// `Query` whose rejection is an [`ApiError`] (`?limit=x`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}
