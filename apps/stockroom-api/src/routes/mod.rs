//! HTTP routes.
//!
//! | Method & path                              | Auth  |
//! |--------------------------------------------|-------|
//! | `POST /users/`                             | no    |
//! | `POST /login/`                             | no    |
//! | `GET /me/`                                 | yes   |
//! | `POST /change-password/`                   | yes   |
//! | `POST /items/`                             | yes   |
//! | `GET /items/?skip&limit`                   | no    |
//! | `GET /items/summary/`                      | no    |
//! | `GET /items/search/?name=`                 | no    |
//! | `PUT /items/:id`                           | yes   |
//! | `POST /sell/wholesale/`                    | yes   |
//! | `POST /sell/retail/`                       | yes   |
//! | `GET /history/?skip&limit&history_type`    | yes   |
//! | `GET /history/search/?query=`              | yes   |
//! | `GET /history/:id/`                        | yes   |
//! | `DELETE /history/:id/`                     | admin |
//! | `GET /health/`                             | no    |

pub mod health;
pub mod history;
pub mod items;
pub mod users;

use std::sync::Arc;

use axum::Router;
use serde::Deserialize;
use stockroom_core::validation::validate_page;
use stockroom_core::DEFAULT_PAGE_SIZE;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::AppState;

/// Builds the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(users::routes())
        .merge(items::routes())
        .merge(history::routes())
        .merge(health::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `?skip&limit` query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Page {
    /// Rejects a negative offset or a limit outside `1..=MAX_PAGE_SIZE`.
    pub fn validated(self) -> Result<Self, ApiError> {
        validate_page(self.skip, self.limit)?;
        Ok(self)
    }
}
