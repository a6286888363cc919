//! History: list, search, get, admin delete.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use stockroom_core::validation::validate_search_query;
use stockroom_core::{HistoryEntry, HistoryType};
use tracing::{info, warn};

use super::Page;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::{ApiPath, ApiQuery, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/history/", get(list_history))
        .route("/history/search/", get(search_history))
        .route("/history/:id/", get(get_history).delete(delete_history))
}

#[derive(Debug, Deserialize)]
pub struct HistoryListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
    pub history_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQueryParams {
    #[serde(default)]
    pub query: String,
}

async fn list_history(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    ApiQuery(params): ApiQuery<HistoryListQuery>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let page = Page {
        skip: params.skip,
        limit: params.limit,
    }
    .validated()?;
    let history_type = params
        .history_type
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(str::parse::<HistoryType>)
        .transpose()?;

    let entries = state
        .db
        .history()
        .list(page.skip, page.limit, history_type)
        .await?;
    Ok(Json(entries))
}

async fn search_history(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    ApiQuery(params): ApiQuery<SearchQueryParams>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let query = validate_search_query(&params.query)?;
    Ok(Json(state.db.history().search(&query).await?))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<HistoryEntry>, ApiError> {
    Ok(Json(state.db.history().get(id).await?))
}

async fn delete_history(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    if !actor.is_admin() {
        warn!(username = %actor.username, id, "Non-admin history delete rejected");
        return Err(ApiError::Forbidden(
            "Only administrators can delete history".to_string(),
        ));
    }

    state.db.history().delete(id).await?;
    info!(username = %actor.username, id, "History entry removed");
    Ok(StatusCode::NO_CONTENT)
}
