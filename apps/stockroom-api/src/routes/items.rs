//! Items: restock, reads, update, and the two kinds of sale.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use stockroom_core::{
    HistoryEntry, InventorySummary, Item, ItemDraft, ItemUpdate, RetailSale, WholesaleSale,
};

use super::Page;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::{ApiJson, ApiPath, ApiQuery, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/items/", post(create_or_update).get(list_items))
        .route("/items/summary/", get(summary))
        .route("/items/search/", get(search_by_name))
        .route("/items/:id", put(update_item))
        .route("/sell/wholesale/", post(sell_wholesale))
        .route("/sell/retail/", post(sell_retail))
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub name: String,
}

async fn create_or_update(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiJson(drafts): ApiJson<Vec<ItemDraft>>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state.inventory.create_or_update(&actor, &drafts).await?;
    Ok(Json(items))
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<Page>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let page = page.validated()?;
    let items = state.db.items().list(page.skip, page.limit).await?;
    Ok(Json(items))
}

async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<InventorySummary>, ApiError> {
    Ok(Json(state.db.items().summary().await?))
}

async fn search_by_name(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<NameQuery>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state.db.items().search_by_name(&query.name).await?;
    Ok(Json(items))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiPath(item_id): ApiPath<i64>,
    ApiJson(update): ApiJson<ItemUpdate>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state.inventory.update(&actor, item_id, &update).await?;
    Ok(Json(items))
}

async fn sell_wholesale(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiJson(sale): ApiJson<WholesaleSale>,
) -> Result<Json<HistoryEntry>, ApiError> {
    let entry = state.inventory.sell_wholesale(&actor, &sale).await?;
    Ok(Json(entry))
}

async fn sell_retail(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    ApiJson(sale): ApiJson<RetailSale>,
) -> Result<Json<HistoryEntry>, ApiError> {
    let entry = state.inventory.sell_retail(&actor, &sale).await?;
    Ok(Json(entry))
}
