//! # Domain Types
//!
//! Inventory and identity types used throughout Stockroom.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │   ItemDraft     │   │    SaleLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (i64)       │   │  name           │   │  name           │       │
//! │  │  name (lookup)  │   │  quantity (Δ)   │   │  quantity       │       │
//! │  │  quantity       │   │  price          │   └─────────────────┘       │
//! │  │  price (Money)  │   └─────────────────┘                              │
//! │  │  version        │                                                    │
//! │  └─────────────────┘   ┌─────────────────┐   ┌─────────────────┐       │
//! │                        │   Identity      │   │   UserRole      │       │
//! │                        │  id, username   │   │  Admin | Staff  │       │
//! │                        │  role           │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Items are addressed by `id` for updates and by `name` for restocking and
//! sales. Names are unique at the application level only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Item
// =============================================================================

/// A stocked item as currently held in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Item {
    /// Autoincrement row id.
    #[ts(type = "number")]
    pub id: i64,

    /// Display name, also the lookup key for restocks and sales.
    pub name: String,

    /// Units in stock. Never negative.
    #[ts(type = "number")]
    pub quantity: i64,

    /// Current unit price.
    #[serde(with = "crate::money::decimal")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "price_cents"))]
    #[ts(type = "number")]
    pub price: Money,

    /// Bumped on every write; lets readers detect concurrent changes.
    #[ts(type = "number")]
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Value of the stock on hand (price × quantity).
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }

    /// Checks whether `quantity` units can be taken from stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }
}

// =============================================================================
// Requests
// =============================================================================

/// One line of a restock request: add `quantity` units of `name` at `price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemDraft {
    pub name: String,
    #[ts(type = "number")]
    pub quantity: i64,
    #[serde(with = "crate::money::decimal")]
    #[ts(type = "number")]
    pub price: Money,
}

/// Full replacement of an item's fields, used by the update operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemUpdate {
    pub name: String,
    #[ts(type = "number")]
    pub quantity: i64,
    #[serde(with = "crate::money::decimal")]
    #[ts(type = "number")]
    pub price: Money,
    #[serde(default)]
    pub extra_info: Option<String>,
}

/// One line of a sale request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub name: String,
    #[ts(type = "number")]
    pub quantity: i64,
}

/// A wholesale sale: records the buyer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WholesaleSale {
    pub buyer: String,
    #[serde(default)]
    pub extra_info: Option<String>,
    pub items: Vec<SaleLine>,
}

/// A retail sale: no buyer is recorded.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RetailSale {
    #[serde(default)]
    pub extra_info: Option<String>,
    pub items: Vec<SaleLine>,
}

// =============================================================================
// Inventory Summary
// =============================================================================

/// Aggregates over every item in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventorySummary {
    #[ts(type = "number")]
    pub unique_items_count: i64,
    #[ts(type = "number")]
    pub total_items_count: i64,
    #[serde(with = "crate::money::decimal")]
    #[ts(type = "number")]
    pub total_price: Money,
}

// =============================================================================
// Identity
// =============================================================================

/// Role of an account. Only admins may delete history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Staff,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Staff
    }
}

/// The authenticated actor behind a request.
///
/// Every history entry records `username` from this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Identity {
    #[ts(type = "number")]
    pub id: i64,
    pub username: String,
    pub role: UserRole,
}

impl Identity {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
