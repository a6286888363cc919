//! # stockroom-core: Pure Domain Logic for Stockroom
//!
//! Items, money, validation and the audit-history rules, as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    stockroom-api (axum)                         │   │
//! │  │    /items  /sell  /history  /login  ...                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stockroom-db                                 │   │
//! │  │    transactions, repositories, history recorder                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockroom-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │ history  │ │  sale  │ │ search  │  │   │
//! │  │   │  Item   │ │  Money  │ │ Snapshot │ │  plan  │ │ tokens  │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Items, requests, identities
//! - [`money`] - Integer-cent money with a decimal wire format
//! - [`history`] - History entries, snapshots, totals, titles
//! - [`sale`] - All-or-nothing sale planning
//! - [`search`] - Token matching for history and item search
//! - [`validation`] - Request validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::history::{ItemSnapshot, Totals};
//! use stockroom_core::Money;
//!
//! let lines = vec![ItemSnapshot::new("Widget", 5, Money::from_cents(200))];
//! let totals = Totals::from_lines(&lines).unwrap();
//! assert_eq!(totals.total_items_count, 5);
//! assert_eq!(totals.total_price.to_decimal(), 10.0);
//! ```

pub mod error;
pub mod history;
pub mod money;
pub mod sale;
pub mod search;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use history::{HistoryEntry, HistoryType, ItemSnapshot, NewHistoryEntry, Snapshot, Totals};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound on stock held for a single item.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;

/// Upper bound on a unit price, in cents.
///
/// Together with [`MAX_STOCK_QUANTITY`] a single line total stays inside
/// `i64` cents. Sums over many lines are still checked.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Maximum lines in one restock or sale request.
pub const MAX_REQUEST_LINES: usize = 500;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size for list endpoints.
pub const MAX_PAGE_SIZE: i64 = 500;
