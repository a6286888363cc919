//! # Repository Module
//!
//! Database repository implementations for Stockroom.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  HTTP handler / Inventory operations                                   │
//! │       │                                                                 │
//! │       │  db.items().summary()                                          │
//! │       │  db.history().search("ivan")                                   │
//! │       ▼                                                                 │
//! │  ItemRepository       HistoryRepository       UserRepository           │
//! │  ├── pool reads       ├── list / search       ├── create               │
//! │  └── *_in(conn, ..)   ├── get / delete        ├── find_by_username     │
//! │      (transactional)  └── record_in(conn, ..) └── update_password      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Methods ending in `_in` take an open connection (usually `&mut *tx`) so
//! the inventory operations can compose them inside one transaction.
//!
//! ## Available Repositories
//!
//! - [`ItemRepository`](item::ItemRepository) - Item reads and guarded stock writes
//! - [`HistoryRepository`](history::HistoryRepository) - Audit log recorder and queries
//! - [`UserRepository`](user::UserRepository) - Accounts and password hashes

use chrono::{DateTime, SecondsFormat, Utc};

pub mod history;
pub mod item;
pub mod user;

/// Renders a timestamp the way every table stores it.
///
/// Fixed width (`2026-10-17T09:05:00.123456Z`), so `ORDER BY timestamp`
/// is chronological.
pub(crate) fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_db_timestamp_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let fractional = whole + chrono::Duration::microseconds(7);

        assert_eq!(db_timestamp(whole), "2026-01-02T03:04:05.000000Z");
        assert_eq!(db_timestamp(fractional), "2026-01-02T03:04:05.000007Z");
        assert!(db_timestamp(whole) < db_timestamp(fractional));
    }
}
