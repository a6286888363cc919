//! # stockroom-db: Database Layer for Stockroom
//!
//! SQLite storage for items, the audit history and user accounts, plus the
//! transactional inventory operations that tie item changes to history rows.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /sell/retail/)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockroom-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Inventory   │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (inventory.rs)│───►│ ItemRepo      │    │  (embedded)  │  │   │
//! │  │   │ one tx per op │    │ HistoryRepo   │    │ 001_init.sql │  │   │
//! │  │   └───────────────┘    │ UserRepo      │    └──────────────┘  │   │
//! │  │           │            └───────────────┘                       │   │
//! │  │           ▼                    │                                │   │
//! │  │   ┌───────────────┐            │                                │   │
//! │  │   │   Database    │◄───────────┘                                │   │
//! │  │   │   (pool.rs)   │                                             │   │
//! │  │   └───────────────┘                                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (./stockroom.db)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Item, history and user repositories
//! - [`inventory`] - Restock, update and sale operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./stockroom.db")).await?;
//!
//! let inventory = db.inventory(FixedOffset::east_opt(5 * 3600).unwrap());
//! inventory.create_or_update(&actor, &drafts).await?;
//!
//! let recent = db.history().list(0, 10, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod inventory;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use inventory::Inventory;
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::history::HistoryRepository;
pub use repository::item::ItemRepository;
pub use repository::user::{UserRecord, UserRepository};
