//! # Item Repository
//!
//! Reads over the `items` table, plus the row-level writes the inventory
//! operations compose inside their transactions.
//!
//! ## Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Stock Changes                                    │
//! │                                                                         │
//! │  Restock (existing name, guarded increment):                           │
//! │     UPDATE items SET quantity = quantity + ?, price = ?                │
//! │     WHERE id = ? AND quantity + ? <= MAX_STOCK_QUANTITY                │
//! │                                                                         │
//! │  Sale (guarded decrement):                                             │
//! │     UPDATE items SET quantity = quantity - ?                           │
//! │     WHERE id = ? AND quantity >= ?                                     │
//! │           │                                                             │
//! │           ├── 1 row  → stock taken                                     │
//! │           └── 0 rows → someone else took it first; caller rolls back   │
//! │                                                                         │
//! │  Every write bumps `version` and `updated_at`.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::db_timestamp;
use stockroom_core::search::contains_ignore_case;
use stockroom_core::{
    InventorySummary, Item, ItemDraft, ItemSnapshot, ItemUpdate, Money, Totals, ValidationError,
    MAX_STOCK_QUANTITY,
};

/// Repository for item database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.items();
///
/// let page = repo.list(0, 10).await?;
/// let summary = repo.summary().await?;
/// let hits = repo.search_by_name("widget").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Lists items ordered by id.
    pub async fn list(&self, skip: i64, limit: i64) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, quantity, price_cents, version, created_at, updated_at
            FROM items
            ORDER BY id
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Every item, ordered by id.
    pub async fn list_all(&self) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, quantity, price_cents, version, created_at, updated_at
            FROM items
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets an item by its id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Item>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_in(&mut conn, id).await
    }

    /// Gets the item registered under `name`, if any.
    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<Item>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_name_in(&mut conn, name).await
    }

    /// Case-insensitive substring search over item names.
    ///
    /// Matching uses Unicode lowercasing, so it runs over the fetched rows
    /// rather than in SQL.
    pub async fn search_by_name(&self, name: &str) -> DbResult<Vec<Item>> {
        let needle = name.trim();
        debug!(query = %needle, "Searching items by name");

        let items: Vec<Item> = self
            .list_all()
            .await?
            .into_iter()
            .filter(|item| contains_ignore_case(&item.name, needle))
            .collect();

        debug!(count = items.len(), "Item search returned rows");
        Ok(items)
    }

    /// Aggregates over every item.
    ///
    /// Summed in Rust with checked arithmetic, so a store whose value no
    /// longer fits in `i64` cents reports a validation error instead of
    /// failing inside SQLite.
    pub async fn summary(&self) -> DbResult<InventorySummary> {
        let items = self.list_all().await?;
        let lines: Vec<ItemSnapshot> = items.iter().map(ItemSnapshot::from).collect();
        let totals = Totals::from_lines(&lines)?;

        Ok(InventorySummary {
            unique_items_count: totals.unique_items_count,
            total_items_count: totals.total_items_count,
            total_price: totals.total_price,
        })
    }

    /// Counts items (for diagnostics and the seed tool).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Transactional building blocks
    // =========================================================================

    /// Gets an item by id on an open connection.
    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, quantity, price_cents, version, created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(item)
    }

    /// Gets an item by exact name on an open connection.
    ///
    /// Names are not constrained unique; the oldest row wins.
    pub async fn find_by_name_in(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, quantity, price_cents, version, created_at, updated_at
            FROM items
            WHERE name = ?1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(item)
    }

    /// Inserts a new item from a restock line.
    pub async fn insert_in(
        conn: &mut SqliteConnection,
        draft: &ItemDraft,
        now: DateTime<Utc>,
    ) -> DbResult<Item> {
        debug!(name = %draft.name, quantity = draft.quantity, "Inserting item");

        let now = db_timestamp(now);
        let result = sqlx::query(
            r#"
            INSERT INTO items (name, quantity, price_cents, version, created_at, updated_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?4)
            "#,
        )
        .bind(&draft.name)
        .bind(draft.quantity)
        .bind(draft.price.cents())
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        Self::fetch_in(conn, result.last_insert_rowid()).await
    }

    /// Adds `quantity` to an existing item and replaces its price.
    ///
    /// Fails with a validation error, leaving the row untouched, when the
    /// new level would exceed [`MAX_STOCK_QUANTITY`].
    pub async fn restock_in(
        conn: &mut SqliteConnection,
        id: i64,
        quantity: i64,
        price: Money,
        now: DateTime<Utc>,
    ) -> DbResult<Item> {
        debug!(id, quantity, "Restocking item");

        let result = sqlx::query(
            r#"
            UPDATE items SET
                quantity = quantity + ?2,
                price_cents = ?3,
                version = version + 1,
                updated_at = ?4
            WHERE id = ?1 AND quantity + ?2 <= ?5
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(price.cents())
        .bind(db_timestamp(now))
        .bind(MAX_STOCK_QUANTITY)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: MAX_STOCK_QUANTITY,
            }
            .into());
        }

        Self::fetch_in(conn, id).await
    }

    /// Overwrites name, quantity and price of an item.
    pub async fn overwrite_in(
        conn: &mut SqliteConnection,
        id: i64,
        update: &ItemUpdate,
        now: DateTime<Utc>,
    ) -> DbResult<Item> {
        debug!(id, name = %update.name, "Overwriting item");

        sqlx::query(
            r#"
            UPDATE items SET
                name = ?2,
                quantity = ?3,
                price_cents = ?4,
                version = version + 1,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.quantity)
        .bind(update.price.cents())
        .bind(db_timestamp(now))
        .execute(&mut *conn)
        .await?;

        Self::fetch_in(conn, id).await
    }

    /// Takes `quantity` units from stock if at least that many remain.
    ///
    /// Returns `false` when the guard rejected the write.
    pub async fn decrement_in(
        conn: &mut SqliteConnection,
        id: i64,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE items SET
                quantity = quantity - ?2,
                version = version + 1,
                updated_at = ?3
            WHERE id = ?1 AND quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(db_timestamp(now))
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fetch_in(conn: &mut SqliteConnection, id: i64) -> DbResult<Item> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, quantity, price_cents, version, created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(item)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use stockroom_core::CoreError;

    fn draft(name: &str, quantity: i64, cents: i64) -> ItemDraft {
        ItemDraft {
            name: name.to_string(),
            quantity,
            price: Money::from_cents(cents),
        }
    }

    async fn seeded(lines: &[(&str, i64, i64)]) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        for &(name, quantity, cents) in lines {
            ItemRepository::insert_in(&mut conn, &draft(name, quantity, cents), Utc::now())
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = seeded(&[("Widget", 5, 200)]).await;

        let item = db.items().find_by_name("Widget").await.unwrap().unwrap();
        assert_eq!(item.quantity, 5);
        assert_eq!(item.price.cents(), 200);
        assert_eq!(item.version, 0);

        let same = db.items().get_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(same, item);
        assert!(db.items().find_by_name("widget").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restock_adds_quantity_and_replaces_price() {
        let db = seeded(&[("Widget", 5, 200)]).await;
        let item = db.items().find_by_name("Widget").await.unwrap().unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let restocked =
            ItemRepository::restock_in(&mut conn, item.id, 3, Money::from_cents(250), Utc::now())
                .await
                .unwrap();

        assert_eq!(restocked.quantity, 8);
        assert_eq!(restocked.price.cents(), 250);
        assert_eq!(restocked.version, 1);
    }

    #[tokio::test]
    async fn test_restock_past_stock_ceiling_is_rejected() {
        let db = seeded(&[("Widget", MAX_STOCK_QUANTITY - 1, 200)]).await;
        let item = db.items().find_by_name("Widget").await.unwrap().unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let err =
            ItemRepository::restock_in(&mut conn, item.id, 2, Money::from_cents(250), Utc::now())
                .await
                .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        let topped =
            ItemRepository::restock_in(&mut conn, item.id, 1, Money::from_cents(250), Utc::now())
                .await
                .unwrap();
        assert_eq!(topped.quantity, MAX_STOCK_QUANTITY);
        assert_eq!(topped.version, 1);
    }

    #[tokio::test]
    async fn test_guarded_decrement() {
        let db = seeded(&[("Widget", 5, 200)]).await;
        let item = db.items().find_by_name("Widget").await.unwrap().unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(ItemRepository::decrement_in(&mut conn, item.id, 3, Utc::now()).await.unwrap());
        assert!(!ItemRepository::decrement_in(&mut conn, item.id, 3, Utc::now()).await.unwrap());
        drop(conn);

        let item = db.items().get_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(item.quantity, 2);
    }

    #[tokio::test]
    async fn test_summary() {
        let db = seeded(&[("Widget", 5, 200), ("Gadget", 2, 150)]).await;
        let summary = db.items().summary().await.unwrap();

        assert_eq!(summary.unique_items_count, 2);
        assert_eq!(summary.total_items_count, 7);
        assert_eq!(summary.total_price.cents(), 1300);
    }

    #[tokio::test]
    async fn test_summary_of_empty_store() {
        let db = seeded(&[]).await;
        let summary = db.items().summary().await.unwrap();

        assert_eq!(summary.unique_items_count, 0);
        assert_eq!(summary.total_price, Money::zero());
    }

    #[tokio::test]
    async fn test_summary_overflow_is_a_client_error() {
        let max_price = stockroom_core::MAX_PRICE_CENTS;
        let lines: Vec<(String, i64, i64)> = (0..10)
            .map(|i| (format!("Gold {}", i), MAX_STOCK_QUANTITY, max_price))
            .collect();
        let borrowed: Vec<(&str, i64, i64)> =
            lines.iter().map(|(n, q, p)| (n.as_str(), *q, *p)).collect();
        let db = seeded(&borrowed).await;

        let err = db.items().summary().await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search_by_name_is_case_insensitive() {
        let db = seeded(&[("Blue Widget", 1, 100), ("Гвоздь", 1, 10), ("Gadget", 1, 100)]).await;

        let hits = db.items().search_by_name("WIDGET").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Blue Widget");

        let hits = db.items().search_by_name("гвоз").await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_list_paginates_by_id() {
        let db = seeded(&[("A", 1, 1), ("B", 1, 1), ("C", 1, 1)]).await;

        let page = db.items().list(1, 10).await.unwrap();
        let names: Vec<_> = page.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["B", "C"]);
        assert_eq!(db.items().count().await.unwrap(), 3);
    }
}
