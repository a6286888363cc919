//! # Inventory Operations
//!
//! Every mutating operation on stock, each wrapped in one transaction that
//! also writes exactly one history entry.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request (pure, before any I/O)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE (writers queue here, up to busy_timeout)               │
//! │   ├── read the rows involved                                            │
//! │   ├── apply writes (insert / restock / overwrite / guarded decrement)   │
//! │   ├── HistoryRepository::record_in(...)                                │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: SQLite rolls back the   │
//! │  item writes and the history row together.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Operation          | history_type | before_change | after_change         |
//! |--------------------|--------------|---------------|----------------------|
//! | `create_or_update` | `add`        | -             | requested lines      |
//! | `update`           | `update`     | old `{...}`   | new `{...}`          |
//! | `sell_wholesale`   | `opt`        | -             | sold lines + buyer   |
//! | `sell_retail`      | `sale`       | -             | sold lines           |

use std::collections::HashMap;

use chrono::{FixedOffset, Utc};
use tracing::{info, warn};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::history::HistoryRepository;
use crate::repository::item::ItemRepository;
use stockroom_core::sale::plan_sale;
use stockroom_core::validation::{
    validate_buyer, validate_drafts, validate_extra_info, validate_item_update,
    validate_sale_lines,
};
use stockroom_core::{
    CoreError, HistoryEntry, HistoryType, Identity, Item, ItemDraft, ItemSnapshot, ItemUpdate,
    NewHistoryEntry, RetailSale, SaleLine, Snapshot, WholesaleSale,
};

/// Inventory mutations with their audit trail.
///
/// ## Usage
/// ```rust,ignore
/// let inventory = db.inventory(FixedOffset::east_opt(5 * 3600).unwrap());
///
/// inventory.create_or_update(&actor, &drafts).await?;
/// let entry = inventory.sell_retail(&actor, &sale).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Inventory {
    db: Database,
    display_offset: FixedOffset,
}

impl Inventory {
    /// Creates the operations over `db`, rendering titles in `display_offset`.
    pub fn new(db: Database, display_offset: FixedOffset) -> Self {
        Inventory { db, display_offset }
    }

    /// Restocks by name: existing items gain quantity and take the new price,
    /// unknown names are created.
    ///
    /// Returns the resulting item state for each request line, in order. The
    /// `add` entry records the requested deltas, not the resulting totals.
    pub async fn create_or_update(
        &self,
        actor: &Identity,
        drafts: &[ItemDraft],
    ) -> DbResult<Vec<Item>> {
        validate_drafts(drafts)?;

        let now = Utc::now();
        let mut tx = self.db.begin_write().await?;
        let mut items = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let item = match ItemRepository::find_by_name_in(&mut *tx, &draft.name).await? {
                Some(existing) => {
                    ItemRepository::restock_in(
                        &mut *tx,
                        existing.id,
                        draft.quantity,
                        draft.price,
                        now,
                    )
                    .await?
                }
                None => ItemRepository::insert_in(&mut *tx, draft, now).await?,
            };
            items.push(item);
        }

        let after = Snapshot::Many(drafts.iter().map(ItemSnapshot::from).collect());
        let entry =
            NewHistoryEntry::new(actor, HistoryType::Add, after, now, self.display_offset)?;
        let recorded = HistoryRepository::record_in(&mut *tx, &entry).await?;

        tx.commit().await?;

        info!(
            history_id = recorded.id,
            lines = drafts.len(),
            username = %actor.username,
            "Stock added"
        );
        Ok(items)
    }

    /// Overwrites name, quantity and price of the item with `item_id`.
    ///
    /// Returns the updated item as a one-element list.
    pub async fn update(
        &self,
        actor: &Identity,
        item_id: i64,
        update: &ItemUpdate,
    ) -> DbResult<Vec<Item>> {
        validate_item_update(update)?;

        let now = Utc::now();
        let mut tx = self.db.begin_write().await?;

        let existing = ItemRepository::get_by_id_in(&mut *tx, item_id)
            .await?
            .ok_or_else(|| CoreError::item_not_found(item_id))?;

        let before = Snapshot::One(ItemSnapshot::from(&existing));
        let updated = ItemRepository::overwrite_in(&mut *tx, item_id, update, now).await?;
        let after = Snapshot::One(ItemSnapshot::new(
            update.name.clone(),
            update.quantity,
            update.price,
        ));

        let entry =
            NewHistoryEntry::new(actor, HistoryType::Update, after, now, self.display_offset)?
                .with_before(before)
                .with_extra_info(update.extra_info.clone());
        let recorded = HistoryRepository::record_in(&mut *tx, &entry).await?;

        tx.commit().await?;

        info!(
            history_id = recorded.id,
            item_id,
            username = %actor.username,
            "Item updated"
        );
        Ok(vec![updated])
    }

    /// Sells to a named buyer. All lines succeed or nothing changes.
    pub async fn sell_wholesale(
        &self,
        actor: &Identity,
        sale: &WholesaleSale,
    ) -> DbResult<HistoryEntry> {
        validate_buyer(&sale.buyer)?;
        self.sell(
            actor,
            HistoryType::Opt,
            Some(sale.buyer.clone()),
            sale.extra_info.clone(),
            &sale.items,
        )
        .await
    }

    /// Sells over the counter. All lines succeed or nothing changes.
    pub async fn sell_retail(&self, actor: &Identity, sale: &RetailSale) -> DbResult<HistoryEntry> {
        self.sell(
            actor,
            HistoryType::Sale,
            None,
            sale.extra_info.clone(),
            &sale.items,
        )
        .await
    }

    async fn sell(
        &self,
        actor: &Identity,
        history_type: HistoryType,
        buyer: Option<String>,
        extra_info: Option<String>,
        lines: &[SaleLine],
    ) -> DbResult<HistoryEntry> {
        validate_sale_lines(lines)?;
        validate_extra_info(extra_info.as_deref())?;

        let now = Utc::now();
        let mut tx = self.db.begin_write().await?;

        // Collect
        let mut stock: HashMap<String, Item> = HashMap::new();
        for line in lines {
            if stock.contains_key(&line.name) {
                continue;
            }
            if let Some(item) = ItemRepository::find_by_name_in(&mut *tx, &line.name).await? {
                stock.insert(line.name.clone(), item);
            }
        }

        // Validate
        let plan = plan_sale(lines, &stock).map_err(|err| {
            warn!(error = %err, username = %actor.username, "Sale rejected");
            err
        })?;

        // Apply
        for planned in &plan.lines {
            let taken = ItemRepository::decrement_in(
                &mut *tx,
                planned.item_id,
                planned.snapshot.quantity,
                now,
            )
            .await?;

            if !taken {
                let available = stock
                    .get(&planned.snapshot.name)
                    .map(|item| item.quantity)
                    .unwrap_or(0);
                warn!(item = %planned.snapshot.name, "Stock changed during sale");
                return Err(CoreError::InsufficientStock {
                    name: planned.snapshot.name.clone(),
                    available,
                    requested: planned.snapshot.quantity,
                }
                .into());
            }
        }

        let entry =
            NewHistoryEntry::new(actor, history_type, plan.snapshot(), now, self.display_offset)?
                .with_buyer(buyer)
                .with_extra_info(extra_info);
        let recorded = HistoryRepository::record_in(&mut *tx, &entry).await?;

        tx.commit().await?;

        info!(
            history_id = recorded.id,
            history_type = %history_type,
            lines = lines.len(),
            username = %actor.username,
            "Sale recorded"
        );
        Ok(recorded)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::DbConfig;
    use serde_json::json;
    use std::path::PathBuf;
    use stockroom_core::{Money, UserRole, MAX_STOCK_QUANTITY};

    fn alice() -> Identity {
        Identity {
            id: 1,
            username: "alice".to_string(),
            role: UserRole::Staff,
        }
    }

    fn draft(name: &str, quantity: i64, cents: i64) -> ItemDraft {
        ItemDraft {
            name: name.to_string(),
            quantity,
            price: Money::from_cents(cents),
        }
    }

    fn line(name: &str, quantity: i64) -> SaleLine {
        SaleLine {
            name: name.to_string(),
            quantity,
        }
    }

    fn retail(lines: Vec<SaleLine>) -> RetailSale {
        RetailSale {
            extra_info: None,
            items: lines,
        }
    }

    async fn setup() -> (Database, Inventory) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inventory = db.inventory(FixedOffset::east_opt(5 * 3600).unwrap());
        (db, inventory)
    }

    async fn quantity_of(db: &Database, name: &str) -> i64 {
        db.items().find_by_name(name).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn test_restock_creates_item_and_add_entry() {
        let (db, inventory) = setup().await;

        let items = inventory
            .create_or_update(&alice(), &[draft("Widget", 5, 200)])
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);

        let history = db.history().list(0, 10, None).await.unwrap();
        assert_eq!(history.len(), 1);
        let entry = &history[0];
        assert_eq!(entry.history_type, HistoryType::Add);
        assert_eq!(entry.username, "alice");
        assert_eq!(entry.total_unique_items_count, 1);
        assert_eq!(entry.total_items_count, 5);
        assert_eq!(entry.total_price.to_decimal(), 10.0);
        assert_eq!(
            entry.after_change,
            json!([{"name": "Widget", "quantity": 5, "price": 2.0}])
        );
        assert!(entry.title.contains("| alice | Stock added |"));
    }

    #[tokio::test]
    async fn test_restock_twice_doubles_quantity() {
        let (db, inventory) = setup().await;
        let request = [draft("Widget", 5, 200), draft("Gadget", 2, 150)];

        inventory.create_or_update(&alice(), &request).await.unwrap();
        let second = inventory.create_or_update(&alice(), &request).await.unwrap();

        assert_eq!(second[0].quantity, 10);
        assert_eq!(second[1].quantity, 4);
        assert_eq!(quantity_of(&db, "Widget").await, 10);
        assert_eq!(db.items().count().await.unwrap(), 2);

        let history = db.history().list(0, 10, None).await.unwrap();
        assert_eq!(history.len(), 2);
        for entry in &history {
            assert_eq!(entry.total_price.cents(), 5 * 200 + 2 * 150);
            assert_eq!(entry.total_items_count, 7);
        }
    }

    #[tokio::test]
    async fn test_restock_replaces_price() {
        let (db, inventory) = setup().await;
        inventory.create_or_update(&alice(), &[draft("Widget", 5, 200)]).await.unwrap();
        inventory.create_or_update(&alice(), &[draft("Widget", 1, 300)]).await.unwrap();

        let item = db.items().find_by_name("Widget").await.unwrap().unwrap();
        assert_eq!(item.price.cents(), 300);
        assert_eq!(item.quantity, 6);
        assert_eq!(item.version, 1);
    }

    #[tokio::test]
    async fn test_empty_restock_is_rejected() {
        let (db, inventory) = setup().await;
        let err = inventory.create_or_update(&alice(), &[]).await.unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert_eq!(db.history().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retail_sale() {
        let (db, inventory) = setup().await;
        inventory.create_or_update(&alice(), &[draft("Widget", 5, 200)]).await.unwrap();

        let entry = inventory
            .sell_retail(&alice(), &retail(vec![line("Widget", 3)]))
            .await
            .unwrap();

        assert_eq!(quantity_of(&db, "Widget").await, 2);
        assert_eq!(entry.history_type, HistoryType::Sale);
        assert!(entry.buyer.is_none());
        assert_eq!(
            entry.after_change,
            json!([{"name": "Widget", "quantity": 3, "price": 2.0}])
        );
        assert_eq!(entry.total_price.cents(), 600);
        assert!(entry.title.contains("Retail sale"));
    }

    #[tokio::test]
    async fn test_wholesale_records_buyer_and_extra_info() {
        let (_db, inventory) = setup().await;
        inventory.create_or_update(&alice(), &[draft("Widget", 5, 200)]).await.unwrap();

        let sale = WholesaleSale {
            buyer: "ACME".to_string(),
            extra_info: Some("invoice 17".to_string()),
            items: vec![line("Widget", 5)],
        };
        let entry = inventory.sell_wholesale(&alice(), &sale).await.unwrap();

        assert_eq!(entry.history_type, HistoryType::Opt);
        assert_eq!(entry.buyer.as_deref(), Some("ACME"));
        assert_eq!(entry.extra_info.as_deref(), Some("invoice 17"));
        assert!(entry.title.contains("Wholesale sale"));
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_whole_sale() {
        let (db, inventory) = setup().await;
        inventory
            .create_or_update(&alice(), &[draft("Widget", 5, 200), draft("Gadget", 1, 900)])
            .await
            .unwrap();

        let sale = WholesaleSale {
            buyer: "ACME".to_string(),
            extra_info: None,
            items: vec![line("Widget", 2), line("Gadget", 2)],
        };
        let err = inventory.sell_wholesale(&alice(), &sale).await.unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));
        assert_eq!(quantity_of(&db, "Widget").await, 5);
        assert_eq!(quantity_of(&db, "Gadget").await, 1);
        assert_eq!(db.history().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_item_rolls_back_sale() {
        let (db, inventory) = setup().await;
        inventory.create_or_update(&alice(), &[draft("Widget", 5, 200)]).await.unwrap();

        let err = inventory
            .sell_retail(&alice(), &retail(vec![line("Widget", 1), line("Ghost", 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::ItemNotFound(_))));
        assert_eq!(quantity_of(&db, "Widget").await, 5);
        assert_eq!(db.history().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_repeated_lines_are_checked_together() {
        let (db, inventory) = setup().await;
        inventory.create_or_update(&alice(), &[draft("Widget", 5, 200)]).await.unwrap();

        let err = inventory
            .sell_retail(&alice(), &retail(vec![line("Widget", 3), line("Widget", 3)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));
        assert_eq!(quantity_of(&db, "Widget").await, 5);

        inventory
            .sell_retail(&alice(), &retail(vec![line("Widget", 3), line("Widget", 2)]))
            .await
            .unwrap();
        assert_eq!(quantity_of(&db, "Widget").await, 0);
    }

    /// A database file in the temp dir, removed together with its WAL files
    /// on drop.
    struct TempDb {
        path: PathBuf,
    }

    impl TempDb {
        fn new() -> Self {
            let path =
                std::env::temp_dir().join(format!("stockroom-{}.db", uuid::Uuid::new_v4()));
            TempDb { path }
        }

        async fn open(&self) -> (Database, Inventory) {
            let db = Database::new(DbConfig::new(&self.path).max_connections(5))
                .await
                .unwrap();
            let inventory = db.inventory(FixedOffset::east_opt(5 * 3600).unwrap());
            (db, inventory)
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm"] {
                let mut file = self.path.clone().into_os_string();
                file.push(suffix);
                let _ = std::fs::remove_file(file);
            }
        }
    }

    async fn sell_concurrently(
        inventory: &Inventory,
        requests: usize,
    ) -> Vec<DbResult<HistoryEntry>> {
        let tasks: Vec<_> = (0..requests)
            .map(|_| {
                let inventory = inventory.clone();
                tokio::spawn(async move {
                    inventory
                        .sell_retail(&alice(), &retail(vec![line("Widget", 1)]))
                        .await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(requests);
        for task in tasks {
            results.push(task.await.unwrap());
        }
        results
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_all_complete() {
        let file = TempDb::new();
        let (db, inventory) = file.open().await;
        inventory.create_or_update(&alice(), &[draft("Widget", 1000, 200)]).await.unwrap();

        let results = sell_concurrently(&inventory, 40).await;

        for result in &results {
            assert!(result.is_ok(), "sale failed: {:?}", result);
        }
        assert_eq!(quantity_of(&db, "Widget").await, 960);
        assert_eq!(
            db.history().list(0, 100, Some(HistoryType::Sale)).await.unwrap().len(),
            40
        );
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let file = TempDb::new();
        let (db, inventory) = file.open().await;
        inventory.create_or_update(&alice(), &[draft("Widget", 5, 200)]).await.unwrap();

        let results = sell_concurrently(&inventory, 10).await;

        let sold = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(sold, 5);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(err, DbError::Core(CoreError::InsufficientStock { .. })),
                "unexpected error: {}",
                err
            );
        }
        assert_eq!(quantity_of(&db, "Widget").await, 0);
        assert_eq!(
            db.history().list(0, 100, Some(HistoryType::Sale)).await.unwrap().len(),
            5
        );
        db.close().await;
    }

    #[tokio::test]
    async fn test_price_beyond_ceiling_is_rejected_before_any_write() {
        let (db, inventory) = setup().await;
        let gold = ItemDraft {
            name: "Gold".to_string(),
            quantity: 100,
            price: Money::from_decimal(1e15).unwrap(),
        };

        let err = inventory.create_or_update(&alice(), &[gold]).await.unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert_eq!(db.items().count().await.unwrap(), 0);
        assert_eq!(db.history().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_restock_past_stock_ceiling_rolls_back() {
        let (db, inventory) = setup().await;
        inventory
            .create_or_update(&alice(), &[draft("Widget", MAX_STOCK_QUANTITY, 200)])
            .await
            .unwrap();

        let err = inventory
            .create_or_update(&alice(), &[draft("Gadget", 1, 100), draft("Widget", 1, 200)])
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert_eq!(quantity_of(&db, "Widget").await, MAX_STOCK_QUANTITY);
        assert!(db.items().find_by_name("Gadget").await.unwrap().is_none());
        assert_eq!(db.history().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_records_before_and_after() {
        let (db, inventory) = setup().await;
        let created = inventory
            .create_or_update(&alice(), &[draft("Widget", 5, 200)])
            .await
            .unwrap();

        let update = ItemUpdate {
            name: "Blue Widget".to_string(),
            quantity: 7,
            price: Money::from_cents(250),
            extra_info: Some("recount".to_string()),
        };
        let updated = inventory.update(&alice(), created[0].id, &update).await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].name, "Blue Widget");

        let entry = db.history().list(0, 1, Some(HistoryType::Update)).await.unwrap().remove(0);
        assert_eq!(
            entry.before_change,
            Some(json!({"name": "Widget", "quantity": 5, "price": 2.0}))
        );
        assert_eq!(
            entry.after_change,
            json!({"name": "Blue Widget", "quantity": 7, "price": 2.5})
        );
        assert_eq!(entry.extra_info.as_deref(), Some("recount"));
        assert_eq!(entry.total_unique_items_count, 1);
        assert_eq!(entry.total_items_count, 7);
        assert_eq!(entry.total_price.cents(), 1750);
    }

    #[tokio::test]
    async fn test_update_unknown_item() {
        let (db, inventory) = setup().await;
        let update = ItemUpdate {
            name: "Widget".to_string(),
            quantity: 1,
            price: Money::from_cents(100),
            extra_info: None,
        };

        let err = inventory.update(&alice(), 42, &update).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ItemNotFound(_))));
        assert_eq!(db.history().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_returned_entry_matches_listed_entry() {
        let (db, inventory) = setup().await;
        inventory.create_or_update(&alice(), &[draft("Шуруп", 10, 5)]).await.unwrap();

        let entry = inventory
            .sell_retail(&alice(), &retail(vec![line("Шуруп", 4)]))
            .await
            .unwrap();

        let listed = db.history().list(0, 1, None).await.unwrap().remove(0);
        assert_eq!(listed, entry);

        let found = db.history().search("шуруп").await.unwrap();
        assert!(found.contains(&entry));
    }

    #[tokio::test]
    async fn test_search_is_superset_of_matching_entries() {
        let (db, inventory) = setup().await;
        inventory
            .create_or_update(&alice(), &[draft("Widget", 5, 200), draft("Gadget", 5, 100)])
            .await
            .unwrap();
        inventory.sell_retail(&alice(), &retail(vec![line("Widget", 1)])).await.unwrap();
        inventory.sell_retail(&alice(), &retail(vec![line("Gadget", 1)])).await.unwrap();

        let all = db.history().list(0, 100, None).await.unwrap();
        let hits = db.history().search("widget").await.unwrap();

        for entry in &all {
            if entry.after_change.to_string().to_lowercase().contains("widget") {
                assert!(hits.iter().any(|hit| hit.id == entry.id));
            }
        }
        assert_eq!(hits.len(), 2);
    }
}
