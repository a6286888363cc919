//! # History Repository
//!
//! The audit log: written once per inventory mutation, then only read,
//! searched, or deleted by an administrator.
//!
//! ## Write Path (History Recorder)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Inventory operation (holds an open transaction)                        │
//! │       │                                                                 │
//! │       │  NewHistoryEntry { after_change, totals, title, ... }           │
//! │       ▼                                                                 │
//! │  HistoryRepository::record_in(&mut *tx, &entry)                        │
//! │       │                                                                 │
//! │       ├── snapshots → canonical JSON text                              │
//! │       ├── timestamp → fixed-width RFC 3339                             │
//! │       └── INSERT INTO history ...                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit() ← item changes and history row land together              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read Path
//! Stored text is decoded back into JSON values on the way out. Legacy rows
//! whose snapshot was double-encoded are repaired transparently; anything
//! else unparseable surfaces as `MalformedJson`.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::db_timestamp;
use stockroom_core::history::decode_snapshot_text;
use stockroom_core::search::SearchQuery;
use stockroom_core::{CoreError, CoreResult, HistoryEntry, HistoryType, Money, NewHistoryEntry};

/// A history row exactly as stored.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub buyer: Option<String>,
    pub extra_info: Option<String>,
    pub before_change: Option<String>,
    pub after_change: String,
    pub history_type: HistoryType,
    pub title: String,
    pub total_unique_items_count: Option<i64>,
    pub total_items_count: Option<i64>,
    pub total_price_cents: Option<i64>,
}

impl HistoryRow {
    /// Checks the row against a search query.
    fn matches(&self, query: &SearchQuery) -> bool {
        query.matches_any(&[
            Some(self.username.as_str()),
            self.buyer.as_deref(),
            self.extra_info.as_deref(),
            self.before_change.as_deref(),
            Some(self.after_change.as_str()),
            Some(self.history_type.as_str()),
            Some(self.title.as_str()),
        ])
    }
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = CoreError;

    fn try_from(row: HistoryRow) -> CoreResult<Self> {
        Ok(HistoryEntry {
            id: row.id,
            timestamp: row.timestamp,
            username: row.username,
            buyer: row.buyer,
            extra_info: row.extra_info,
            before_change: row
                .before_change
                .as_deref()
                .map(decode_snapshot_text)
                .transpose()?,
            after_change: decode_snapshot_text(&row.after_change)?,
            history_type: row.history_type,
            title: row.title,
            total_unique_items_count: row.total_unique_items_count.unwrap_or(0),
            total_items_count: row.total_items_count.unwrap_or(0),
            total_price: Money::from_cents(row.total_price_cents.unwrap_or(0)),
        })
    }
}

fn decode_rows(rows: Vec<HistoryRow>) -> DbResult<Vec<HistoryEntry>> {
    rows.into_iter()
        .map(|row| HistoryEntry::try_from(row).map_err(DbError::from))
        .collect()
}

/// Repository for the audit log.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    /// Creates a new HistoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        HistoryRepository { pool }
    }

    /// Lists entries newest first, optionally filtered by type.
    pub async fn list(
        &self,
        skip: i64,
        limit: i64,
        history_type: Option<HistoryType>,
    ) -> DbResult<Vec<HistoryEntry>> {
        debug!(skip, limit, history_type = ?history_type, "Listing history");

        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT
                id, timestamp, username, buyer, extra_info,
                before_change, after_change, history_type, title,
                total_unique_items_count, total_items_count, total_price_cents
            FROM history
            WHERE ?1 IS NULL OR history_type = ?1
            ORDER BY timestamp DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(history_type)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        decode_rows(rows)
    }

    /// Every entry, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<HistoryEntry>> {
        decode_rows(self.fetch_all_rows().await?)
    }

    /// Returns every entry where any query token occurs in any searchable
    /// field, newest first. A blank query returns everything.
    pub async fn search(&self, query: &str) -> DbResult<Vec<HistoryEntry>> {
        let query = SearchQuery::parse(query);
        debug!(tokens = ?query.tokens(), "Searching history");

        let matched: Vec<HistoryRow> = self
            .fetch_all_rows()
            .await?
            .into_iter()
            .filter(|row| row.matches(&query))
            .collect();

        debug!(count = matched.len(), "History search returned rows");
        decode_rows(matched)
    }

    /// Gets one entry by id.
    pub async fn get(&self, id: i64) -> DbResult<HistoryEntry> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    /// Deletes exactly one entry. Item state is never touched.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM history WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::HistoryNotFound(id).into());
        }

        info!(id, "History entry deleted");
        Ok(())
    }

    /// Counts entries (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts one entry on the caller's connection and returns it as stored.
    ///
    /// Callers pass their open transaction so the entry commits or rolls
    /// back together with the item changes it describes.
    pub async fn record_in(
        conn: &mut SqliteConnection,
        entry: &NewHistoryEntry,
    ) -> DbResult<HistoryEntry> {
        let before_change = entry
            .before_change
            .as_ref()
            .map(|snapshot| snapshot.to_canonical_json())
            .transpose()?;
        let after_change = entry.after_change.to_canonical_json()?;

        let result = sqlx::query(
            r#"
            INSERT INTO history (
                timestamp, username, buyer, extra_info,
                before_change, after_change, history_type, title,
                total_unique_items_count, total_items_count, total_price_cents
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11
            )
            "#,
        )
        .bind(db_timestamp(entry.timestamp))
        .bind(&entry.username)
        .bind(&entry.buyer)
        .bind(&entry.extra_info)
        .bind(before_change)
        .bind(after_change)
        .bind(entry.history_type)
        .bind(&entry.title)
        .bind(entry.totals.unique_items_count)
        .bind(entry.totals.total_items_count)
        .bind(entry.totals.total_price.cents())
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            id,
            history_type = %entry.history_type,
            username = %entry.username,
            "History entry recorded"
        );

        Self::get_in(conn, id).await
    }

    async fn get_in(conn: &mut SqliteConnection, id: i64) -> DbResult<HistoryEntry> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT
                id, timestamp, username, buyer, extra_info,
                before_change, after_change, history_type, title,
                total_unique_items_count, total_items_count, total_price_cents
            FROM history
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(CoreError::HistoryNotFound(id))?;

        Ok(HistoryEntry::try_from(row)?)
    }

    async fn fetch_all_rows(&self) -> DbResult<Vec<HistoryRow>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT
                id, timestamp, username, buyer, extra_info,
                before_change, after_change, history_type, title,
                total_unique_items_count, total_items_count, total_price_cents
            FROM history
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
