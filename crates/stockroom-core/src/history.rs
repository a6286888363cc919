//! # History Module
//!
//! The audit record written for every inventory mutation, and the pure logic
//! around it: snapshots, aggregate totals, display titles and JSON encoding.
//!
//! ## Record Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HistoryEntry (immutable once written)                                  │
//! │                                                                         │
//! │  id ─────────────── autoincrement, never reused                         │
//! │  timestamp ──────── UTC capture time                                    │
//! │  username ───────── actor (Identity.username)                           │
//! │  buyer ──────────── wholesale only                                      │
//! │  extra_info ─────── free text from the caller                           │
//! │  before_change ──── update only: {name, quantity, price}                │
//! │  after_change ───── add/opt/sale: [{...}, ...]   update: {...}          │
//! │  history_type ───── add | update | opt | sale                           │
//! │  title ──────────── "17.10.2026 | alice | Retail sale | 14:05"          │
//! │  totals ─────────── unique names, units, Σ quantity × price             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Canonical Encoding
//! Snapshots are serialized once, at write time, with `serde_json`. Non-ASCII
//! text is written as-is (never `\u` escaped), so the stored text is both valid
//! JSON and directly searchable.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Identity, Item, ItemDraft};

// =============================================================================
// History Type
// =============================================================================

/// Kind of mutation a history entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum HistoryType {
    /// Restock / new items.
    Add,
    /// Direct overwrite of one item.
    Update,
    /// Wholesale sale.
    Opt,
    /// Retail sale.
    Sale,
}

impl HistoryType {
    pub const ALL: [HistoryType; 4] = [
        HistoryType::Add,
        HistoryType::Update,
        HistoryType::Opt,
        HistoryType::Sale,
    ];

    /// Wire and storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            HistoryType::Add => "add",
            HistoryType::Update => "update",
            HistoryType::Opt => "opt",
            HistoryType::Sale => "sale",
        }
    }

    /// Operation label used in titles.
    pub const fn label(&self) -> &'static str {
        match self {
            HistoryType::Add => "Stock added",
            HistoryType::Update => "Item updated",
            HistoryType::Opt => "Wholesale sale",
            HistoryType::Sale => "Retail sale",
        }
    }
}

impl fmt::Display for HistoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HistoryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "history_type".to_string(),
                allowed: HistoryType::ALL.iter().map(|t| t.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Frozen view of one item line at the time of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemSnapshot {
    pub name: String,
    #[ts(type = "number")]
    pub quantity: i64,
    #[serde(with = "crate::money::decimal")]
    #[ts(type = "number")]
    pub price: Money,
}

impl ItemSnapshot {
    pub fn new(name: impl Into<String>, quantity: i64, price: Money) -> Self {
        ItemSnapshot {
            name: name.into(),
            quantity,
            price,
        }
    }

    /// Price × quantity, `None` when it leaves the `i64` range.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_multiply_quantity(self.quantity)
    }
}

impl From<&Item> for ItemSnapshot {
    fn from(item: &Item) -> Self {
        ItemSnapshot::new(item.name.clone(), item.quantity, item.price)
    }
}

impl From<&ItemDraft> for ItemSnapshot {
    fn from(draft: &ItemDraft) -> Self {
        ItemSnapshot::new(draft.name.clone(), draft.quantity, draft.price)
    }
}

/// Payload of `before_change` / `after_change`.
///
/// `update` entries hold a single object; every other type holds a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum Snapshot {
    One(ItemSnapshot),
    Many(Vec<ItemSnapshot>),
}

impl Snapshot {
    /// The snapshot's lines, whichever shape it has.
    pub fn lines(&self) -> &[ItemSnapshot] {
        match self {
            Snapshot::One(line) => std::slice::from_ref(line),
            Snapshot::Many(lines) => lines,
        }
    }

    /// Canonical JSON text as stored in the history table.
    pub fn to_canonical_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(|e| CoreError::MalformedJson(e.to_string()))
    }

    /// Structured JSON value, as returned to clients.
    pub fn to_value(&self) -> CoreResult<Value> {
        serde_json::to_value(self).map_err(|e| CoreError::MalformedJson(e.to_string()))
    }
}

/// Decodes stored snapshot text into a JSON value.
///
/// Text written by this crate is canonical and parses directly. Rows imported
/// from older deployments may hold the snapshot double-encoded as a JSON
/// string (`"[{\"name\": ...}]"`); those are unwrapped once. Anything that is
/// not, in the end, an object or an array is rejected.
///
/// ```rust
/// use stockroom_core::history::decode_snapshot_text;
///
/// let direct = decode_snapshot_text(r#"[{"name":"Widget","quantity":1,"price":2.0}]"#).unwrap();
/// let legacy = decode_snapshot_text(r#""[{\"name\":\"Widget\",\"quantity\":1,\"price\":2.0}]""#).unwrap();
/// assert_eq!(direct, legacy);
/// assert!(decode_snapshot_text("not json").is_err());
/// ```
pub fn decode_snapshot_text(text: &str) -> CoreResult<Value> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| CoreError::MalformedJson(e.to_string()))?;

    let value = match value {
        Value::String(inner) => {
            serde_json::from_str(&inner).map_err(|e| CoreError::MalformedJson(e.to_string()))?
        }
        other => other,
    };

    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        other => Err(CoreError::MalformedJson(format!(
            "snapshot must be an object or a list, got {}",
            other
        ))),
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Aggregate counters stored with every history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    /// Distinct item names.
    pub unique_items_count: i64,
    /// Σ quantity.
    pub total_items_count: i64,
    /// Σ quantity × price.
    pub total_price: Money,
}

impl Totals {
    /// Computes the counters over a set of lines.
    ///
    /// ```rust
    /// use stockroom_core::history::{ItemSnapshot, Totals};
    /// use stockroom_core::Money;
    ///
    /// let lines = vec![
    ///     ItemSnapshot::new("Widget", 5, Money::from_cents(200)),
    ///     ItemSnapshot::new("Widget", 1, Money::from_cents(200)),
    ///     ItemSnapshot::new("Gadget", 2, Money::from_cents(150)),
    /// ];
    /// let totals = Totals::from_lines(&lines).unwrap();
    /// assert_eq!(totals.unique_items_count, 2);
    /// assert_eq!(totals.total_items_count, 8);
    /// assert_eq!(totals.total_price.cents(), 1500);
    /// ```
    ///
    /// Fails with [`ValidationError::OutOfRange`] when a line total or one
    /// of the sums leaves the `i64` range.
    pub fn from_lines(lines: &[ItemSnapshot]) -> Result<Self, ValidationError> {
        let unique: HashSet<&str> = lines.iter().map(|l| l.name.as_str()).collect();

        let mut total_items_count: i64 = 0;
        let mut total_price = Money::zero();
        for line in lines {
            total_items_count = total_items_count
                .checked_add(line.quantity)
                .ok_or_else(|| overflow("total_items_count"))?;
            total_price = line
                .line_total()
                .and_then(|line_total| total_price.checked_add(line_total))
                .ok_or_else(|| overflow("total_price"))?;
        }

        Ok(Totals {
            unique_items_count: unique.len() as i64,
            total_items_count,
            total_price,
        })
    }
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

// =============================================================================
// Titles
// =============================================================================

/// Renders `<dd.mm.YYYY> | <actor> | <label> | <HH:MM>` in the display offset.
///
/// ```rust
/// use chrono::{FixedOffset, TimeZone, Utc};
/// use stockroom_core::history::{render_title, HistoryType};
///
/// let at = Utc.with_ymd_and_hms(2026, 10, 17, 21, 30, 0).unwrap();
/// let offset = FixedOffset::east_opt(5 * 3600).unwrap();
/// assert_eq!(
///     render_title(at, offset, "alice", HistoryType::Sale),
///     "18.10.2026 | alice | Retail sale | 02:30"
/// );
/// ```
pub fn render_title(
    at: DateTime<Utc>,
    offset: FixedOffset,
    actor: &str,
    history_type: HistoryType,
) -> String {
    let local = at.with_timezone(&offset);
    format!(
        "{} | {} | {} | {}",
        local.format("%d.%m.%Y"),
        actor,
        history_type.label(),
        local.format("%H:%M")
    )
}

// =============================================================================
// New Entry (write side)
// =============================================================================

/// A history record ready to be inserted.
///
/// Built by the inventory operations, persisted by the history recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub buyer: Option<String>,
    pub extra_info: Option<String>,
    pub before_change: Option<Snapshot>,
    pub after_change: Snapshot,
    pub history_type: HistoryType,
    pub title: String,
    pub totals: Totals,
}

impl NewHistoryEntry {
    /// Starts an entry for `actor`, computing totals from `after_change`.
    pub fn new(
        actor: &Identity,
        history_type: HistoryType,
        after_change: Snapshot,
        at: DateTime<Utc>,
        display_offset: FixedOffset,
    ) -> Result<Self, ValidationError> {
        let totals = Totals::from_lines(after_change.lines())?;

        Ok(NewHistoryEntry {
            timestamp: at,
            username: actor.username.clone(),
            buyer: None,
            extra_info: None,
            before_change: None,
            after_change,
            history_type,
            title: render_title(at, display_offset, &actor.username, history_type),
            totals,
        })
    }

    pub fn with_before(mut self, before: Snapshot) -> Self {
        self.before_change = Some(before);
        self
    }

    pub fn with_buyer(mut self, buyer: Option<String>) -> Self {
        self.buyer = buyer;
        self
    }

    pub fn with_extra_info(mut self, extra_info: Option<String>) -> Self {
        self.extra_info = extra_info;
        self
    }
}

// =============================================================================
// Stored Entry (read side)
// =============================================================================

/// A persisted history entry as returned to clients.
///
/// Snapshots are structured JSON values, not strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryEntry {
    #[ts(type = "number")]
    pub id: i64,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub buyer: Option<String>,
    pub extra_info: Option<String>,
    pub before_change: Option<Value>,
    pub after_change: Value,
    pub history_type: HistoryType,
    pub title: String,
    #[ts(type = "number")]
    pub total_unique_items_count: i64,
    #[ts(type = "number")]
    pub total_items_count: i64,
    #[serde(with = "crate::money::decimal")]
    #[ts(type = "number")]
    pub total_price: Money,
}

impl HistoryEntry {
    /// Decodes `after_change` back into typed snapshot lines.
    pub fn after_snapshot(&self) -> CoreResult<Snapshot> {
        serde_json::from_value(self.after_change.clone())
            .map_err(|e| CoreError::MalformedJson(e.to_string()))
    }

    /// Decodes `before_change`, if present.
    pub fn before_snapshot(&self) -> CoreResult<Option<Snapshot>> {
        self.before_change
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| CoreError::MalformedJson(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserRole;
    use chrono::TimeZone;

    fn alice() -> Identity {
        Identity {
            id: 1,
            username: "alice".to_string(),
            role: UserRole::Staff,
        }
    }

    fn plus_five() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600).unwrap()
    }

    #[test]
    fn test_history_type_round_trip_names() {
        for t in HistoryType::ALL {
            assert_eq!(t.as_str().parse::<HistoryType>().unwrap(), t);
        }
        assert!("refund".parse::<HistoryType>().is_err());
        assert_eq!(serde_json::to_string(&HistoryType::Opt).unwrap(), r#""opt""#);
    }

    #[test]
    fn test_snapshot_shapes() {
        let one = Snapshot::One(ItemSnapshot::new("Widget", 5, Money::from_cents(200)));
        assert_eq!(
            one.to_canonical_json().unwrap(),
            r#"{"name":"Widget","quantity":5,"price":2.0}"#
        );

        let many = Snapshot::Many(vec![ItemSnapshot::new("Widget", 3, Money::from_cents(200))]);
        assert_eq!(
            many.to_canonical_json().unwrap(),
            r#"[{"name":"Widget","quantity":3,"price":2.0}]"#
        );
        assert_eq!(many.lines().len(), 1);
    }

    #[test]
    fn test_canonical_json_keeps_non_ascii() {
        let snapshot = Snapshot::Many(vec![ItemSnapshot::new("Шуруп", 10, Money::from_cents(5))]);
        let text = snapshot.to_canonical_json().unwrap();
        assert!(text.contains("Шуруп"));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn test_snapshot_deserializes_both_shapes() {
        let one: Snapshot =
            serde_json::from_str(r#"{"name":"Widget","quantity":1,"price":2.5}"#).unwrap();
        assert!(matches!(one, Snapshot::One(_)));

        let many: Snapshot =
            serde_json::from_str(r#"[{"name":"Widget","quantity":1,"price":2.5}]"#).unwrap();
        assert!(matches!(many, Snapshot::Many(ref lines) if lines[0].price.cents() == 250));
    }

    #[test]
    fn test_decode_rejects_scalars() {
        assert!(decode_snapshot_text("42").is_err());
        assert!(decode_snapshot_text(r#""just text""#).is_err());
        assert!(decode_snapshot_text("{broken").is_err());
    }

    #[test]
    fn test_new_entry_computes_totals_and_title() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 0).unwrap();
        let after = Snapshot::Many(vec![
            ItemSnapshot::new("Widget", 5, Money::from_cents(200)),
            ItemSnapshot::new("Gadget", 1, Money::from_cents(1000)),
        ]);

        let entry = NewHistoryEntry::new(&alice(), HistoryType::Add, after, at, plus_five())
            .unwrap()
            .with_extra_info(Some("weekly delivery".to_string()));

        assert_eq!(entry.title, "17.10.2026 | alice | Stock added | 14:05");
        assert_eq!(entry.totals.unique_items_count, 2);
        assert_eq!(entry.totals.total_items_count, 6);
        assert_eq!(entry.totals.total_price.cents(), 2000);
        assert!(entry.buyer.is_none());
        assert!(entry.before_change.is_none());
    }

    #[test]
    fn test_totals_overflow_is_a_validation_error() {
        let line = ItemSnapshot::new("Gold", 100, Money::from_cents(100_000_000_000_000_000));
        assert!(line.line_total().is_none());
        assert!(matches!(
            Totals::from_lines(&[line]),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "total_price"
        ));

        // Each line fits, their sum does not
        let max_line = ItemSnapshot::new(
            "Gold",
            crate::MAX_STOCK_QUANTITY,
            Money::from_cents(crate::MAX_PRICE_CENTS),
        );
        let lines = vec![max_line; 10];
        assert!(Totals::from_lines(&lines).is_err());

        let at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 0).unwrap();
        let entry =
            NewHistoryEntry::new(&alice(), HistoryType::Add, Snapshot::Many(lines), at, plus_five());
        assert!(entry.is_err());
    }

    #[test]
    fn test_entry_snapshot_round_trip() {
        let after = Snapshot::Many(vec![ItemSnapshot::new("Widget", 3, Money::from_cents(200))]);
        let stored = after.to_canonical_json().unwrap();

        let entry = HistoryEntry {
            id: 1,
            timestamp: Utc::now(),
            username: "alice".to_string(),
            buyer: None,
            extra_info: None,
            before_change: None,
            after_change: decode_snapshot_text(&stored).unwrap(),
            history_type: HistoryType::Sale,
            title: String::new(),
            total_unique_items_count: 1,
            total_items_count: 3,
            total_price: Money::from_cents(600),
        };

        assert_eq!(entry.after_snapshot().unwrap(), after);
        assert_eq!(entry.before_snapshot().unwrap(), None);
    }
}
