//! # Sale Planning
//!
//! Validates a multi-line sale against current stock before anything is
//! written.
//!
//! ## Collect, Validate, Then Apply
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Request lines          Stock (read in the sale's transaction)          │
//! │  ─────────────          ──────────────────────────────────────          │
//! │  Widget × 3             Widget: 5 @ 2.00                               │
//! │  Gadget × 2             Gadget: 1 @ 9.00                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_sale() ← THIS MODULE (pure)                                      │
//! │       │                                                                 │
//! │       ├── unknown name?          → ItemNotFound, nothing applied        │
//! │       ├── Σ requested > stock?   → InsufficientStock, nothing applied   │
//! │       │                                                                 │
//! │       └── OK → SalePlan { lines with price at time of sale }           │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │            store applies every decrement + one history row, commits     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Demand is aggregated per name, so `[Widget × 3, Widget × 3]` against a
//! stock of 5 is rejected even though each line alone would fit.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::history::{ItemSnapshot, Snapshot};
use crate::types::{Item, SaleLine};

/// One validated sale line bound to the item row it draws from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub item_id: i64,
    /// Name, requested quantity, and the item's price at time of sale.
    pub snapshot: ItemSnapshot,
}

/// A fully validated sale, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct SalePlan {
    pub lines: Vec<PlannedLine>,
}

impl SalePlan {
    /// The `after_change` payload: every sold line, in request order.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::Many(self.lines.iter().map(|l| l.snapshot.clone()).collect())
    }
}

/// Checks every line against `stock` (keyed by item name).
///
/// Fails on the first unknown name or the first name whose cumulative demand
/// exceeds its stock. Returns the plan only when every line passes.
///
/// ```rust
/// use std::collections::HashMap;
/// use chrono::Utc;
/// use stockroom_core::sale::plan_sale;
/// use stockroom_core::{Item, Money, SaleLine};
///
/// let now = Utc::now();
/// let widget = Item {
///     id: 1, name: "Widget".into(), quantity: 5, price: Money::from_cents(200),
///     version: 0, created_at: now, updated_at: now,
/// };
/// let stock = HashMap::from([(widget.name.clone(), widget)]);
///
/// let plan = plan_sale(&[SaleLine { name: "Widget".into(), quantity: 3 }], &stock).unwrap();
/// assert_eq!(plan.lines[0].snapshot.price.cents(), 200);
///
/// let too_many = [SaleLine { name: "Widget".into(), quantity: 6 }];
/// assert!(plan_sale(&too_many, &stock).is_err());
/// ```
pub fn plan_sale(lines: &[SaleLine], stock: &HashMap<String, Item>) -> CoreResult<SalePlan> {
    let mut demand: HashMap<&str, i64> = HashMap::new();
    let mut planned = Vec::with_capacity(lines.len());

    for line in lines {
        let item = stock
            .get(&line.name)
            .ok_or_else(|| CoreError::item_not_found(&line.name))?;

        let requested = demand.entry(item.name.as_str()).or_insert(0);
        *requested += line.quantity;

        if !item.can_sell(*requested) {
            return Err(CoreError::InsufficientStock {
                name: item.name.clone(),
                available: item.quantity,
                requested: *requested,
            });
        }

        planned.push(PlannedLine {
            item_id: item.id,
            snapshot: ItemSnapshot::new(item.name.clone(), line.quantity, item.price),
        });
    }

    Ok(SalePlan { lines: planned })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use chrono::Utc;

    fn stock(entries: &[(i64, &str, i64, i64)]) -> HashMap<String, Item> {
        let now = Utc::now();
        entries
            .iter()
            .map(|&(id, name, quantity, cents)| {
                (
                    name.to_string(),
                    Item {
                        id,
                        name: name.to_string(),
                        quantity,
                        price: Money::from_cents(cents),
                        version: 0,
                        created_at: now,
                        updated_at: now,
                    },
                )
            })
            .collect()
    }

    fn line(name: &str, quantity: i64) -> SaleLine {
        SaleLine {
            name: name.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_plan_records_price_at_time_of_sale() {
        let stock = stock(&[(1, "Widget", 5, 200), (2, "Gadget", 4, 900)]);
        let plan = plan_sale(&[line("Widget", 3), line("Gadget", 1)], &stock).unwrap();

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].item_id, 1);
        assert_eq!(
            plan.lines[1].snapshot,
            ItemSnapshot::new("Gadget", 1, Money::from_cents(900))
        );
    }

    #[test]
    fn test_unknown_item_fails_plan() {
        let stock = stock(&[(1, "Widget", 5, 200)]);
        let err = plan_sale(&[line("Widget", 1), line("Ghost", 1)], &stock).unwrap_err();
        assert!(matches!(err, CoreError::ItemNotFound(name) if name == "Ghost"));
    }

    #[test]
    fn test_second_line_over_stock_fails_plan() {
        let stock = stock(&[(1, "Widget", 5, 200), (2, "Gadget", 1, 900)]);
        let err = plan_sale(&[line("Widget", 2), line("Gadget", 2)], &stock).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 1, requested: 2, .. }
        ));
    }

    #[test]
    fn test_demand_is_aggregated_per_name() {
        let stock = stock(&[(1, "Widget", 5, 200)]);
        assert!(plan_sale(&[line("Widget", 3), line("Widget", 2)], &stock).is_ok());

        let err = plan_sale(&[line("Widget", 3), line("Widget", 3)], &stock).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 5, requested: 6, .. }
        ));
    }

    #[test]
    fn test_plan_snapshot_lists_every_line() {
        let stock = stock(&[(1, "Widget", 5, 200)]);
        let plan = plan_sale(&[line("Widget", 1), line("Widget", 1)], &stock).unwrap();
        assert_eq!(plan.snapshot().lines().len(), 2);
    }
}
