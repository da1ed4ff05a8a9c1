//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module maintains per-price aggregates of the order book: how many
// orders rest at each price and their summed remaining quantity. The
// aggregates are updated incrementally on every add, cancel and fill, and
// are consulted by Fill-Or-Kill admission so feasibility is decided in
// O(crossing levels) rather than O(crossing orders).
//
// | Component       | Description                                                     |
// |-----------------|-----------------------------------------------------------------|
// | LevelAggregate  | Order count and summed remaining quantity at one price          |
// | DepthTracker    | Price-ordered map of aggregates with incremental update hooks   |
//
// A single flat map covers both sides: the matching loop guarantees that a
// price rests on at most one side at any observable point.
//--------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use crate::types::{Price, Quantity, Side};

/// Aggregate of all orders resting at one price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelAggregate {
    /// Number of resting orders at this price.
    pub count: usize,
    /// Summed remaining quantity of those orders.
    pub quantity: Quantity,
}

/// Incrementally maintained price -> aggregate map.
#[derive(Debug, Default)]
pub struct DepthTracker {
    levels: BTreeMap<Price, LevelAggregate>,
}

impl DepthTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Records an order joining the book at `price` with `remaining` units.
    #[inline]
    pub fn on_order_added(&mut self, price: Price, remaining: Quantity) {
        let level = self.levels.entry(price).or_insert(LevelAggregate {
            count: 0,
            quantity: 0,
        });
        level.count += 1;
        level.quantity += remaining;
    }

    /// Records an order leaving the book at `price` with `remaining` units
    /// still open (cancellation or sweep).
    #[inline]
    pub fn on_order_removed(&mut self, price: Price, remaining: Quantity) {
        self.update(price, remaining, true);
    }

    /// Records a fill of `quantity` units at `price`. When the fill
    /// completed the resting order, the level's order count drops too.
    #[inline]
    pub fn on_order_matched(&mut self, price: Price, quantity: Quantity, fully_filled: bool) {
        self.update(price, quantity, fully_filled);
    }

    fn update(&mut self, price: Price, quantity: Quantity, drop_order: bool) {
        let Some(level) = self.levels.get_mut(&price) else {
            debug_assert!(false, "level metadata missing for price {price}");
            return;
        };
        debug_assert!(level.quantity >= quantity);
        level.quantity -= quantity;
        if drop_order {
            debug_assert!(level.count > 0);
            level.count -= 1;
        }
        if level.count == 0 {
            self.levels.remove(&price);
        }
    }

    /// Returns the aggregate at `price`, if any orders rest there.
    pub fn aggregate(&self, price: Price) -> Option<LevelAggregate> {
        self.levels.get(&price).copied()
    }

    /// Number of distinct prices currently tracked.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Decides whether an incoming order on `side`, limited at `limit` and
    /// needing `target` units, can be fully displaced by opposite liquidity.
    ///
    /// Walks the aggregates from `best` (the best opposite price) toward
    /// `limit`, summing level quantities and stopping as soon as the target
    /// is covered. Within that range only opposite-side levels can exist: a
    /// same-side order at a crossing price would mean a match is pending.
    pub fn can_cover(&self, side: Side, best: Price, limit: Price, target: Quantity) -> bool {
        let mut needed = target;
        match side {
            Side::Buy => {
                if best > limit {
                    return false;
                }
                for level in self.levels.range(best..=limit).map(|(_, l)| l) {
                    if level.quantity >= needed {
                        return true;
                    }
                    needed -= level.quantity;
                }
            }
            Side::Sell => {
                if best < limit {
                    return false;
                }
                for level in self.levels.range(limit..=best).rev().map(|(_, l)| l) {
                    if level.quantity >= needed {
                        return true;
                    }
                    needed -= level.quantity;
                }
            }
        }
        false
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
