//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the core matching engine logic for admitting orders
// and generating trades. Matching follows price-time priority: better prices
// trade first, and orders at the same price trade in arrival order.
//
// | Component             | Description                                                |
// |-----------------------|------------------------------------------------------------|
// | MatchingEngine        | Single-threaded engine: admission, crossing, cancel/modify |
// | SharedMatchingEngine  | Mutex-guarded facade owning the day-expiry worker          |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Return Type      |
// |-------------------------|---------------------------------------------------|------------------|
// | add_order               | Admits an order and matches it                    | Trades           |
// | cancel_order            | Removes a resting order by id                     | ()               |
// | cancel_orders           | Cancels a batch of ids                            | ()               |
// | modify_order            | Cancel + re-add preserving side and type          | Trades           |
// | order_count             | Number of resting orders                          | usize            |
// | snapshot                | Best-first level rollup per side                  | DepthSnapshot    |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace};

use crate::config::EngineConfig;
use crate::depth::DepthTracker;
use crate::expiry::{self, ShutdownSignal};
use crate::orderbook::{OrderBook, OrderHandle};
use crate::types::{
    DepthSnapshot, Order, OrderId, OrderIds, OrderModify, OrderType, Price, Quantity, Side, Trade,
    TradeInfo, Trades,
};

/// The single-threaded matching engine. Owns the book, the level metadata
/// and the id index; callers needing thread safety use
/// [`SharedMatchingEngine`].
#[derive(Debug, Default)]
pub struct MatchingEngine {
    /// The two sides of the book with their FIFO levels.
    book: OrderBook,
    /// Per-price (count, quantity) aggregates, maintained incrementally.
    depth: DepthTracker,
    /// Maps order ids to their node handle for O(1) cancel and modify.
    orders: HashMap<OrderId, OrderHandle>,
}

impl MatchingEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            book: OrderBook::new(),
            depth: DepthTracker::new(),
            orders: HashMap::new(),
        }
    }

    /// Admits an order and returns the trades it produced, possibly none.
    ///
    /// The call either accepts the order and matches it to completion of its
    /// admission wave, or rejects it with no observable side effect.
    /// Rejections (duplicate id, unmatchable FillAndKill, under-covered
    /// FillOrKill, Market against an empty opposite side) are soft: the
    /// trade list is empty and the book is untouched.
    pub fn add_order(&mut self, mut order: Order) -> Trades {
        if self.orders.contains_key(&order.id()) {
            debug!("rejected order {}: duplicate id", order.id());
            return Trades::new();
        }

        // Market orders convert to GoodTillCancel at the worst opposite
        // resting price, or are dropped when nothing rests there.
        if order.order_type() == OrderType::Market {
            let Some(worst) = self.book.worst_price(order.side().opposite()) else {
                debug!("rejected market order {}: empty opposite side", order.id());
                return Trades::new();
            };
            if let Err(err) = order.convert_to_good_till_cancel(worst) {
                debug!("rejected market order {}: {}", order.id(), err);
                return Trades::new();
            }
        }

        let Some(price) = order.limit_price() else {
            return Trades::new();
        };
        let side = order.side();

        if order.order_type() == OrderType::FillAndKill && !self.can_match(side, price) {
            debug!("rejected fill-and-kill order {}: nothing crossable", order.id());
            return Trades::new();
        }

        if order.order_type() == OrderType::FillOrKill
            && !self.can_fully_fill(side, price, order.initial_quantity())
        {
            debug!("rejected fill-or-kill order {}: insufficient depth", order.id());
            return Trades::new();
        }

        let id = order.id();
        let remaining = order.remaining_quantity();
        let handle = self.book.push_back(price, order);
        self.orders.insert(id, handle);
        self.depth.on_order_added(price, remaining);
        trace!("added order {} at {} on {:?}", id, price, side);

        self.match_orders()
    }

    /// Cancels a resting order. A no-op if the id is unknown, which covers
    /// cancels racing with fills.
    pub fn cancel_order(&mut self, id: OrderId) {
        let Some(handle) = self.orders.remove(&id) else {
            debug!("cancel of unknown order {} ignored", id);
            return;
        };
        let price = self.book.resting_price(handle);
        let order = self.book.remove(handle);
        self.depth.on_order_removed(price, order.remaining_quantity());
        trace!("cancelled order {} at {}", id, price);
    }

    /// Cancels each id in sequence. Batch order is observable.
    pub fn cancel_orders(&mut self, ids: &[OrderId]) {
        for id in ids {
            self.cancel_order(*id);
        }
    }

    /// Modifies a resting order as cancel-then-add, carrying over the
    /// original side and type; price and quantity come from the modify. The
    /// order re-joins its level at the tail, so it loses time priority.
    /// Returns the trades produced by re-admission, or empty if the id is
    /// unknown.
    pub fn modify_order(&mut self, modify: OrderModify) -> Trades {
        let Some(handle) = self.orders.get(&modify.id()) else {
            debug!("modify of unknown order {} ignored", modify.id());
            return Trades::new();
        };
        let existing = self.book.order(*handle);
        let (side, order_type) = (existing.side(), existing.order_type());

        self.cancel_order(modify.id());
        self.add_order(modify.to_order(side, order_type))
    }

    /// Number of orders currently resting in the book.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Builds a level-by-level view of both sides, best-first, from the
    /// authoritative FIFOs.
    pub fn snapshot(&self) -> DepthSnapshot {
        DepthSnapshot {
            bids: self.book.level_infos(Side::Buy),
            asks: self.book.level_infos(Side::Sell),
        }
    }

    /// Ids of every resting GoodForDay order, for the daily sweep.
    pub fn good_for_day_ids(&self) -> OrderIds {
        self.orders
            .iter()
            .filter(|(_, handle)| self.book.order(**handle).order_type() == OrderType::GoodForDay)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Read access to the book container, mainly for tests and benches.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Read access to the level metadata, mainly for tests and benches.
    pub fn depth(&self) -> &DepthTracker {
        &self.depth
    }

    /// True iff an order on `side` limited at `price` crosses the best
    /// opposite resting price.
    fn can_match(&self, side: Side, price: Price) -> bool {
        match self.book.best_price(side.opposite()) {
            Some(best) => match side {
                Side::Buy => price >= best,
                Side::Sell => price <= best,
            },
            None => false,
        }
    }

    /// True iff the opposite levels crossing `price` hold at least
    /// `quantity` units, judged from the level metadata.
    fn can_fully_fill(&self, side: Side, price: Price, quantity: Quantity) -> bool {
        let Some(best) = self.book.best_price(side.opposite()) else {
            return false;
        };
        self.depth.can_cover(side, best, price, quantity)
    }

    /// The crossing loop. While the best bid reaches the best ask, fills the
    /// two head orders against each other at min remaining quantity, emits a
    /// trade per fill, and removes filled orders and emptied levels. Each
    /// trade half carries the price of the order on its own side, so the
    /// maker's price is honored when the aggressor's limit is inside it.
    ///
    /// Afterwards, a FillAndKill left at the top of either side is
    /// cancelled: it matched what it could and must not rest.
    fn match_orders(&mut self) -> Trades {
        let mut trades = Trades::with_capacity(self.orders.len());

        loop {
            let (Some(bid_price), Some(ask_price)) = (
                self.book.best_price(Side::Buy),
                self.book.best_price(Side::Sell),
            ) else {
                break;
            };
            if bid_price < ask_price {
                break;
            }

            let (Some(bid_handle), Some(ask_handle)) =
                (self.book.front(Side::Buy), self.book.front(Side::Sell))
            else {
                break;
            };

            let quantity = Quantity::min(
                self.book.order(bid_handle).remaining_quantity(),
                self.book.order(ask_handle).remaining_quantity(),
            );
            self.book.order_mut(bid_handle).fill(quantity);
            self.book.order_mut(ask_handle).fill(quantity);

            let (bid_id, bid_filled) = {
                let bid = self.book.order(bid_handle);
                (bid.id(), bid.is_filled())
            };
            let (ask_id, ask_filled) = {
                let ask = self.book.order(ask_handle);
                (ask.id(), ask.is_filled())
            };

            self.depth.on_order_matched(bid_price, quantity, bid_filled);
            self.depth.on_order_matched(ask_price, quantity, ask_filled);

            trace!(
                "matched bid {} and ask {} for {} ({} vs {})",
                bid_id,
                ask_id,
                quantity,
                bid_price,
                ask_price
            );
            trades.push(Trade::new(
                TradeInfo {
                    order_id: bid_id,
                    price: bid_price,
                    quantity,
                },
                TradeInfo {
                    order_id: ask_id,
                    price: ask_price,
                    quantity,
                },
            ));

            if bid_filled {
                self.book.remove(bid_handle);
                self.orders.remove(&bid_id);
            }
            if ask_filled {
                self.book.remove(ask_handle);
                self.orders.remove(&ask_id);
            }
        }

        // A partially filled FillAndKill may be left at the top of its side;
        // it must not rest.
        for side in [Side::Buy, Side::Sell] {
            if let Some(handle) = self.book.front(side) {
                let order = self.book.order(handle);
                if order.order_type() == OrderType::FillAndKill {
                    let id = order.id();
                    self.cancel_order(id);
                }
            }
        }

        trades
    }
}

/// Thread-safe matching engine. A single mutex serializes every operation,
/// so any number of submitter threads may call in concurrently; the trades
/// returned by one call are never interleaved with another caller's. A
/// background worker cancels GoodForDay orders at the configured daily
/// cutoff and is joined when the engine is dropped.
#[derive(Debug)]
pub struct SharedMatchingEngine {
    inner: Arc<Mutex<MatchingEngine>>,
    shutdown: Arc<ShutdownSignal>,
    worker: Option<JoinHandle<()>>,
}

impl SharedMatchingEngine {
    /// Creates an engine and launches its day-expiry worker.
    pub fn new(config: EngineConfig) -> Self {
        let inner = Arc::new(Mutex::new(MatchingEngine::new()));
        let shutdown = Arc::new(ShutdownSignal::new());
        let worker = expiry::spawn(
            Arc::clone(&inner),
            Arc::clone(&shutdown),
            config.expiry_cutoff,
        );
        info!(
            "matching engine started, good-for-day cutoff at {}",
            config.expiry_cutoff
        );
        Self {
            inner,
            shutdown,
            worker: Some(worker),
        }
    }

    /// See [`MatchingEngine::add_order`].
    pub fn add_order(&self, order: Order) -> Trades {
        self.inner.lock().add_order(order)
    }

    /// See [`MatchingEngine::cancel_order`].
    pub fn cancel_order(&self, id: OrderId) {
        self.inner.lock().cancel_order(id);
    }

    /// Cancels a batch of ids under a single lock acquisition.
    pub fn cancel_orders(&self, ids: &[OrderId]) {
        self.inner.lock().cancel_orders(ids);
    }

    /// See [`MatchingEngine::modify_order`].
    pub fn modify_order(&self, modify: OrderModify) -> Trades {
        self.inner.lock().modify_order(modify)
    }

    /// See [`MatchingEngine::order_count`].
    pub fn order_count(&self) -> usize {
        self.inner.lock().order_count()
    }

    /// See [`MatchingEngine::snapshot`]. Taken under the book lock, so the
    /// view is consistent: no partial updates are visible.
    pub fn snapshot(&self) -> DepthSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Default for SharedMatchingEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Drop for SharedMatchingEngine {
    /// Signals shutdown and joins the expiry worker before the book is torn
    /// down.
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("expiry worker panicked");
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                                | Description                                        |
// |-------------------------------------|----------------------------------------------------|
// | test_resting_order                  | GTC rests, cancel empties the book.                |
// | test_duplicate_id_rejected          | Second order with the same id is a no-op.          |
// | test_full_cross                     | Equal quantities trade out completely.             |
// | test_partial_cross                  | Smaller aggressor leaves the maker resting.        |
// | test_maker_price_honored            | Trade halves carry each order's own price.         |
// | test_time_priority                  | FIFO within a level: oldest order trades first.    |
// | test_fill_and_kill_*                | FAK admission and residual cleanup.                |
// | test_fill_or_kill_*                 | FOK depth pre-validation.                          |
// | test_market_order_*                 | Market conversion at worst opposite price.         |
// | test_modify_*                       | Cancel+add semantics of modification.              |
// | test_metadata_matches_snapshot      | Level metadata agrees with the FIFO rollup.        |
//--------------------------------------------------------------------------------------------------
