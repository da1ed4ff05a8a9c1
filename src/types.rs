//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core value types used throughout the matching engine:
// prices, quantities, orders, trades and aggregated level views.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ALIASES            | Integer tick aliases (Price, Quantity, OrderId).                 |
// | ENUMS              | Discrete sets of values (Side, OrderType).                       |
// | STRUCTS            | Orders, order modifications, trades and level snapshots.         |
// | ERRORS             | Construction-time validation errors.                             |
// | TESTS              | Unit tests for the defined types.                                |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Price in integer ticks. Always strictly positive for limit orders.
pub type Price = i64;

/// Order quantity in integer units.
pub type Quantity = u64;

/// Unique order identifier assigned by the submitter.
pub type OrderId = u64;

/// A batch of order identifiers, e.g. for bulk cancellation.
pub type OrderIds = Vec<OrderId>;

/// The ordered sequence of trades produced by one admission wave.
pub type Trades = Vec<Trade>;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------

/// Represents the side of an order (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// A buy order; rests on the bid side of the book.
    Buy,
    /// A sell order; rests on the ask side of the book.
    Sell,
}

impl Side {
    /// Returns the opposite side.
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Represents the type of an order, influencing its admission and lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Rests until matched or cancelled.
    GoodTillCancel,
    /// Rests like GoodTillCancel but is cancelled at the daily cutoff.
    GoodForDay,
    /// Matches as much as possible immediately; the remainder is cancelled.
    FillAndKill,
    /// Matches in full immediately or not at all.
    FillOrKill,
    /// No limit; converted to GoodTillCancel at the worst opposite resting
    /// price on admission. Never rests.
    Market,
}

//--------------------------------------------------------------------------------------------------
//  ERRORS
//--------------------------------------------------------------------------------------------------

/// Errors raised when constructing or converting order value types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// The limit price was zero or negative. Prices are integer ticks > 0.
    #[error("order price must be positive, got {0}")]
    InvalidPrice(Price),

    /// The quantity was zero. Orders must carry at least one unit.
    #[error("order quantity must be positive")]
    InvalidQuantity,

    /// A limit-price conversion was requested on a non-Market order.
    #[error("order {0} is not a market order")]
    NotAMarketOrder(OrderId),
}

/// Type alias for Result with OrderError.
pub type OrderResult<T> = Result<T, OrderError>;

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------

/// A trading order. Identity (`id`, `order_type`, `side`, `limit_price`,
/// `initial_quantity`) is fixed at construction; only `remaining_quantity`
/// changes as the order fills.
///
/// `limit_price` is `None` only for a Market order that has not yet been
/// converted; every resting order carries a price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    order_type: OrderType,
    side: Side,
    limit_price: Option<Price>,
    initial_quantity: Quantity,
    remaining_quantity: Quantity,
}

impl Order {
    /// Creates a limit order of the given type.
    ///
    /// # Errors
    /// `InvalidPrice` if `price <= 0`, `InvalidQuantity` if `quantity == 0`.
    pub fn new(
        order_type: OrderType,
        id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> OrderResult<Self> {
        if price <= 0 {
            return Err(OrderError::InvalidPrice(price));
        }
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }
        Ok(Self {
            id,
            order_type,
            side,
            limit_price: Some(price),
            initial_quantity: quantity,
            remaining_quantity: quantity,
        })
    }

    /// Creates a Market order. It has no limit price until the engine
    /// converts it at admission time.
    ///
    /// # Errors
    /// `InvalidQuantity` if `quantity == 0`.
    pub fn market(id: OrderId, side: Side, quantity: Quantity) -> OrderResult<Self> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }
        Ok(Self {
            id,
            order_type: OrderType::Market,
            side,
            limit_price: None,
            initial_quantity: quantity,
            remaining_quantity: quantity,
        })
    }

    #[inline]
    pub fn id(&self) -> OrderId {
        self.id
    }

    #[inline]
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// The limit price, or `None` for an unconverted Market order.
    #[inline]
    pub fn limit_price(&self) -> Option<Price> {
        self.limit_price
    }

    #[inline]
    pub fn initial_quantity(&self) -> Quantity {
        self.initial_quantity
    }

    #[inline]
    pub fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    #[inline]
    pub fn filled_quantity(&self) -> Quantity {
        self.initial_quantity - self.remaining_quantity
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Consumes `quantity` units of the remaining quantity.
    ///
    /// # Panics
    /// Panics if `quantity` exceeds the remaining quantity. Overfilling is an
    /// engine invariant violation, never a caller error, and must abort
    /// rather than clamp.
    pub fn fill(&mut self, quantity: Quantity) {
        assert!(
            quantity <= self.remaining_quantity,
            "order {}: fill of {} exceeds remaining {}",
            self.id,
            quantity,
            self.remaining_quantity
        );
        self.remaining_quantity -= quantity;
    }

    /// One-time conversion of a Market order to GoodTillCancel at the given
    /// limit price (the worst opposite resting price at admission time).
    ///
    /// # Errors
    /// `NotAMarketOrder` if the order is not a Market order.
    pub fn convert_to_good_till_cancel(&mut self, price: Price) -> OrderResult<()> {
        if self.order_type != OrderType::Market {
            return Err(OrderError::NotAMarketOrder(self.id));
        }
        self.order_type = OrderType::GoodTillCancel;
        self.limit_price = Some(price);
        Ok(())
    }
}

/// A requested modification of a resting order. Applied as cancel-then-add
/// under one lock acquisition, so the order loses time priority.
///
/// The `side` field is accepted for interface symmetry but ignored: the
/// resting order's side and type are authoritative, and only `price` and
/// `quantity` are taken from the modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderModify {
    id: OrderId,
    side: Side,
    price: Price,
    quantity: Quantity,
}

impl OrderModify {
    /// Creates an order modification.
    ///
    /// # Errors
    /// `InvalidPrice` if `price <= 0`, `InvalidQuantity` if `quantity == 0`.
    pub fn new(id: OrderId, side: Side, price: Price, quantity: Quantity) -> OrderResult<Self> {
        if price <= 0 {
            return Err(OrderError::InvalidPrice(price));
        }
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }
        Ok(Self {
            id,
            side,
            price,
            quantity,
        })
    }

    #[inline]
    pub fn id(&self) -> OrderId {
        self.id
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn price(&self) -> Price {
        self.price
    }

    #[inline]
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Builds the replacement order, carrying over the side and type of the
    /// order being replaced. Price and quantity were validated when the
    /// modify was constructed.
    pub(crate) fn to_order(self, side: Side, order_type: OrderType) -> Order {
        Order {
            id: self.id,
            order_type,
            side,
            limit_price: Some(self.price),
            initial_quantity: self.quantity,
            remaining_quantity: self.quantity,
        }
    }
}

/// One side of a matching event: the order that traded, the price it traded
/// at (its own limit price) and the quantity exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeInfo {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

/// A single matching event between one bid and one ask at one quantity.
///
/// The two `TradeInfo` prices may differ when the aggressor's limit is
/// strictly inside the opposite best; the maker's price is honored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier for the trade.
    pub id: Uuid,
    /// The bid-side half of the match.
    pub bid: TradeInfo,
    /// The ask-side half of the match.
    pub ask: TradeInfo,
    /// Timestamp when the trade was produced.
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Creates a trade from its two halves. The quantities must agree.
    pub fn new(bid: TradeInfo, ask: TradeInfo) -> Self {
        debug_assert_eq!(bid.quantity, ask.quantity);
        Self {
            id: Uuid::new_v4(),
            bid,
            ask,
            executed_at: Utc::now(),
        }
    }

    /// Quantity exchanged in this trade.
    #[inline]
    pub fn quantity(&self) -> Quantity {
        self.bid.quantity
    }
}

/// Aggregated view of one price level: the price and the summed remaining
/// quantity of every order resting there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub price: Price,
    pub quantity: Quantity,
}

/// An immutable, read-consistent view of the book's levels, best-first per
/// side. Built from the authoritative FIFOs, not the level metadata, so it
/// doubles as a cross-check in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// Bid levels ordered by price descending (best first).
    pub bids: Vec<LevelInfo>,
    /// Ask levels ordered by price ascending (best first).
    pub asks: Vec<LevelInfo>,
}

impl DepthSnapshot {
    /// Returns the best bid price if available.
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    /// Returns the best ask price if available.
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }

    /// Returns the current spread (best ask - best bid).
    #[inline]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                           | Description                                      |
// |--------------------------------|--------------------------------------------------|
// | test_order_construction        | Valid and invalid Order construction.            |
// | test_order_fill                | Partial and full fills, filled accounting.       |
// | test_fill_beyond_remaining     | Overfill aborts.                                 |
// | test_market_conversion         | Market -> GoodTillCancel, and misuse.            |
// | test_order_modify              | OrderModify validation and replacement order.    |
// | test_trade_accessors           | Trade quantity and info pair.                    |
// | test_depth_snapshot            | best_bid/best_ask/spread helpers.                |
//--------------------------------------------------------------------------------------------------
