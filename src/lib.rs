// Expose the modules
pub mod config;
pub mod depth;
mod expiry;
pub mod matching_engine;
pub mod orderbook;
pub mod types;

// Re-export key types for easier usage
pub use config::EngineConfig;
pub use matching_engine::{MatchingEngine, SharedMatchingEngine};
pub use orderbook::OrderBook;
pub use types::{
    DepthSnapshot, LevelInfo, Order, OrderError, OrderId, OrderIds, OrderModify, OrderType, Price,
    Quantity, Side, Trade, TradeInfo, Trades,
};
