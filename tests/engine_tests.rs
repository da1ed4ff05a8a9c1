//--------------------------------------------------------------------------------------------------
// TEST MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Integration tests exercising the thread-safe engine through its public
// API: admission scenarios, snapshot consistency, concurrent submitters,
// and the good-for-day expiry worker.
//--------------------------------------------------------------------------------------------------

use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;

use matchbook::{
    EngineConfig, LevelInfo, Order, OrderId, OrderModify, OrderType, Price, Quantity,
    SharedMatchingEngine, Side, Trade,
};

fn gtc(id: OrderId, side: Side, price: Price, quantity: Quantity) -> Order {
    Order::new(OrderType::GoodTillCancel, id, side, price, quantity).expect("valid order")
}

fn order(
    order_type: OrderType,
    id: OrderId,
    side: Side,
    price: Price,
    quantity: Quantity,
) -> Order {
    Order::new(order_type, id, side, price, quantity).expect("valid order")
}

/// A cutoff a few hundred milliseconds from now, on today's date. Waits out
/// the rare case where that would roll over midnight.
fn near_future_cutoff() -> chrono::NaiveTime {
    loop {
        let now = Local::now();
        let target = now + chrono::Duration::milliseconds(300);
        if target.date_naive() == now.date_naive() {
            return target.time();
        }
        thread::sleep(Duration::from_millis(500));
    }
}

#[test]
fn test_rest_and_cancel() {
    let engine = SharedMatchingEngine::default();

    let trades = engine.add_order(gtc(1, Side::Buy, 100, 10));
    assert!(trades.is_empty());
    assert_eq!(engine.order_count(), 1);

    engine.cancel_order(1);
    assert_eq!(engine.order_count(), 0);
    let snapshot = engine.snapshot();
    assert!(snapshot.bids.is_empty());
    assert!(snapshot.asks.is_empty());
}

#[test]
fn test_full_cross() {
    let engine = SharedMatchingEngine::default();
    engine.add_order(gtc(1, Side::Sell, 100, 5));
    let trades = engine.add_order(gtc(2, Side::Buy, 100, 5));

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].bid.order_id, 2);
    assert_eq!(trades[0].ask.order_id, 1);
    assert_eq!(trades[0].bid.price, 100);
    assert_eq!(trades[0].ask.price, 100);
    assert_eq!(trades[0].quantity(), 5);
    assert_eq!(engine.order_count(), 0);
}

#[test]
fn test_partial_cross_leaves_remainder_visible() {
    let engine = SharedMatchingEngine::default();
    engine.add_order(gtc(1, Side::Sell, 100, 10));
    let trades = engine.add_order(gtc(2, Side::Buy, 100, 4));

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].quantity(), 4);
    assert_eq!(engine.order_count(), 1);
    assert_eq!(
        engine.snapshot().asks,
        vec![LevelInfo {
            price: 100,
            quantity: 6
        }]
    );
}

#[test]
fn test_fill_and_kill_never_rests() {
    let engine = SharedMatchingEngine::default();
    engine.add_order(gtc(1, Side::Sell, 100, 3));

    let trades = engine.add_order(order(OrderType::FillAndKill, 2, Side::Buy, 100, 10));
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].quantity(), 3);
    assert_eq!(engine.order_count(), 0);
}

#[test]
fn test_fill_or_kill_depth_check() {
    let engine = SharedMatchingEngine::default();
    engine.add_order(gtc(1, Side::Sell, 100, 4));
    engine.add_order(gtc(2, Side::Sell, 101, 3));

    // 7 units within reach of the limit: 10 is rejected outright.
    let rejected = engine.add_order(order(OrderType::FillOrKill, 3, Side::Buy, 101, 10));
    assert!(rejected.is_empty());
    assert_eq!(engine.order_count(), 2);

    // 7 is filled across both levels.
    let accepted = engine.add_order(order(OrderType::FillOrKill, 4, Side::Buy, 101, 7));
    assert_eq!(accepted.len(), 2);
    assert_eq!(accepted.iter().map(Trade::quantity).sum::<Quantity>(), 7);
    assert_eq!(engine.order_count(), 0);
}

#[test]
fn test_time_priority_within_level() {
    let engine = SharedMatchingEngine::default();
    engine.add_order(gtc(1, Side::Buy, 100, 5));
    engine.add_order(gtc(2, Side::Buy, 100, 5));

    let trades = engine.add_order(gtc(3, Side::Sell, 100, 5));
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].bid.order_id, 1);
}

#[test]
fn test_modify_through_shared_engine() {
    let engine = SharedMatchingEngine::default();
    engine.add_order(gtc(1, Side::Sell, 102, 5));
    engine.add_order(gtc(2, Side::Buy, 100, 5));

    let trades = engine.modify_order(OrderModify::new(2, Side::Buy, 102, 5).expect("valid modify"));
    assert_eq!(trades.len(), 1);
    assert_eq!(engine.order_count(), 0);
}

#[test]
fn test_batch_cancel_under_one_lock() {
    let engine = SharedMatchingEngine::default();
    for id in 1..=6u64 {
        engine.add_order(gtc(id, Side::Buy, 90 + id as i64, 5));
    }

    engine.cancel_orders(&[1, 3, 5, 99]);
    assert_eq!(engine.order_count(), 3);
    let snapshot = engine.snapshot();
    let prices: Vec<Price> = snapshot.bids.iter().map(|l| l.price).collect();
    assert_eq!(prices, vec![96, 94, 92]);
}

#[test]
fn test_snapshot_orders_levels_best_first() {
    let engine = SharedMatchingEngine::default();
    engine.add_order(gtc(1, Side::Buy, 98, 1));
    engine.add_order(gtc(2, Side::Buy, 100, 2));
    engine.add_order(gtc(3, Side::Buy, 99, 3));
    engine.add_order(gtc(4, Side::Sell, 103, 4));
    engine.add_order(gtc(5, Side::Sell, 101, 5));

    let snapshot = engine.snapshot();
    let bid_prices: Vec<Price> = snapshot.bids.iter().map(|l| l.price).collect();
    let ask_prices: Vec<Price> = snapshot.asks.iter().map(|l| l.price).collect();
    assert_eq!(bid_prices, vec![100, 99, 98]);
    assert_eq!(ask_prices, vec![101, 103]);
    assert_eq!(snapshot.spread(), Some(1));
}

#[test]
fn test_concurrent_submitters_disjoint_books() {
    let engine = SharedMatchingEngine::default();
    let threads = 4u64;
    let per_thread = 50u64;

    thread::scope(|scope| {
        for t in 0..threads {
            let engine = &engine;
            scope.spawn(move || {
                for i in 0..per_thread {
                    let id = t * per_thread + i + 1;
                    // Bids far below the asks: nothing ever crosses.
                    let (side, price) = if t % 2 == 0 {
                        (Side::Buy, 50 - t as i64)
                    } else {
                        (Side::Sell, 200 + t as i64)
                    };
                    let trades = engine.add_order(gtc(id, side, price, 1));
                    assert!(trades.is_empty());
                }
            });
        }
    });

    assert_eq!(engine.order_count(), (threads * per_thread) as usize);
}

#[test]
fn test_concurrent_crossing_conserves_quantity() {
    let engine = SharedMatchingEngine::default();
    let per_side = 100u64;

    let (buy_traded, sell_traded) = thread::scope(|scope| {
        let buyer = scope.spawn(|| {
            let mut traded = 0u64;
            for i in 0..per_side {
                for trade in engine.add_order(gtc(1_000 + i, Side::Buy, 100, 1)) {
                    traded += trade.quantity();
                }
            }
            traded
        });
        let seller = scope.spawn(|| {
            let mut traded = 0u64;
            for i in 0..per_side {
                for trade in engine.add_order(gtc(2_000 + i, Side::Sell, 100, 1)) {
                    traded += trade.quantity();
                }
            }
            traded
        });
        (buyer.join().unwrap(), seller.join().unwrap())
    });

    // Equal one-lot flow at one price must fully pair off, whichever side
    // happened to be the aggressor for each trade.
    assert_eq!(buy_traded + sell_traded, per_side);
    assert_eq!(engine.order_count(), 0);
    let snapshot = engine.snapshot();
    assert!(snapshot.bids.is_empty());
    assert!(snapshot.asks.is_empty());
}

#[test]
fn test_drop_joins_expiry_worker() {
    let engine = SharedMatchingEngine::default();
    engine.add_order(gtc(1, Side::Buy, 100, 1));

    let started = Instant::now();
    drop(engine);
    // The worker must wake from its day-long wait and exit promptly.
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_good_for_day_orders_expire_at_cutoff() {
    let config = EngineConfig {
        expiry_cutoff: near_future_cutoff(),
    };
    let engine = SharedMatchingEngine::new(config);

    engine.add_order(order(OrderType::GoodForDay, 1, Side::Buy, 100, 5));
    engine.add_order(order(OrderType::GoodForDay, 2, Side::Sell, 110, 5));
    engine.add_order(gtc(3, Side::Buy, 99, 5));

    // Well past the cutoff plus its grace interval.
    thread::sleep(Duration::from_millis(1_800));

    assert_eq!(engine.order_count(), 1);
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.best_bid(), Some(99));
    assert!(snapshot.asks.is_empty());
}
