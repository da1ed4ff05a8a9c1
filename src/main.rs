use matchbook::{EngineConfig, Order, OrderModify, OrderType, SharedMatchingEngine, Side};

fn print_trades(label: &str, trades: &[matchbook::Trade]) {
    for trade in trades {
        println!(
            "[{}] trade: bid #{} @ {} / ask #{} @ {} for {}",
            label, trade.bid.order_id, trade.bid.price, trade.ask.order_id, trade.ask.price,
            trade.quantity()
        );
    }
}

fn main() {
    // Initialize tracing (for logging)
    tracing_subscriber::fmt::init();

    println!("Starting matching engine example");

    let engine = SharedMatchingEngine::new(EngineConfig::from_env());

    // Rest some liquidity on both sides
    let orders = [
        Order::new(OrderType::GoodTillCancel, 1, Side::Sell, 101, 5).expect("valid order"),
        Order::new(OrderType::GoodTillCancel, 2, Side::Sell, 102, 7).expect("valid order"),
        Order::new(OrderType::GoodForDay, 3, Side::Buy, 99, 10).expect("valid order"),
    ];
    for order in orders {
        let trades = engine.add_order(order);
        assert!(trades.is_empty());
    }
    println!("Resting orders: {}", engine.order_count());

    // An aggressive bid crosses the best ask
    let buy = Order::new(OrderType::GoodTillCancel, 4, Side::Buy, 101, 3).expect("valid order");
    print_trades("limit", &engine.add_order(buy));

    // A market sell converts at the worst resting bid and matches
    let market = Order::market(5, Side::Sell, 4).expect("valid order");
    print_trades("market", &engine.add_order(market));

    // Re-price the remaining ask down onto the bid
    let modify = OrderModify::new(1, Side::Sell, 99, 2).expect("valid modify");
    print_trades("modify", &engine.modify_order(modify));

    let depth = engine.snapshot();
    println!("\nCurrent depth:");
    println!("Best bid: {:?}", depth.best_bid());
    println!("Best ask: {:?}", depth.best_ask());
    println!("Spread: {:?}", depth.spread());
    for level in &depth.bids {
        println!("  bid {} x {}", level.price, level.quantity);
    }
    for level in &depth.asks {
        println!("  ask {} x {}", level.price, level.quantity);
    }

    println!("\nResting orders at exit: {}", engine.order_count());
}
