//! Interactive engine commands (`engine-cli interactive ...`) that drive an
//! `Engine` directly — no HTTP involved. Each invocation starts from a
//! fresh, empty engine: the engine carries no persisted state across
//! instantiations (§6 of the engine contract), so neither does this.

use clap::{Subcommand, builder::PossibleValuesParser};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::{Engine, Side};

#[derive(Subcommand)]
pub enum Action {
    /// Add a new order to the book
    Add {
        #[arg(value_parser = PossibleValuesParser::new(["buy", "sell"]))]
        side: String,
        #[arg(value_parser = PossibleValuesParser::new(["limit", "market"]))]
        order_type: String,
        /// Price (required for limit orders, ignored for market)
        price: Option<f64>,
        /// Quantity (must be > 0)
        quantity: f64,
    },
    /// Submit a market order against the book
    Match {
        #[arg(value_parser = PossibleValuesParser::new(["buy", "sell"]))]
        side: String,
        quantity: f64,
    },
    /// Cancel a resting order by id
    Cancel { order_id: u64 },
    /// Display the current order book
    Book,
}

fn parse_side(s: &str) -> Side {
    match s {
        "buy" => Side::Buy,
        "sell" => Side::Sell,
        _ => unreachable!("clap restricts values to buy/sell"),
    }
}

fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn print_trades_since(engine: &Engine, before: u64) {
    let (trades, _) = engine.trades_since(before);
    if trades.is_empty() {
        println!("no trades occurred.");
    } else {
        println!("trades generated:");
        for t in trades {
            println!("{t:?}");
        }
    }
}

fn print_book(engine: &mut Engine) {
    let (bids, asks) = engine.snapshot();
    println!("------ Order Book ------");
    println!("Bids (highest first):");
    for (price, qty) in &bids {
        println!("price: {price}, total qty: {qty}");
    }
    println!("Asks (lowest first):");
    for (price, qty) in &asks {
        println!("price: {price}, total qty: {qty}");
    }
    println!("--------------------------");
}

/// Runs one interactive command against a fresh engine instance.
pub fn dispatch(action: Action) {
    let mut engine = Engine::new();
    match action {
        Action::Add {
            side,
            order_type,
            price,
            quantity,
        } => {
            let side = parse_side(&side);
            let before = engine.last_trade_id();
            let submitted = match order_type.as_str() {
                "limit" => {
                    let Some(price) = price else {
                        println!("order rejected: limit orders require a price");
                        return;
                    };
                    engine.submit_limit(side, price, quantity, now_ts())
                }
                "market" => engine.submit_market(side, quantity, now_ts()),
                _ => unreachable!("clap restricts values to limit/market"),
            };
            match submitted {
                Ok(order_id) => {
                    println!("order accepted: id={order_id}");
                    print_trades_since(&engine, before);
                }
                Err(e) => println!("order rejected: {e}"),
            }
        }
        Action::Match { side, quantity } => {
            let side = parse_side(&side);
            let before = engine.last_trade_id();
            match engine.submit_market(side, quantity, now_ts()) {
                Ok(_) => print_trades_since(&engine, before),
                Err(e) => println!("order rejected: {e}"),
            }
        }
        Action::Cancel { order_id } => {
            if engine.cancel(order_id) {
                println!("order {order_id} cancelled");
            } else {
                println!("order {order_id} not found");
            }
        }
        Action::Book => print_book(&mut engine),
    }
}
