//! The engine facade: the only entry point callers use. Owns the id
//! counters and the trade log, validates input, and dispatches to the
//! matcher. Not re-entrant — see §5 of the engine contract.

use tracing::{info, warn};

use super::book::OrderBook;
use super::config::EngineConfig;
use super::errors::{EngineError, EngineResult};
use super::matching::{self, Fill};
use super::order::{Order, OrderStatus, Side};
use super::trade::Trade;

/// A single-instrument limit order book matching engine.
///
/// Every public method runs to completion synchronously: the book reflects
/// the new state, and any trades generated are appended to the log before
/// the call returns. An `Engine` is owned by exactly one caller at a time;
/// share it across threads behind your own mutual exclusion (e.g.
/// `Arc<Mutex<Engine>>`, as the HTTP layer in this crate does).
pub struct Engine {
    book: OrderBook,
    trade_log: Vec<Trade>,
    next_order_id: u64,
    next_trade_id: u64,
    fast_path: bool,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let book = if config.initial_capacity_hint > 0 {
            OrderBook::with_capacity_hint(config.initial_capacity_hint)
        } else {
            OrderBook::new()
        };
        Engine {
            book,
            trade_log: Vec::with_capacity(config.initial_capacity_hint),
            next_order_id: 1,
            next_trade_id: 1,
            fast_path: config.fast_path,
        }
    }

    fn validate_quantity(qty: f64) -> EngineResult<()> {
        if !qty.is_finite() || qty <= 0.0 {
            return Err(EngineError::InvalidOrder {
                reason: format!("quantity must be a finite positive number, got {qty}"),
            });
        }
        Ok(())
    }

    fn validate_price(price: f64) -> EngineResult<()> {
        if !price.is_finite() || price <= 0.0 {
            return Err(EngineError::InvalidOrder {
                reason: format!("price must be a finite positive number, got {price}"),
            });
        }
        Ok(())
    }

    /// Submits a limit order. Validates `price > 0` and `qty > 0` (both
    /// finite) before consuming an id or mutating any state.
    pub fn submit_limit(
        &mut self,
        side: Side,
        price: f64,
        qty: f64,
        timestamp: u64,
    ) -> EngineResult<u64> {
        Self::validate_price(price)?;
        Self::validate_quantity(qty)?;

        let id = self.next_order_id;
        let mut order = Order::new_limit(id, side, price, qty, timestamp);
        info!(order_id = id, ?side, price, qty, "submitting limit order");
        self.run_matcher(&mut order);
        self.next_order_id += 1;
        Ok(id)
    }

    /// Submits a market order. Validates `qty > 0` (finite) before consuming
    /// an id or mutating any state. Never rests; any unfilled remainder is
    /// discarded (§4.2).
    pub fn submit_market(&mut self, side: Side, qty: f64, timestamp: u64) -> EngineResult<u64> {
        Self::validate_quantity(qty)?;

        let id = self.next_order_id;
        let mut order = Order::new_market(id, side, qty, timestamp);
        info!(order_id = id, ?side, qty, "submitting market order");
        self.run_matcher(&mut order);
        self.next_order_id += 1;
        Ok(id)
    }

    fn run_matcher(&mut self, order: &mut Order) {
        let fills: Vec<Fill> = matching::match_incoming(&mut self.book, order);
        if fills.is_empty() {
            return;
        }
        for fill in fills {
            let (buy_order_id, sell_order_id) = match order.side {
                Side::Buy => (order.id, fill.maker_id),
                Side::Sell => (fill.maker_id, order.id),
            };
            let trade = Trade {
                id: self.next_trade_id,
                buy_order_id,
                sell_order_id,
                price: fill.price,
                quantity: fill.quantity,
                timestamp: order.timestamp,
            };
            self.next_trade_id += 1;
            warn!(trade_id = trade.id, price = trade.price, quantity = trade.quantity, "trade executed");
            self.trade_log.push(trade);
        }
    }

    /// Cancels a resting order. Returns `true` only if a live resting order
    /// was removed. Never fails: an unknown id, an already-filled order, an
    /// already-cancelled order, and a market order (which never rests) all
    /// return `false`. Idempotent: cancelling the same id twice in a row
    /// returns `false` on the second call.
    pub fn cancel(&mut self, order_id: u64) -> bool {
        match self.book.remove(order_id) {
            Some(mut order) => {
                order.status = OrderStatus::Cancelled;
                info!(order_id, "order cancelled");
                true
            }
            None => false,
        }
    }

    /// Returns trades strictly after `cursor` (a trade id; `0` reads from
    /// the start of the log) and the cursor to pass next to continue
    /// reading forward. The log is append-only, so a cursor is never
    /// invalidated by subsequent activity.
    pub fn trades_since(&self, cursor: u64) -> (Vec<Trade>, u64) {
        let start = self
            .trade_log
            .partition_point(|t| t.id <= cursor);
        let page = self.trade_log[start..].to_vec();
        let new_cursor = page.last().map(|t| t.id).unwrap_or(cursor);
        (page, new_cursor)
    }

    /// Aggregated (price, total remaining quantity) snapshot of both sides,
    /// best price first.
    pub fn snapshot(&mut self) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
        self.book.snapshot()
    }

    /// Whether an order id currently rests in the book.
    pub fn is_resting(&self, order_id: u64) -> bool {
        self.book.contains(order_id)
    }

    /// The id of the most recent trade, or `0` if none have been generated
    /// yet. Lets a collaborator capture "the cursor right before this call"
    /// without cloning the log, then read exactly the trades one submission
    /// produced via `trades_since`.
    pub fn last_trade_id(&self) -> u64 {
        self.trade_log.last().map(|t| t.id).unwrap_or(0)
    }

    pub fn fast_path_enabled(&self) -> bool {
        self.fast_path
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
