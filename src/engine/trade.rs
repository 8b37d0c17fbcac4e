//! Trade records emitted by the matcher.

use serde::{Deserialize, Serialize};

/// An immutable execution. Once appended to the engine's trade log, a trade
/// is never mutated or removed.
///
/// `price` is always the maker's (resting order's) limit price, never the
/// aggressor's — this is the source of the aggressor's price improvement.
/// `timestamp` is the aggressor's timestamp, i.e. the time of the call that
/// produced the trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub buy_order_id: u64,
    pub sell_order_id: u64,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: u64,
}
