//! Order types shared by the book, the matcher and the engine facade.

use serde::{Deserialize, Serialize};

/// Which side of the book an order rests on or crosses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an aggressor of `self` matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Limit orders may rest in the book; market orders never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Limit,
    Market,
}

/// Lifecycle state of an order. `Filled` iff `remaining == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
}

/// A resting or in-flight order.
///
/// `price` is `Some` only for `OrderKind::Limit`. `remaining` is decremented
/// by the matcher and by nothing else; `original` never changes after
/// submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Option<f64>,
    pub original: f64,
    pub remaining: f64,
    pub timestamp: u64,
    pub status: OrderStatus,
}

impl Order {
    pub(crate) fn new_limit(id: u64, side: Side, price: f64, qty: f64, timestamp: u64) -> Self {
        Order {
            id,
            side,
            kind: OrderKind::Limit,
            price: Some(price),
            original: qty,
            remaining: qty,
            timestamp,
            status: OrderStatus::New,
        }
    }

    pub(crate) fn new_market(id: u64, side: Side, qty: f64, timestamp: u64) -> Self {
        Order {
            id,
            side,
            kind: OrderKind::Market,
            price: None,
            original: qty,
            remaining: qty,
            timestamp,
            status: OrderStatus::New,
        }
    }
}
