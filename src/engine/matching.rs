//! The matching algorithm: a pure function over the book plus one incoming
//! order. Produces fills (maker id, execution price, quantity) in the order
//! they are generated — best opposing price first, FIFO within a level —
//! and leaves the book and the incoming order's status consistent with
//! §4.2 of the engine contract.

use super::book::OrderBook;
use super::order::{Order, OrderKind, OrderStatus, Side};

/// Below this remaining quantity an order is treated as fully consumed.
/// The only place in the engine where float equality is approximate —
/// every price comparison elsewhere is exact.
pub const EPSILON: f64 = 1e-9;

/// One execution produced while matching. The caller (the engine facade)
/// turns these into [`super::trade::Trade`]s once it has assigned ids.
#[derive(Debug, Clone, Copy)]
pub struct Fill {
    pub maker_id: u64,
    pub price: f64,
    pub quantity: f64,
}

/// Is a resting order at `maker_price` eligible to trade against an
/// aggressor on `aggressor_side` limited at `aggressor_price` (`None` for a
/// market aggressor, which accepts any price)?
fn eligible(aggressor_side: Side, aggressor_price: Option<f64>, maker_price: f64) -> bool {
    match (aggressor_side, aggressor_price) {
        (Side::Buy, Some(limit)) => maker_price <= limit,
        (Side::Sell, Some(limit)) => maker_price >= limit,
        (_, None) => true,
    }
}

/// Matches `incoming` against the book, mutating both. Returns the fills
/// generated, in generation order. On return, `incoming.status` and
/// `incoming.remaining` are final, and — for a limit order with remaining
/// quantity — the residual has already been inserted as a new resting
/// order by this function.
pub fn match_incoming(book: &mut OrderBook, incoming: &mut Order) -> Vec<Fill> {
    let opposite = incoming.side.opposite();
    let mut fills = Vec::new();

    while incoming.remaining > EPSILON {
        let Some((price, key, level)) = book.best_mut(opposite) else {
            break;
        };
        if !eligible(incoming.side, incoming.price, price) {
            break;
        }

        // `level` borrows `book` mutably, so any book-level bookkeeping
        // (forgetting filled ids, pruning) has to wait until it's dropped.
        let mut filled_ids = Vec::new();
        while incoming.remaining > EPSILON {
            let Some(maker) = level.front_mut() else {
                break;
            };
            let trade_qty = incoming.remaining.min(maker.remaining);

            incoming.remaining -= trade_qty;
            maker.remaining -= trade_qty;
            let maker_id = maker.id;
            let maker_fully_filled = maker.remaining <= EPSILON;
            if maker_fully_filled {
                maker.status = OrderStatus::Filled;
                maker.remaining = 0.0;
            } else {
                maker.status = OrderStatus::PartiallyFilled;
            }
            level.mark_dirty();

            fills.push(Fill {
                maker_id,
                price,
                quantity: trade_qty,
            });

            if maker_fully_filled {
                level.pop_front();
                filled_ids.push(maker_id);
            }
        }

        for id in filled_ids {
            book.forget_id(id);
        }
        book.prune_if_empty(opposite, key);
        // Loop back to the top: if this level is gone, `best_mut` finds
        // whatever is now best, or ends the loop if the side is empty.
    }

    finalize_incoming(book, incoming, !fills.is_empty());
    fills
}

/// Applies the residual policy once matching against the opposite side has
/// stopped: a limit order with remaining quantity rests; a market order's
/// remainder is discarded (documented unfillable).
fn finalize_incoming(book: &mut OrderBook, incoming: &mut Order, any_fill: bool) {
    if incoming.remaining <= EPSILON {
        incoming.remaining = 0.0;
        incoming.status = OrderStatus::Filled;
        return;
    }

    match incoming.kind {
        OrderKind::Limit => {
            incoming.status = if any_fill {
                OrderStatus::PartiallyFilled
            } else {
                OrderStatus::New
            };
            book.insert(incoming.clone());
        }
        OrderKind::Market => {
            incoming.status = OrderStatus::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::order::Order;

    fn limit(id: u64, side: Side, price: f64, qty: f64) -> Order {
        Order::new_limit(id, side, price, qty, id)
    }

    fn market(id: u64, side: Side, qty: f64) -> Order {
        Order::new_market(id, side, qty, id)
    }

    // S1 — exact crossing limit.
    #[test]
    fn exact_crossing_limit() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 100.0, 1.0));
        let mut buy = limit(2, Side::Buy, 100.0, 1.0);
        let fills = match_incoming(&mut book, &mut buy);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 100.0);
        assert_eq!(fills[0].quantity, 1.0);
        assert!(book.is_side_empty(Side::Buy));
        assert!(book.is_side_empty(Side::Sell));
        assert_eq!(buy.status, OrderStatus::Filled);
    }

    // S2 — partial fill, aggressor rests.
    #[test]
    fn partial_fill_aggressor_rests() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 101.0, 0.4));
        let mut buy = limit(2, Side::Buy, 102.0, 1.0);
        let fills = match_incoming(&mut book, &mut buy);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 101.0);
        assert_eq!(fills[0].quantity, 0.4);
        assert!(book.is_side_empty(Side::Sell));
        let (price, level) = book.best(Side::Buy).unwrap();
        assert_eq!(price, 102.0);
        assert_eq!(level.iter().next().unwrap().remaining, 0.6);
    }

    // S3 — walk the book.
    #[test]
    fn walk_the_book() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 100.0, 1.0));
        book.insert(limit(2, Side::Sell, 101.0, 1.0));
        book.insert(limit(3, Side::Sell, 102.0, 1.0));
        let mut buy = limit(4, Side::Buy, 101.0, 1.7);
        let fills = match_incoming(&mut book, &mut buy);
        assert_eq!(fills.len(), 2);
        assert_eq!((fills[0].price, fills[0].quantity, fills[0].maker_id), (100.0, 1.0, 1));
        assert_eq!((fills[1].price, fills[1].quantity, fills[1].maker_id), (101.0, 0.7, 2));
        assert!(book.is_side_empty(Side::Buy));
        let (ask_price, ask_level) = book.best(Side::Sell).unwrap();
        assert_eq!(ask_price, 101.0);
        assert_eq!(ask_level.iter().next().unwrap().remaining, 0.3);
    }

    // S4 — price-time priority within a level.
    #[test]
    fn price_time_priority_within_level() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 100.0, 1.0));
        book.insert(limit(2, Side::Sell, 100.0, 1.0));
        let mut buy = limit(3, Side::Buy, 100.0, 1.0);
        let fills = match_incoming(&mut book, &mut buy);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].maker_id, 1);
        let (_, level) = book.best(Side::Sell).unwrap();
        assert_eq!(level.iter().next().unwrap().id, 2);
    }

    // S5 — market order exhausts opposite side, residual discarded.
    #[test]
    fn market_order_residual_discarded() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 100.0, 0.5));
        let mut buy = market(2, Side::Buy, 1.0);
        let fills = match_incoming(&mut book, &mut buy);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].quantity, 0.5);
        assert!(book.is_side_empty(Side::Sell));
        assert!(book.is_side_empty(Side::Buy));
        assert_eq!(buy.status, OrderStatus::Cancelled);
    }

    #[test]
    fn market_order_fully_filled_is_filled_not_cancelled() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 100.0, 1.0));
        let mut buy = market(2, Side::Buy, 1.0);
        let fills = match_incoming(&mut book, &mut buy);
        assert_eq!(fills.len(), 1);
        assert_eq!(buy.status, OrderStatus::Filled);
    }

    #[test]
    fn market_order_no_liquidity_is_cancelled() {
        let mut book = OrderBook::new();
        let mut buy = market(1, Side::Buy, 10.0);
        let fills = match_incoming(&mut book, &mut buy);
        assert!(fills.is_empty());
        assert_eq!(buy.status, OrderStatus::Cancelled);
    }

    #[test]
    fn non_crossing_limit_rests_untouched() {
        let mut book = OrderBook::new();
        let mut buy = limit(1, Side::Buy, 90.0, 8.0);
        let fills = match_incoming(&mut book, &mut buy);
        assert!(fills.is_empty());
        assert_eq!(buy.status, OrderStatus::New);
        let (price, level) = book.best(Side::Buy).unwrap();
        assert_eq!(price, 90.0);
        assert_eq!(level.iter().next().unwrap().remaining, 8.0);
    }
}
