//! The resting order book: two price-sorted sides plus an id index.
//!
//! Exposes the five operations named in §4.1: `insert`, `remove`, `best`,
//! `iterate_levels` and `snapshot`. `best` is the `from_best = true` head of
//! `iterate_levels`; the matcher walks the book through its own
//! `best_mut`/`prune_if_empty` pair instead (mutable access to the level
//! being drained doesn't fit `iterate_levels`'s shared-reference contract).

use std::collections::{BTreeMap, HashMap};

use super::order::{Order, Side};
use super::price_key::{PriceKey, bid_key, key_to_price, price_from_bid_key, price_to_key};
use super::price_level::PriceLevel;

/// Buy and sell resting orders, each side keyed so that the map's first
/// entry (ascending iteration) is always the best price for that side: bids
/// are keyed by a negated surrogate (best bid = highest price = smallest
/// key), asks by the surrogate directly (best ask = lowest price = smallest
/// key). See [`crate::engine::price_key`].
pub struct OrderBook {
    bids: BTreeMap<PriceKey, PriceLevel>,
    asks: BTreeMap<PriceKey, PriceLevel>,
    /// order id -> (side, price key), for O(1) cancel lookup.
    index: HashMap<u64, (Side, PriceKey)>,
}

impl OrderBook {
    pub fn new() -> Self {
        OrderBook {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_capacity_hint(hint: usize) -> Self {
        OrderBook {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::with_capacity(hint),
        }
    }

    fn side_map(&self, side: Side) -> &BTreeMap<PriceKey, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<PriceKey, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn key_for(side: Side, price: f64) -> PriceKey {
        match side {
            Side::Buy => bid_key(price),
            Side::Sell => price_to_key(price),
        }
    }

    fn price_for(side: Side, key: PriceKey) -> f64 {
        match side {
            Side::Buy => price_from_bid_key(key),
            Side::Sell => key_to_price(key),
        }
    }

    /// Inserts a resting (limit) order into its side/price level, creating
    /// the level if this is the first order at that price.
    pub fn insert(&mut self, order: Order) {
        let side = order.side;
        let price = order
            .price
            .expect("only limit orders rest in the book; the matcher never inserts a market order");
        let key = Self::key_for(side, price);
        let id = order.id;
        self.index.insert(id, (side, key));
        self.side_map_mut(side)
            .entry(key)
            .or_insert_with(PriceLevel::new)
            .push_back(order);
    }

    /// Removes a resting order by id. Returns `None` if the id is unknown or
    /// has already departed the book (filled, cancelled, or never rested).
    pub fn remove(&mut self, order_id: u64) -> Option<Order> {
        let (side, key) = self.index.remove(&order_id)?;
        let map = self.side_map_mut(side);
        let level = map.get_mut(&key)?;
        let removed = level.remove(order_id);
        if level.is_empty() {
            map.remove(&key);
        }
        removed
    }

    /// Best (price, level) pair for `side`, or `None` if that side is empty.
    pub fn best(&self, side: Side) -> Option<(f64, &PriceLevel)> {
        self.iterate_levels(side, true).next()
    }

    /// Lazy traversal of `side`'s resting price levels. When `from_best` is
    /// `true`, yields strictly descending price for BUY and strictly
    /// ascending price for SELL — the best level first, per the ordering
    /// contract in §4.1. When `false`, walks the other direction (worst
    /// price first), e.g. for rendering a depth ladder outward from the
    /// spread inward.
    pub fn iterate_levels(
        &self,
        side: Side,
        from_best: bool,
    ) -> Box<dyn Iterator<Item = (f64, &PriceLevel)> + '_> {
        let map = self.side_map(side);
        if from_best {
            Box::new(map.iter().map(move |(&k, level)| (Self::price_for(side, k), level)))
        } else {
            Box::new(map.iter().rev().map(move |(&k, level)| (Self::price_for(side, k), level)))
        }
    }

    /// Mutable access to the current best level on `side`, along with its
    /// price and key, for the matcher's use. Used only by
    /// [`super::matching`]; levels are never left empty in the map, so this
    /// always reflects the true best price.
    pub(crate) fn best_mut(&mut self, side: Side) -> Option<(f64, PriceKey, &mut PriceLevel)> {
        let key = *self.side_map(side).keys().next()?;
        let price = Self::price_for(side, key);
        let level = self.side_map_mut(side).get_mut(&key)?;
        Some((price, key, level))
    }

    /// Drops the price level at `key` on `side` if it has become empty.
    pub(crate) fn prune_if_empty(&mut self, side: Side, key: PriceKey) {
        let map = self.side_map_mut(side);
        if map.get(&key).is_some_and(PriceLevel::is_empty) {
            map.remove(&key);
        }
    }

    /// Removes `id` from the cancellation index without touching the level
    /// it lived in. Called after the matcher pops a fully-filled maker off
    /// its level's front directly.
    pub(crate) fn forget_id(&mut self, id: u64) {
        self.index.remove(&id);
    }

    pub fn contains(&self, order_id: u64) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Aggregated (price, total remaining quantity) pairs, best price first.
    pub fn snapshot(&mut self) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
        let bids = Self::aggregate(&mut self.bids, Side::Buy);
        let asks = Self::aggregate(&mut self.asks, Side::Sell);
        (bids, asks)
    }

    fn aggregate(map: &mut BTreeMap<PriceKey, PriceLevel>, side: Side) -> Vec<(f64, f64)> {
        map.iter_mut()
            .map(|(&k, level)| (Self::price_for(side, k), level.total_remaining()))
            .collect()
    }

    pub fn is_side_empty(&self, side: Side) -> bool {
        self.side_map(side).is_empty()
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(id: u64, side: Side, price: f64, qty: f64) -> Order {
        Order::new_limit(id, side, price, qty, 0)
    }

    #[test]
    fn best_bid_is_highest_price() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Buy, 99.0, 1.0));
        book.insert(limit(2, Side::Buy, 101.0, 1.0));
        book.insert(limit(3, Side::Buy, 100.0, 1.0));
        let (price, _) = book.best(Side::Buy).unwrap();
        assert_eq!(price, 101.0);
    }

    #[test]
    fn best_ask_is_lowest_price() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 105.0, 1.0));
        book.insert(limit(2, Side::Sell, 101.0, 1.0));
        book.insert(limit(3, Side::Sell, 103.0, 1.0));
        let (price, _) = book.best(Side::Sell).unwrap();
        assert_eq!(price, 101.0);
    }

    #[test]
    fn remove_prunes_empty_level() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Buy, 100.0, 1.0));
        assert!(book.remove(1).is_some());
        assert!(book.is_side_empty(Side::Buy));
        assert!(!book.contains(1));
    }

    #[test]
    fn remove_unknown_id_is_none() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Buy, 100.0, 1.0));
        assert!(book.remove(999).is_none());
    }

    #[test]
    fn snapshot_aggregates_per_level() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Buy, 100.0, 1.0));
        book.insert(limit(2, Side::Buy, 100.0, 2.0));
        book.insert(limit(3, Side::Sell, 101.0, 5.0));
        let (bids, asks) = book.snapshot();
        assert_eq!(bids, vec![(100.0, 3.0)]);
        assert_eq!(asks, vec![(101.0, 5.0)]);
    }

    #[test]
    fn iterate_levels_buy_side_is_strictly_descending_from_best() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Buy, 99.0, 1.0));
        book.insert(limit(2, Side::Buy, 101.0, 1.0));
        book.insert(limit(3, Side::Buy, 100.0, 1.0));
        let prices: Vec<f64> = book.iterate_levels(Side::Buy, true).map(|(p, _)| p).collect();
        assert_eq!(prices, vec![101.0, 100.0, 99.0]);
    }

    #[test]
    fn iterate_levels_sell_side_is_strictly_ascending_from_best() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 105.0, 1.0));
        book.insert(limit(2, Side::Sell, 101.0, 1.0));
        book.insert(limit(3, Side::Sell, 103.0, 1.0));
        let prices: Vec<f64> = book.iterate_levels(Side::Sell, true).map(|(p, _)| p).collect();
        assert_eq!(prices, vec![101.0, 103.0, 105.0]);
    }

    #[test]
    fn iterate_levels_from_best_false_walks_the_other_direction() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Buy, 99.0, 1.0));
        book.insert(limit(2, Side::Buy, 101.0, 1.0));
        book.insert(limit(3, Side::Buy, 100.0, 1.0));
        let prices: Vec<f64> = book.iterate_levels(Side::Buy, false).map(|(p, _)| p).collect();
        assert_eq!(prices, vec![99.0, 100.0, 101.0]);
    }

    #[test]
    fn best_matches_head_of_iterate_levels() {
        let mut book = OrderBook::new();
        book.insert(limit(1, Side::Sell, 105.0, 1.0));
        book.insert(limit(2, Side::Sell, 101.0, 1.0));
        let (best_price, _) = book.best(Side::Sell).unwrap();
        let (first_price, _) = book.iterate_levels(Side::Sell, true).next().unwrap();
        assert_eq!(best_price, first_price);
    }
}
