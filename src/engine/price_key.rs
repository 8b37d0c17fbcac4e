//! Total-ordered integer surrogate for `f64` prices.
//!
//! The book keys its `BTreeMap`s by this surrogate rather than by raw `f64`
//! so that sorting is a plain integer compare in the hot matching loop — no
//! `PartialOrd` branching, no NaN handling at lookup time. Bids are keyed by
//! the *negated* surrogate so that the map's natural ascending order puts the
//! best bid (highest price) first; asks use the surrogate directly so the
//! best ask (lowest price) is naturally first.
//!
//! Derivation: IEEE-754 doubles already sort correctly as integers once the
//! sign bit is folded in — flip all bits for negatives, flip only the sign
//! bit for non-negatives. Prices are validated positive before they ever
//! reach this function, but the mapping is total for any finite `f64` so it
//! never panics or loses ordering on input we didn't expect.

pub type PriceKey = i64;

pub fn price_to_key(price: f64) -> PriceKey {
    let bits = price.to_bits() as i64;
    if bits < 0 {
        !bits
    } else {
        bits | i64::MIN
    }
}

pub fn key_to_price(key: PriceKey) -> f64 {
    let bits = if key < 0 { !key } else { key & i64::MAX } as u64;
    f64::from_bits(bits)
}

/// Key used for the bid side: sorting ascending by `bid_key` yields prices in
/// descending order, so the map's first entry is always the best bid.
pub fn bid_key(price: f64) -> PriceKey {
    -price_to_key(price)
}

pub fn price_from_bid_key(key: PriceKey) -> f64 {
    key_to_price(-key)
}
