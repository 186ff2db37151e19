use std::time::SystemTime;

use crate::{
    instrument::Pair,
    orderbook::Match,
    orders::{Money, OrderId},
};

/// A trade is the externally visible record of one match.
///
/// # Terminology
/// - **Maker**: The order that was already resting in the order book (providing liquidity).
/// - **Taker**: The incoming order that triggered the trade (taking liquidity).
///
/// The trade always executes at the **maker's price** (book price), and one
/// incoming order can produce several trades when it walks multiple resting
/// orders or price levels.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Trade {
    pub symbol: String,
    pub price: Money,
    pub size: Money,
    pub ask: OrderId,
    pub bid: OrderId,
    pub timestamp: SystemTime,
}

impl Trade {
    /// Stamps a match from the engine into a trade for the given market.
    pub fn from_match(symbol: &Pair, m: &Match) -> Self {
        Self {
            symbol: symbol.code(),
            price: m.price,
            size: m.size_filled,
            ask: m.ask,
            bid: m.bid,
            timestamp: SystemTime::now(),
        }
    }
}
