use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{orderbook::OrderBook, orders::Money};

/// One aggregated price level: the price and the total resting volume at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomLevel {
    pub price: Money,
    pub volume: Money,
}

/// Depth of Market: the aggregated, per-price-level view of an order book,
/// used by traders to read liquidity, support and resistance at a glance.
///
/// A [`Dom`] is a pure projection. It holds no state of its own between
/// refreshes and is never written to directly — all liquidity changes go
/// through [`OrderBook`] operations and show up in the *next* snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dom {
    /// Bid levels, best (highest price) first.
    pub bids: Vec<DomLevel>,
    /// Ask levels, best (lowest price) first.
    pub asks: Vec<DomLevel>,
}

impl Dom {
    /// Rebuilds the view by reading the book's current levels.
    pub fn from_book(book: &OrderBook) -> Self {
        Self {
            bids: book
                .bid_levels()
                .map(|l| DomLevel {
                    price: l.price(),
                    volume: l.total_volume(),
                })
                .collect(),
            asks: book
                .ask_levels()
                .map(|l| DomLevel {
                    price: l.price(),
                    volume: l.total_volume(),
                })
                .collect(),
        }
    }

    pub fn best_bid(&self) -> Option<DomLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<DomLevel> {
        self.asks.first().copied()
    }

    /// Midpoint of the best bid and ask, if both sides have liquidity.
    pub fn mid_price(&self) -> Option<Money> {
        let bid = self.best_bid()?.price;
        let ask = self.best_ask()?.price;
        Some((bid + ask) / Decimal::from(2))
    }
}
