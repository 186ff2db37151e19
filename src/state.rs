use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::{
    api::WsFrame, errors::OrderBookError, instrument::Pair, orderbook::OrderBook, trade::Trade,
};

/// Everything one market owns: its book behind a single-writer lock, and
/// the broadcast feed pushing snapshots and trades to ws subscribers.
pub struct MarketState {
    pub book: Mutex<OrderBook>,
    pub feed: broadcast::Sender<WsFrame>,
}

#[derive(Clone)]
pub struct AppState {
    markets: Arc<HashMap<Pair, MarketState>>,
    pub trade_log: Arc<Mutex<Vec<Trade>>>,
}

impl AppState {
    /// One book per supported pair, created up front. There is no implicit
    /// default book: asking for anything else is `UnknownMarket`.
    pub fn new() -> Self {
        let markets = Pair::supported()
            .iter()
            .map(|pair| {
                let (feed, _) = broadcast::channel(64);
                (
                    *pair,
                    MarketState {
                        book: Mutex::new(OrderBook::new()),
                        feed,
                    },
                )
            })
            .collect();

        Self {
            markets: Arc::new(markets),
            trade_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn market(&self, pair: &Pair) -> Result<&MarketState, OrderBookError> {
        self.markets
            .get(pair)
            .ok_or_else(|| OrderBookError::UnknownMarket(pair.code()))
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}
