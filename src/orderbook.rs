use crate::{
    dom::Dom,
    errors::OrderBookError,
    orders::{Money, Order, OrderId, Side},
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

/// A single match between a resting order and the incoming order that
/// consumed it (fully or partially).
///
/// `price` is always the resting limit's price: the aggressor never gets
/// price improvement, the book price governs execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Id of the sell-side order involved in the match.
    pub ask: OrderId,
    /// Id of the buy-side order involved in the match.
    pub bid: OrderId,
    pub size_filled: Money,
    pub price: Money,
}

/// Core matching primitive: fills the overlap between two opposite-side
/// orders at the given level price.
///
/// `size_filled = min(resting.size, incoming.size)`; both sizes are
/// decremented by it, so at least one of the two orders ends at zero.
/// Sizes are never negative and the minimum is always defined, so this
/// cannot fail.
fn fill_order(resting: &mut Order, incoming: &mut Order, price: Money) -> Match {
    let (ask, bid) = match resting.side {
        Side::Buy => (incoming.id, resting.id),
        Side::Sell => (resting.id, incoming.id),
    };

    let size_filled = resting.size.min(incoming.size);
    resting.size -= size_filled;
    incoming.size -= size_filled;

    Match {
        ask,
        bid,
        size_filled,
        price,
    }
}

/// A [`Limit`] groups all resting orders at one price level.
///
/// Orders are kept in a FIFO [`VecDeque`], oldest first, which is exactly
/// the **time** half of price-time priority. `total_volume` is maintained
/// incrementally and always equals the sum of the queued orders' sizes.
#[derive(Debug)]
pub struct Limit {
    price: Money,
    orders: VecDeque<Order>,
    total_volume: Money,
}

impl Limit {
    fn new(price: Money) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_volume: Money::ZERO,
        }
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn total_volume(&self) -> Money {
        self.total_volume
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn contains(&self, id: OrderId) -> bool {
        self.orders.iter().any(|o| o.id == id)
    }

    /// Appends `order` at the back of the queue, preserving arrival order.
    fn add_order(&mut self, order: Order) {
        self.total_volume += order.size;
        self.orders.push_back(order);
    }

    /// Removes the order with `id` from the queue, keeping the remaining
    /// orders in arrival order (stable removal — a swap-with-last here
    /// would silently break time priority).
    fn delete_order(&mut self, id: OrderId) -> Option<Order> {
        let pos = self.orders.iter().position(|o| o.id == id)?;
        let order = self.orders.remove(pos)?;
        self.total_volume -= order.size;
        Some(order)
    }

    /// Walks the queue oldest-first, filling resting orders against
    /// `incoming` until the queue is exhausted or `incoming` is done.
    ///
    /// Orders drained to zero during the walk are collected and detached
    /// afterwards, not mid-iteration. Returns the matches in the order
    /// the fills occurred.
    fn fill(&mut self, incoming: &mut Order) -> Vec<Match> {
        let mut matches = Vec::new();
        let mut drained = Vec::new();

        for resting in self.orders.iter_mut() {
            if incoming.is_filled() {
                break;
            }

            let m = fill_order(resting, incoming, self.price);
            self.total_volume -= m.size_filled;

            if resting.is_filled() {
                drained.push(resting.id);
            }
            matches.push(m);
        }

        for id in drained {
            // drained orders have size zero, so this leaves total_volume alone
            self.delete_order(id);
        }

        matches
    }
}

/// An [`OrderBook`] stores **active** resting liquidity in two
/// [`BTreeMap`]s keyed by price:
/// - `bids` (buy orders) — iterated **in reverse** to find the highest bid first
/// - `asks` (sell orders) — iterated **forwards** to find the lowest ask first
///
/// The map key doubles as the price index (one [`Limit`] per price and
/// side, by construction) and its ordering is the sorted view matching
/// walks. `locations` maps each resting order id to the side and price it
/// rests at, so cancellation is a lookup instead of a book scan; an id
/// absent from it is not resting anywhere.
pub struct OrderBook {
    bids: BTreeMap<Money, Limit>,
    asks: BTreeMap<Money, Limit>,
    locations: HashMap<OrderId, (Side, Money)>,
}

impl OrderBook {
    /// Creates a new, empty [`OrderBook`], with no active bids or asks.
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            locations: HashMap::new(),
        }
    }

    /// Rests a **limit** order at `price` on the side matching its flag,
    /// creating the level if this is the first order at that price.
    ///
    /// Placement only ever adds liquidity: a crossing limit order is *not*
    /// matched against the opposite book, it rests like any other.
    pub fn place_limit_order(&mut self, price: Money, order: Order) {
        let id = order.id;
        let side = order.side;

        let book_side = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        book_side
            .entry(price)
            .or_insert_with(|| Limit::new(price))
            .add_order(order);
        self.locations.insert(id, (side, price));
    }

    /// Matches a **market** order against the opposite side's liquidity,
    /// best price first (lowest ask for a buy, highest bid for a sell).
    ///
    /// The aggregate opposite-side volume is checked up front: an order
    /// bigger than the whole book is rejected with
    /// [`OrderBookError::InsufficientLiquidity`] and the book is left
    /// untouched — no partial execution. Once matching starts it always
    /// completes. Price levels drained to empty are removed from their own
    /// side as they go.
    pub fn place_market_order(
        &mut self,
        order: &mut Order,
    ) -> Result<Vec<Match>, OrderBookError> {
        let available = match order.side {
            Side::Buy => self.total_ask_volume(),
            Side::Sell => self.total_bid_volume(),
        };
        if order.size > available {
            return Err(OrderBookError::InsufficientLiquidity {
                requested: order.size,
                available,
            });
        }

        debug!(id = order.id, side = ?order.side, size = %order.size, "matching market order");

        let mut matches = Vec::new();
        while !order.is_filled() {
            let opposite = match order.side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            let best = match order.side {
                Side::Buy => opposite.first_entry(),
                Side::Sell => opposite.last_entry(),
            };
            let Some(mut entry) = best else { break };

            let level_matches = entry.get_mut().fill(order);
            for m in &level_matches {
                let resting = if m.bid == order.id { m.ask } else { m.bid };
                if !entry.get().contains(resting) {
                    self.locations.remove(&resting);
                }
            }

            if entry.get().is_empty() {
                debug!(price = %entry.get().price(), "removing drained price level");
                entry.remove();
            }
            matches.extend(level_matches);
        }

        Ok(matches)
    }

    /// Cancels a resting order, removing its price level if it empties.
    ///
    /// Returns the removed order, or [`OrderBookError::OrderNotResting`]
    /// when the id has no live location in the book (never placed, already
    /// filled, or already canceled).
    pub fn cancel_order(&mut self, id: OrderId) -> Result<Order, OrderBookError> {
        let (side, price) = self
            .locations
            .remove(&id)
            .ok_or(OrderBookError::OrderNotResting(id))?;

        let book_side = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let Some(limit) = book_side.get_mut(&price) else {
            return Err(OrderBookError::OrderNotResting(id));
        };
        let order = limit
            .delete_order(id)
            .ok_or(OrderBookError::OrderNotResting(id))?;

        if limit.is_empty() {
            book_side.remove(&price);
        }
        Ok(order)
    }

    /// Sum of all bid levels' volumes. O(number of price levels).
    pub fn total_bid_volume(&self) -> Money {
        self.bids.values().map(Limit::total_volume).sum()
    }

    /// Sum of all ask levels' volumes. O(number of price levels).
    pub fn total_ask_volume(&self) -> Money {
        self.asks.values().map(Limit::total_volume).sum()
    }

    /// The limit at `price`, bids checked before asks. `None` is the miss.
    pub fn limit_at(&self, price: Money) -> Option<&Limit> {
        self.bids.get(&price).or_else(|| self.asks.get(&price))
    }

    /// Bid levels, best (highest price) first.
    pub fn bid_levels(&self) -> impl Iterator<Item = &Limit> {
        self.bids.values().rev()
    }

    /// Ask levels, best (lowest price) first.
    pub fn ask_levels(&self) -> impl Iterator<Item = &Limit> {
        self.asks.values()
    }

    /// Depth-of-market projection of the current levels, for display.
    pub fn snapshot_dom(&self) -> Dom {
        Dom::from_book(self)
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

//tests
#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn m(n: i64) -> Money {
        Decimal::from(n)
    }

    fn order(id: OrderId, side: Side, size: i64) -> Order {
        Order::new(id, side, m(size))
    }

    /// Level volume always equals the sum of its queued orders' sizes.
    fn assert_level_invariant(book: &OrderBook, price: Money) {
        if let Some(limit) = book.limit_at(price) {
            let sum: Money = limit.orders.iter().map(|o| o.size).sum();
            assert_eq!(limit.total_volume(), sum);
            assert!(limit.orders.iter().all(|o| !o.size.is_zero()));
        }
    }

    #[test]
    fn test_fill_order_conserves_volume() {
        let mut resting = order(1, Side::Buy, 100);
        let mut incoming = order(2, Side::Sell, 50);

        let matched = fill_order(&mut resting, &mut incoming, m(10_000));

        assert_eq!(matched.size_filled, m(50));
        assert_eq!(matched.price, m(10_000));
        assert_eq!(matched.bid, 1);
        assert_eq!(matched.ask, 2);
        assert_eq!(resting.size, m(50));
        assert!(incoming.is_filled());
    }

    #[test]
    fn test_fill_order_equal_sizes_drains_both() {
        let mut resting = order(1, Side::Sell, 7);
        let mut incoming = order(2, Side::Buy, 7);

        let matched = fill_order(&mut resting, &mut incoming, m(99));

        assert_eq!(matched.size_filled, m(7));
        assert!(resting.is_filled());
        assert!(incoming.is_filled());
    }

    #[test]
    fn test_place_limit_order_creates_level_and_tracks_volume() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(10_000), order(1, Side::Sell, 10));
        book.place_limit_order(m(10_000), order(2, Side::Sell, 9));
        book.place_limit_order(m(9_000), order(3, Side::Buy, 4));

        assert_eq!(book.total_ask_volume(), m(19));
        assert_eq!(book.total_bid_volume(), m(4));

        let level = book.limit_at(m(10_000)).unwrap();
        assert_eq!(level.len(), 2);
        assert_eq!(level.total_volume(), m(19));
        assert_level_invariant(&book, m(10_000));
    }

    #[test]
    fn test_limit_at_miss_returns_none() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(100), order(1, Side::Buy, 1));

        assert!(book.limit_at(m(100)).is_some());
        assert!(book.limit_at(m(101)).is_none());
    }

    /// Place ask 20 @ 10 000, then a market buy of 10: one match at the
    /// resting price, half the ask level left.
    #[test]
    fn test_market_buy_partially_fills_ask_level() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(10_000), order(1, Side::Sell, 20));

        let mut market_buy = order(2, Side::Buy, 10);
        let matches = book.place_market_order(&mut market_buy).unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].size_filled, m(10));
        assert_eq!(matches[0].price, m(10_000));
        assert_eq!(matches[0].ask, 1);
        assert_eq!(matches[0].bid, 2);
        assert!(market_buy.is_filled());

        assert_eq!(book.total_ask_volume(), m(10));
        assert_eq!(book.ask_levels().count(), 1);
        assert_level_invariant(&book, m(10_000));
    }

    /// A large market sell sweeps the bid side best price first, leaving
    /// only the tail of the cheapest level.
    #[test]
    fn test_market_sell_sweeps_bid_levels_best_first() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(5_000), order(1, Side::Buy, 10));
        book.place_limit_order(m(5_000), order(2, Side::Buy, 1));
        book.place_limit_order(m(9_000), order(3, Side::Buy, 8));
        book.place_limit_order(m(10_000), order(4, Side::Buy, 5));

        assert_eq!(book.total_bid_volume(), m(24));

        let mut market_sell = order(5, Side::Sell, 20);
        let matches = book.place_market_order(&mut market_sell).unwrap();

        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].price, m(10_000));
        assert_eq!(matches[1].price, m(9_000));
        assert_eq!(matches[2].price, m(5_000));
        assert_eq!(matches[2].size_filled, m(7));

        assert_eq!(book.total_bid_volume(), m(4));
        assert_eq!(book.bid_levels().count(), 1);
        assert_level_invariant(&book, m(5_000));
    }

    /// Within a level, matches come out oldest resting order first.
    #[test]
    fn test_price_time_priority_within_level() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(100), order(1, Side::Sell, 4));
        book.place_limit_order(m(100), order(2, Side::Sell, 6));

        let first_ts = book.limit_at(m(100)).unwrap().orders[0].timestamp;
        let second_ts = book.limit_at(m(100)).unwrap().orders[1].timestamp;
        assert!(first_ts <= second_ts);

        let mut market_buy = order(3, Side::Buy, 9);
        let matches = book.place_market_order(&mut market_buy).unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].ask, 1);
        assert_eq!(matches[0].size_filled, m(4));
        assert_eq!(matches[1].ask, 2);
        assert_eq!(matches[1].size_filled, m(5));
        assert!(matches.iter().all(|mt| mt.size_filled >= Money::ZERO));

        let remaining = book.limit_at(m(100)).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.total_volume(), m(1));
    }

    /// A market order bigger than the whole opposite side is rejected and
    /// nothing in the book moves.
    #[test]
    fn test_insufficient_liquidity_leaves_book_unchanged() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(10_000), order(1, Side::Sell, 20));
        book.place_limit_order(m(11_000), order(2, Side::Buy, 100));

        let mut oversized = order(3, Side::Buy, 100);
        let err = book.place_market_order(&mut oversized).unwrap_err();
        assert_eq!(
            err,
            OrderBookError::InsufficientLiquidity {
                requested: m(100),
                available: m(20),
            }
        );
        assert_eq!(oversized.size, m(100));

        // market sell into a side with some volume, still oversized
        let mut oversized_sell = order(4, Side::Sell, 200);
        assert!(book.place_market_order(&mut oversized_sell).is_err());

        assert_eq!(book.total_ask_volume(), m(20));
        assert_eq!(book.total_bid_volume(), m(100));
        assert_eq!(book.ask_levels().count(), 1);
        assert_eq!(book.bid_levels().count(), 1);
    }

    #[test]
    fn test_market_order_for_entire_book_drains_side() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(100), order(1, Side::Sell, 5));
        book.place_limit_order(m(101), order(2, Side::Sell, 5));

        let mut market_buy = order(3, Side::Buy, 10);
        let matches = book.place_market_order(&mut market_buy).unwrap();

        assert_eq!(matches.len(), 2);
        assert!(market_buy.is_filled());
        assert_eq!(book.total_ask_volume(), Money::ZERO);
        assert_eq!(book.ask_levels().count(), 0);

        // fully filled resting orders are gone: canceling them is an error
        assert_eq!(
            book.cancel_order(1).unwrap_err(),
            OrderBookError::OrderNotResting(1)
        );
    }

    /// Canceling the sole order at a level zeroes its volume and removes
    /// the level from the book.
    #[test]
    fn test_cancel_sole_order_removes_level() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(10_000), order(1, Side::Buy, 4));
        assert_eq!(book.total_bid_volume(), m(4));

        let canceled = book.cancel_order(1).unwrap();
        assert_eq!(canceled.size, m(4));

        assert_eq!(book.total_bid_volume(), Money::ZERO);
        assert_eq!(book.bid_levels().count(), 0);
        assert!(book.limit_at(m(10_000)).is_none());
    }

    /// Canceling from the middle of a queue must not disturb the arrival
    /// order of the orders left behind.
    #[test]
    fn test_cancel_preserves_fifo_of_remaining_orders() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(100), order(1, Side::Sell, 5));
        book.place_limit_order(m(100), order(2, Side::Sell, 6));
        book.place_limit_order(m(100), order(3, Side::Sell, 7));

        book.cancel_order(2).unwrap();
        assert_eq!(book.total_ask_volume(), m(12));
        assert_level_invariant(&book, m(100));

        let mut market_buy = order(4, Side::Buy, 12);
        let matches = book.place_market_order(&mut market_buy).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].ask, 1);
        assert_eq!(matches[1].ask, 3);
    }

    #[test]
    fn test_cancel_unknown_order_is_an_error() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(99), order(1, Side::Sell, 5));

        assert_eq!(
            book.cancel_order(999).unwrap_err(),
            OrderBookError::OrderNotResting(999)
        );
        assert_eq!(book.total_ask_volume(), m(5));
    }

    #[test]
    fn test_cancel_twice_is_an_error() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(42), order(7, Side::Buy, 3));

        assert!(book.cancel_order(7).is_ok());
        assert_eq!(
            book.cancel_order(7).unwrap_err(),
            OrderBookError::OrderNotResting(7)
        );
    }

    /// Limit orders never cross: a bid above the best ask still rests.
    #[test]
    fn test_limit_orders_rest_even_when_crossing() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(105), order(1, Side::Sell, 5));
        book.place_limit_order(m(110), order(2, Side::Buy, 3));

        assert_eq!(book.total_ask_volume(), m(5));
        assert_eq!(book.total_bid_volume(), m(3));
        assert_eq!(book.bid_levels().count(), 1);
        assert_eq!(book.ask_levels().count(), 1);
    }

    #[test]
    fn test_partial_fill_keeps_front_order_location() {
        let mut book = OrderBook::new();
        book.place_limit_order(m(100), order(1, Side::Sell, 10));

        let mut market_buy = order(2, Side::Buy, 4);
        book.place_market_order(&mut market_buy).unwrap();

        // the partially filled order is still resting and cancelable
        let leftover = book.cancel_order(1).unwrap();
        assert_eq!(leftover.size, m(6));
        assert_eq!(book.total_ask_volume(), Money::ZERO);
    }
}
