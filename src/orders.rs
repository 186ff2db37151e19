use rust_decimal::Decimal;
use std::time::SystemTime;

/// Monetary value: prices, sizes and volumes are all exact decimals.
///
/// Floats are unacceptable for money (0.1 + 0.2 drifts), so every quantity
/// flowing through the book uses [`rust_decimal::Decimal`].
pub type Money = Decimal;

/// Identifier handed back to a client when an order is accepted.
pub type OrderId = u64;

/// Represents which side of the market the order is on.
///
/// # Intuition
/// - `Buy` (Bid): The trader wants to purchase the asset. Buy orders are sorted from **highest to lowest price**
///   because a higher price means more willingness to buy — i.e., more aggressive.
/// - `Sell` (Ask): The trader wants to sell the asset. Sell orders are sorted from **lowest to highest price**
///   because a lower price means more willingness to sell — i.e., more aggressive.
///
/// This sorting ensures the matching engine always finds the **best price first**:
/// - Buyers match with the **lowest ask**
/// - Sellers match with the **highest bid**
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum Side {
    Buy,  // Bid
    Sell, // Ask
}

/// Specifies whether an order is a Limit or Market order.
///
/// - `Limit`: Rests in the book at a specific price until matched or canceled
/// - `Market`: Executes immediately at the best available prices, never rests
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

/// An order submitted by a trader.
///
/// `size` is the *remaining* quantity: it is decremented as the order fills
/// and reaches zero exactly when the order is done. `timestamp` gives
/// time-priority within a price level (FIFO).
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub size: Money,
    pub timestamp: SystemTime,
}

impl Order {
    pub fn new(id: OrderId, side: Side, size: Money) -> Self {
        Self {
            id,
            side,
            size,
            timestamp: SystemTime::now(),
        }
    }

    /// A fully filled order has nothing left to trade.
    pub fn is_filled(&self) -> bool {
        self.size.is_zero()
    }
}
