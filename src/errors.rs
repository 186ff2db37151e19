use thiserror::Error;

use crate::orders::{Money, OrderId};

/// Business errors raised by the order book. All of these are recoverable
/// conditions reported to the caller; none of them may bring the process
/// down — a venue must survive a client sending an oversized order.
#[derive(Debug, Error, PartialEq)]
pub enum OrderBookError {
    #[error("insufficient liquidity: market order size {requested} exceeds available volume {available}")]
    InsufficientLiquidity { requested: Money, available: Money },

    #[error("order {0} is not resting in the book")]
    OrderNotResting(OrderId),

    #[error("unknown market `{0}`")]
    UnknownMarket(String),
}
