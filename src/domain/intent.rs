//! Trade intent derivation: the three-way offer comparison.

use super::market::{Quote, Snapshot};
use std::fmt;

/// Market orders are always dispatched at unit size.
pub const UNIT_SIZE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
            Side::Hold => write!(f, "HOLD"),
        }
    }
}

/// Intent derived on a tick. Consumed immediately by order dispatch,
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub epic: String,
    pub side: Side,
    pub size: f64,
}

/// Momentum-reversal rule: sell into a rise, buy into a fall, hold on a
/// flat offer. Compares the live offer to the last stored snapshot offer.
pub fn decide(last: &Snapshot, quote: &Quote) -> Side {
    if quote.offer > last.offer {
        Side::Sell
    } else if quote.offer < last.offer {
        Side::Buy
    } else {
        Side::Hold
    }
}
