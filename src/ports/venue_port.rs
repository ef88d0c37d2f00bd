//! Trading venue port trait.

use crate::domain::error::IgTraderError;
use crate::domain::intent::Side;
use crate::domain::market::{OrderResult, PriceSeries, Quote};
use chrono::NaiveDate;

/// Authenticated access to the trading venue. Implementations own the
/// session established at login; callers never see raw tokens.
pub trait VenuePort {
    /// Historical prices for one epic on one calendar day, sampled at
    /// `interval` seconds.
    fn fetch_history(
        &self,
        epic: &str,
        date: NaiveDate,
        interval: u32,
    ) -> Result<PriceSeries, IgTraderError>;

    /// Fresh market quote for an epic.
    fn fetch_quote(&self, epic: &str) -> Result<Quote, IgTraderError>;

    /// Dispatch a market order. `side` is Buy or Sell; callers do not
    /// submit Hold intents.
    fn submit_order(
        &self,
        epic: &str,
        side: Side,
        size: f64,
    ) -> Result<OrderResult, IgTraderError>;
}
