//! History store port trait.

use crate::domain::error::IgTraderError;
use crate::domain::market::PriceRecord;

pub trait StorePort {
    /// Persist a batch of records. All-or-nothing: a failure leaves no
    /// partial batch behind.
    fn save(&self, records: &[PriceRecord]) -> Result<(), IgTraderError>;

    /// The record with the greatest date for an epic, or None when the
    /// epic has no history.
    fn latest_for(&self, epic: &str) -> Result<Option<PriceRecord>, IgTraderError>;

    /// Every stored record, ordered by (epic, date).
    fn all_records(&self) -> Result<Vec<PriceRecord>, IgTraderError>;
}
