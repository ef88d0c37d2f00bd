//! Market data representations shared across the pipeline.

use chrono::{NaiveDate, NaiveDateTime};

/// Summary quote for an epic at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub open: f64,
    pub close: f64,
    pub bid: f64,
    pub offer: f64,
}

/// Single sampled price within a day's history.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

/// Raw venue response for one (epic, day) history request. A response
/// without a snapshot carries nothing worth persisting.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    pub snapshot: Option<Snapshot>,
    pub points: Vec<PricePoint>,
}

/// One persisted day of history for an epic.
///
/// `points` is chronologically ordered. The store keeps one record per
/// (epic, date); "latest" lookups rely on the total order over `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub epic: String,
    pub date: NaiveDate,
    /// Sampling granularity of `points`, in seconds.
    pub interval: u32,
    pub snapshot: Snapshot,
    pub points: Vec<PricePoint>,
}

/// Live quote, fetched fresh on every tick. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub epic: String,
    pub bid: f64,
    pub offer: f64,
    pub timestamp: NaiveDateTime,
}

/// Acknowledgement returned by the venue for a submitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub deal_reference: String,
}
