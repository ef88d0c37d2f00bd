#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use igtrader::domain::error::IgTraderError;
use igtrader::domain::intent::Side;
pub use igtrader::domain::market::{
    OrderResult, PricePoint, PriceRecord, PriceSeries, Quote, Snapshot,
};
use igtrader::ports::store_port::StorePort;
use igtrader::ports::venue_port::VenuePort;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ts(d: NaiveDate, h: u32, min: u32, s: u32) -> NaiveDateTime {
    d.and_hms_opt(h, min, s).unwrap()
}

pub fn make_snapshot(offer: f64) -> Snapshot {
    Snapshot {
        open: offer - 2.0,
        close: offer - 1.0,
        bid: offer - 0.5,
        offer,
    }
}

pub fn make_record(epic: &str, day: NaiveDate, offer: f64) -> PriceRecord {
    PriceRecord {
        epic: epic.to_string(),
        date: day,
        interval: 10,
        snapshot: make_snapshot(offer),
        points: vec![
            PricePoint {
                timestamp: ts(day, 9, 0, 0),
                close: offer - 1.5,
            },
            PricePoint {
                timestamp: ts(day, 9, 0, 10),
                close: offer - 1.0,
            },
        ],
    }
}

pub fn make_quote(epic: &str, offer: f64) -> Quote {
    Quote {
        epic: epic.to_string(),
        bid: offer - 0.5,
        offer,
        timestamp: ts(date(2024, 3, 1), 10, 0, 0),
    }
}

/// History series carrying a snapshot and `n` evenly spaced points.
pub fn make_series(day: NaiveDate, offer: f64, n: usize) -> PriceSeries {
    let points = (0..n)
        .map(|i| PricePoint {
            timestamp: ts(day, 9, 0, 0) + chrono::Duration::seconds(10 * i as i64),
            close: offer + i as f64,
        })
        .collect();
    PriceSeries {
        snapshot: Some(make_snapshot(offer)),
        points,
    }
}

#[derive(Default)]
pub struct MockVenue {
    pub quotes: HashMap<String, Quote>,
    pub quote_errors: HashMap<String, String>,
    pub history: HashMap<(String, NaiveDate), PriceSeries>,
    pub history_errors: HashSet<(String, NaiveDate)>,
    pub order_failures: HashSet<String>,
    pub orders: RefCell<Vec<(String, Side, f64)>>,
    pub history_calls: RefCell<Vec<(String, NaiveDate)>>,
}

impl MockVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, epic: &str, offer: f64) -> Self {
        self.quotes.insert(epic.to_string(), make_quote(epic, offer));
        self
    }

    pub fn with_quote_error(mut self, epic: &str, reason: &str) -> Self {
        self.quote_errors
            .insert(epic.to_string(), reason.to_string());
        self
    }

    pub fn with_history(mut self, epic: &str, day: NaiveDate, series: PriceSeries) -> Self {
        self.history.insert((epic.to_string(), day), series);
        self
    }

    pub fn with_history_error(mut self, epic: &str, day: NaiveDate) -> Self {
        self.history_errors.insert((epic.to_string(), day));
        self
    }

    pub fn with_order_failure(mut self, epic: &str) -> Self {
        self.order_failures.insert(epic.to_string());
        self
    }
}

impl VenuePort for MockVenue {
    fn fetch_history(
        &self,
        epic: &str,
        day: NaiveDate,
        _interval: u32,
    ) -> Result<PriceSeries, IgTraderError> {
        self.history_calls
            .borrow_mut()
            .push((epic.to_string(), day));
        if self.history_errors.contains(&(epic.to_string(), day)) {
            return Err(IgTraderError::Network {
                reason: "connection reset".into(),
            });
        }
        Ok(self
            .history
            .get(&(epic.to_string(), day))
            .cloned()
            .unwrap_or_default())
    }

    fn fetch_quote(&self, epic: &str) -> Result<Quote, IgTraderError> {
        if let Some(reason) = self.quote_errors.get(epic) {
            return Err(IgTraderError::Network {
                reason: reason.clone(),
            });
        }
        self.quotes
            .get(epic)
            .cloned()
            .ok_or_else(|| IgTraderError::Venue {
                status: 404,
                reason: format!("unknown epic {}", epic),
            })
    }

    fn submit_order(
        &self,
        epic: &str,
        side: Side,
        size: f64,
    ) -> Result<OrderResult, IgTraderError> {
        if self.order_failures.contains(epic) {
            return Err(IgTraderError::Venue {
                status: 400,
                reason: "insufficient funds".into(),
            });
        }
        self.orders
            .borrow_mut()
            .push((epic.to_string(), side, size));
        Ok(OrderResult {
            deal_reference: format!("DEAL-{}", self.orders.borrow().len()),
        })
    }
}

#[derive(Default)]
pub struct MockStore {
    pub records: RefCell<Vec<PriceRecord>>,
    pub saved_batches: RefCell<Vec<Vec<PriceRecord>>>,
    pub fail_save: bool,
    pub fail_latest: HashSet<String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: PriceRecord) -> Self {
        self.records.borrow_mut().push(record);
        self
    }

    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    pub fn with_latest_error(mut self, epic: &str) -> Self {
        self.fail_latest.insert(epic.to_string());
        self
    }
}

impl StorePort for MockStore {
    fn save(&self, records: &[PriceRecord]) -> Result<(), IgTraderError> {
        if self.fail_save {
            return Err(IgTraderError::Storage {
                reason: "disk full".into(),
            });
        }
        self.saved_batches.borrow_mut().push(records.to_vec());
        self.records.borrow_mut().extend_from_slice(records);
        Ok(())
    }

    fn latest_for(&self, epic: &str) -> Result<Option<PriceRecord>, IgTraderError> {
        if self.fail_latest.contains(epic) {
            return Err(IgTraderError::StorageQuery {
                reason: "table locked".into(),
            });
        }
        Ok(self
            .records
            .borrow()
            .iter()
            .filter(|r| r.epic == epic)
            .max_by_key(|r| r.date)
            .cloned())
    }

    fn all_records(&self) -> Result<Vec<PriceRecord>, IgTraderError> {
        let mut records = self.records.borrow().clone();
        records.sort_by(|a, b| (&a.epic, a.date).cmp(&(&b.epic, b.date)));
        Ok(records)
    }
}
