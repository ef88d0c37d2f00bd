//! Ingestion sweep: walk a date range and instrument set, pull history
//! from the venue and batch it into the store.

use super::error::IgTraderError;
use super::market::PriceRecord;
use crate::ports::store_port::StorePort;
use crate::ports::venue_port::VenuePort;
use chrono::{Days, NaiveDate};

/// Sweep `start_date..=end_date` across `epics`, persisting one record per
/// (epic, day) for which the venue returned a snapshot. Returns the number
/// of records persisted.
///
/// A failed fetch for one (epic, day) is reported and skipped; the sweep
/// continues. A failure of the final batch write propagates.
pub fn run_capture(
    venue: &dyn VenuePort,
    store: &dyn StorePort,
    epics: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    interval: u32,
) -> Result<usize, IgTraderError> {
    let mut records: Vec<PriceRecord> = Vec::new();

    let mut date = start_date;
    while date <= end_date {
        for epic in epics {
            eprintln!("Fetching data for {} on {}", epic, date);
            match venue.fetch_history(epic, date, interval) {
                Ok(series) => {
                    let Some(snapshot) = series.snapshot else {
                        // Empty snapshot: nothing to persist for this day.
                        continue;
                    };
                    let mut points = series.points;
                    points.sort_by_key(|p| p.timestamp);
                    records.push(PriceRecord {
                        epic: epic.clone(),
                        date,
                        interval,
                        snapshot,
                        points,
                    });
                }
                Err(e) => {
                    eprintln!("warning: skipping {} on {} ({})", epic, date, e);
                }
            }
        }
        date = match date.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }

    if records.is_empty() {
        eprintln!("No data to save.");
        return Ok(0);
    }

    let count = records.len();
    store.save(&records)?;
    Ok(count)
}
