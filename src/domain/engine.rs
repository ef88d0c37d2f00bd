//! Decision engine: one tick compares stored history against live quotes
//! and dispatches market orders.

use super::intent::{self, Side, TradeIntent, UNIT_SIZE};
use crate::ports::store_port::StorePort;
use crate::ports::venue_port::VenuePort;

/// Outcome of one full instrument sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Epics with both a stored record and a fresh quote.
    pub evaluated: usize,
    /// Orders dispatched (BUY or SELL).
    pub orders: usize,
    /// Epics skipped for insufficient data.
    pub skipped: usize,
}

/// Evaluate every tracked epic once.
///
/// Stateless across ticks: everything is read fresh from the store and the
/// venue. An epic missing either its latest record or a live quote is
/// reported and skipped; order dispatch failures are reported and do not
/// abort the remaining epics. No error escapes the tick.
pub fn run_tick(venue: &dyn VenuePort, store: &dyn StorePort, epics: &[String]) -> TickSummary {
    let mut summary = TickSummary::default();

    for epic in epics {
        let record = match store.latest_for(epic) {
            Ok(Some(record)) => record,
            Ok(None) => {
                eprintln!("Not enough data to trade for {}", epic);
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                eprintln!("Not enough data to trade for {} ({})", epic, e);
                summary.skipped += 1;
                continue;
            }
        };

        let quote = match venue.fetch_quote(epic) {
            Ok(quote) => quote,
            Err(e) => {
                eprintln!("Not enough data to trade for {} ({})", epic, e);
                summary.skipped += 1;
                continue;
            }
        };

        summary.evaluated += 1;
        eprintln!(
            "Epic: {}, Last close: {}, Current offer: {}",
            epic, record.snapshot.offer, quote.offer
        );

        let side = intent::decide(&record.snapshot, &quote);
        let trade = TradeIntent {
            epic: epic.clone(),
            side,
            size: UNIT_SIZE,
        };

        match trade.side {
            Side::Hold => {
                eprintln!("Price is the same, doing nothing.");
            }
            Side::Buy | Side::Sell => {
                match venue.submit_order(&trade.epic, trade.side, trade.size) {
                    Ok(result) => {
                        eprintln!(
                            "Placed {} order for {} (deal {})",
                            trade.side, trade.epic, result.deal_reference
                        );
                        summary.orders += 1;
                    }
                    Err(e) => {
                        eprintln!("warning: order for {} failed ({})", trade.epic, e);
                    }
                }
            }
        }
    }

    summary
}
