//! Top-of-book snapshot kept per tracked instrument.
use chrono::{DateTime, Utc};
use spread_common::book::{OrderBookEvent, PriceLevel};
use spread_common::instrument::InstrumentId;

/// Most recently observed best bid/ask of one instrument.
///
/// Immutable once built; a newer snapshot replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookSnapshot {
    /// Instrument the snapshot belongs to.
    pub instrument_id: InstrumentId,
    /// Best bid, `None` when the bid side was empty.
    pub best_bid: Option<PriceLevel>,
    /// Best ask, `None` when the ask side was empty.
    pub best_ask: Option<PriceLevel>,
    /// Local arrival time.
    pub received_at: DateTime<Utc>,
}

impl OrderBookSnapshot {
    /// Keeps only level 0 of each side of `event`.
    pub fn from_event(event: &OrderBookEvent, received_at: DateTime<Utc>) -> Self {
        Self {
            instrument_id: event.figi.clone(),
            best_bid: event.best_bid(),
            best_ask: event.best_ask(),
            received_at,
        }
    }
}
