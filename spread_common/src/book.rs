//! Order-book wire types and exact price decoding.
//!
//! Prices travel as `Quotation { units, nano }` pairs, the exchange's own
//! fixed-point representation. `Quotation::to_decimal` is the only place a
//! price becomes a number, and it is exact: no float ever touches a price.

use std::fmt;

use bincode::{Decode, Encode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SpreadError;
use crate::instrument::InstrumentId;

/// Nano parts per unit.
pub const NANO: i64 = 1_000_000_000;

/// Fixed-point price: `units + nano / 1e9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct Quotation {
    /// Integer part.
    pub units: i64,
    /// Fractional part in billionths; same sign as `units`.
    pub nano: i32,
}

impl Quotation {
    /// Builds a quotation from its raw parts without validation.
    pub const fn new(units: i64, nano: i32) -> Self {
        Self { units, nano }
    }

    /// Splits a price expressed in billionths.
    pub fn from_nanos(total: i64) -> Self {
        Self {
            units: total / NANO,
            nano: (total % NANO) as i32,
        }
    }

    /// Exact decimal value.
    ///
    /// Fails when `nano` is outside `(-1e9, 1e9)` or carries the opposite sign
    /// of a non-zero `units`.
    pub fn to_decimal(&self) -> Result<Decimal, SpreadError> {
        if i64::from(self.nano).abs() >= NANO {
            return Err(SpreadError::Decode(format!(
                "nano part {} out of range",
                self.nano
            )));
        }
        if (self.units > 0 && self.nano < 0) || (self.units < 0 && self.nano > 0) {
            return Err(SpreadError::Decode(format!(
                "sign mismatch between units {} and nano {}",
                self.units, self.nano
            )));
        }
        Ok(Decimal::from(self.units) + Decimal::new(i64::from(self.nano), 9))
    }
}

impl fmt::Display for Quotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Ok(value) => write!(f, "{}", value.normalize()),
            Err(_) => write!(f, "<{}:{}>", self.units, self.nano),
        }
    }
}

/// One side of the book at a single price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct PriceLevel {
    /// Level price.
    pub price: Quotation,
    /// Lots resting at that price.
    pub quantity: i64,
}

impl PriceLevel {
    /// Builds a level.
    pub fn new(price: Quotation, quantity: i64) -> Self {
        Self { price, quantity }
    }
}

/// Order-book update as delivered by the quote stream.
///
/// Levels are best-first; consumers only read index 0 of each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct OrderBookEvent {
    /// Instrument the update belongs to.
    pub figi: InstrumentId,
    /// Depth the feed was asked for.
    pub depth: u32,
    /// Bid levels, highest first.
    pub bids: Vec<PriceLevel>,
    /// Ask levels, lowest first.
    pub asks: Vec<PriceLevel>,
    /// Exchange timestamp, milliseconds since the Unix epoch.
    pub time_ms: i64,
}

impl OrderBookEvent {
    /// Best bid, if the bid side is not empty.
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    /// Best ask, if the ask side is not empty.
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }

    /// Encodes the event into a UDP frame.
    pub fn to_frame(&self) -> Result<Vec<u8>, SpreadError> {
        Ok(bincode::encode_to_vec(self, crate::net::frame_config())?)
    }

    /// Decodes a UDP frame produced by [`Self::to_frame`].
    pub fn from_frame(bytes: &[u8]) -> Result<Self, SpreadError> {
        let (event, _) = bincode::decode_from_slice(bytes, crate::net::frame_config())?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn decodes_exactly() {
        let price = Quotation::new(95, 250_000_000);
        assert_eq!(price.to_decimal().unwrap(), Decimal::from_str("95.25").unwrap());
    }

    #[test]
    fn decodes_sub_unit_and_negative_values() {
        assert_eq!(
            Quotation::new(0, 1).to_decimal().unwrap(),
            Decimal::from_str("0.000000001").unwrap()
        );
        assert_eq!(
            Quotation::new(-3, -500_000_000).to_decimal().unwrap(),
            Decimal::from_str("-3.5").unwrap()
        );
    }

    #[test]
    fn rejects_malformed_quotations() {
        assert!(matches!(
            Quotation::new(1, 1_000_000_000).to_decimal(),
            Err(SpreadError::Decode(_))
        ));
        assert!(matches!(
            Quotation::new(1, -5).to_decimal(),
            Err(SpreadError::Decode(_))
        ));
    }

    #[test]
    fn from_nanos_splits_parts() {
        assert_eq!(Quotation::from_nanos(12_100_000_000), Quotation::new(12, 100_000_000));
        assert_eq!(Quotation::new(7, 800_000_000).to_string(), "7.8");
    }

    #[test]
    fn frame_survives_the_wire() {
        let event = OrderBookEvent {
            figi: InstrumentId::new("FUTSI1226000"),
            depth: 1,
            bids: vec![PriceLevel::new(Quotation::new(95_000, 0), 12)],
            asks: vec![],
            time_ms: 1_760_000_000_000,
        };
        let decoded = OrderBookEvent::from_frame(&event.to_frame().unwrap()).unwrap();
        assert_eq!(decoded, event);
        assert!(decoded.best_ask().is_none());
    }

    #[test]
    fn garbage_frame_is_an_error() {
        assert!(OrderBookEvent::from_frame(b"PING").is_err());
    }
}
