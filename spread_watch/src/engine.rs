//! Open/close ratio computation over the three latest snapshots.
//!
//! `open  = bid(A) / ask(B) / ask(C)` sells A and buys B and C;
//! `close = ask(A) / bid(B) / bid(C)` is the mirror trade. Both are produced on
//! every recomputation. Missing data degrades to `Incomplete`; only
//! malformed prices surface as `Error`.
use log::debug;
use rust_decimal::Decimal;
use spread_common::book::PriceLevel;
use spread_common::instrument::{InstrumentTriple, Leg, LegSet};
use spread_common::{Result, SpreadError};

use crate::model::ratio::{RatioResult, RatioStatus};
use crate::store::SnapshotStore;

/// Decoded best bid and ask of one leg.
struct Touch {
    bid: Decimal,
    ask: Decimal,
}

/// Stateless ratio calculator for a fixed instrument triple.
#[derive(Debug, Clone)]
pub struct RatioEngine {
    legs: InstrumentTriple,
}

impl RatioEngine {
    /// Creates an engine for `legs`.
    pub fn new(legs: InstrumentTriple) -> Self {
        Self { legs }
    }

    /// Recomputes both ratios from the current store contents.
    ///
    /// Each leg's snapshot is read once; the result depends on nothing but
    /// what the store holds at the time of the call.
    pub fn recompute(&self, store: &SnapshotStore) -> RatioStatus {
        if store.legs() != &self.legs {
            return RatioStatus::Error(format!(
                "store tracks {:?}, engine expects {:?}",
                store.legs(),
                self.legs
            ));
        }
        let slots = match store.view() {
            Ok(slots) => slots,
            Err(e) => return RatioStatus::Error(e.to_string()),
        };

        let sides = slots.try_map(|leg, slot| match slot {
            Some(s) => match (s.best_bid, s.best_ask) {
                (Some(bid), Some(ask)) => Ok((bid, ask)),
                _ => {
                    debug!("leg {} ({}) has an empty side", leg, s.instrument_id);
                    Err(())
                }
            },
            None => Err(()),
        });
        let Ok(sides) = sides else {
            return RatioStatus::Incomplete;
        };

        match compute(sides) {
            Ok(result) => RatioStatus::Ratios(result),
            Err(e) => RatioStatus::Error(e.to_string()),
        }
    }
}

fn compute(sides: LegSet<(PriceLevel, PriceLevel)>) -> Result<RatioResult> {
    let touch = sides.try_map(|leg, (bid, ask)| {
        Ok::<_, SpreadError>(Touch {
            bid: decode(leg, "bid", &bid)?,
            ask: decode(leg, "ask", &ask)?,
        })
    })?;

    for leg in [Leg::B, Leg::C] {
        let t = touch.get(leg);
        ensure_divisor(leg, "bid", t.bid)?;
        ensure_divisor(leg, "ask", t.ask)?;
    }

    let open_inputs = LegSet::new(touch.a.bid, touch.b.ask, touch.c.ask);
    let close_inputs = LegSet::new(touch.a.ask, touch.b.bid, touch.c.bid);

    Ok(RatioResult {
        open_value: chain_divide(&open_inputs)?,
        open_inputs,
        close_value: chain_divide(&close_inputs)?,
        close_inputs,
    })
}

fn decode(leg: Leg, side: &str, level: &PriceLevel) -> Result<Decimal> {
    level
        .price
        .to_decimal()
        .map_err(|e| SpreadError::Decode(format!("leg {} {}: {}", leg, side, e)))
}

fn ensure_divisor(leg: Leg, side: &str, price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(SpreadError::Decode(format!(
            "leg {} {} price must be positive, got {}",
            leg, side, price
        )));
    }
    Ok(())
}

/// `a / b / c`, failing instead of overflowing.
fn chain_divide(inputs: &LegSet<Decimal>) -> Result<Decimal> {
    inputs
        .a
        .checked_div(inputs.b)
        .and_then(|v| v.checked_div(inputs.c))
        .ok_or_else(|| {
            SpreadError::Decode(format!(
                "ratio {} / {} / {} is out of range",
                inputs.a, inputs.b, inputs.c
            ))
        })
}
