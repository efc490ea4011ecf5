//! Instrument identifiers, catalog records and the fixed leg triple.
//!
//! The watcher tracks exactly three instruments. `Leg` names the slot an
//! instrument occupies in the ratio formulas and `LegSet<T>` holds one value
//! per leg, so the triple can never grow or shrink at runtime.

use std::fmt;

use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Exchange-assigned stable identifier (a FIGI). Join key across snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
#[serde(transparent)]
pub struct InstrumentId(String);

impl InstrumentId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstrumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Position of an instrument in the ratio formulas.
///
/// `open = bid(A) / ask(B) / ask(C)`, `close = ask(A) / bid(B) / bid(C)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Leg {
    /// Dividend leg, sold at its bid on open.
    A,
    /// First divisor leg, bought at its ask on open.
    B,
    /// Second divisor leg, bought at its ask on open.
    C,
}

impl Leg {
    /// All legs in formula order.
    pub const ALL: [Leg; 3] = [Leg::A, Leg::B, Leg::C];
}

/// One value per leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegSet<T> {
    /// Value for leg A.
    pub a: T,
    /// Value for leg B.
    pub b: T,
    /// Value for leg C.
    pub c: T,
}

impl<T> LegSet<T> {
    /// Builds a set from the three per-leg values.
    pub fn new(a: T, b: T, c: T) -> Self {
        Self { a, b, c }
    }

    /// Value for `leg`.
    pub fn get(&self, leg: Leg) -> &T {
        match leg {
            Leg::A => &self.a,
            Leg::B => &self.b,
            Leg::C => &self.c,
        }
    }

    /// Mutable value for `leg`.
    pub fn get_mut(&mut self, leg: Leg) -> &mut T {
        match leg {
            Leg::A => &mut self.a,
            Leg::B => &mut self.b,
            Leg::C => &mut self.c,
        }
    }

    /// `(leg, value)` pairs in formula order.
    pub fn iter(&self) -> impl Iterator<Item = (Leg, &T)> {
        Leg::ALL.into_iter().map(move |leg| (leg, self.get(leg)))
    }

    /// Applies `f` to every value, keeping the leg positions.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> LegSet<U> {
        LegSet {
            a: f(self.a),
            b: f(self.b),
            c: f(self.c),
        }
    }

    /// Fallible per-leg conversion that stops on the first error.
    pub fn try_map<U, E>(self, mut f: impl FnMut(Leg, T) -> Result<U, E>) -> Result<LegSet<U>, E> {
        Ok(LegSet {
            a: f(Leg::A, self.a)?,
            b: f(Leg::B, self.b)?,
            c: f(Leg::C, self.c)?,
        })
    }
}

/// The three tracked instrument identifiers.
pub type InstrumentTriple = LegSet<InstrumentId>;

impl InstrumentTriple {
    /// Leg occupied by `id`, if it is one of the tracked instruments.
    pub fn leg_of(&self, id: &InstrumentId) -> Option<Leg> {
        self.iter().find(|(_, tracked)| *tracked == id).map(|(leg, _)| leg)
    }
}

/// FIGI prefixes used to pick the front-month future for every leg.
pub type LegPrefixes = LegSet<String>;

impl Default for LegPrefixes {
    fn default() -> Self {
        LegSet::new("FUTSI".into(), "FUTCNY".into(), "FUTUCNY".into())
    }
}

/// Catalog record for a listed future.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Stable identifier used for subscriptions.
    pub figi: InstrumentId,
    /// Exchange ticker, e.g. `SiZ6`.
    pub ticker: String,
    /// Trading class, e.g. `SPBFUT`.
    pub class_code: String,
    /// Last trading moment; `None` for perpetual or undated listings.
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Picks the nearest future whose FIGI starts with `prefix` and which has not
/// expired at `now`. Undated listings are never selected.
pub fn select_front_month<'a>(
    instruments: &'a [Instrument],
    prefix: &str,
    now: DateTime<Utc>,
) -> Option<&'a Instrument> {
    let mut dated: Vec<&Instrument> = instruments
        .iter()
        .filter(|i| i.figi.as_str().starts_with(prefix))
        .filter(|i| i.expiration_date.is_some())
        .collect();
    dated.sort_by_key(|i| i.expiration_date);

    dated
        .into_iter()
        .find(|i| i.expiration_date.is_some_and(|exp| exp >= now))
}
